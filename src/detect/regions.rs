use image::DynamicImage;

/// Header crop heights, as fractions of the page height, in sampling order.
pub const HEADER_FRACTIONS: [f32; 3] = [0.10, 0.15, 0.20];

/// A full-width, top-aligned crop of a page.
#[derive(Debug, Clone)]
pub struct HeaderRegion {
    pub fraction: f32,
    pub image: DynamicImage,
}

/// One crop per fraction, top-aligned and spanning the full page width.
///
/// Crop heights are floored and kept within `1..=page height`, so even a
/// tiny page yields one crop per fraction.
pub fn sample_header_regions(page: &DynamicImage, fractions: &[f32]) -> Vec<HeaderRegion> {
    let width = page.width();
    let height = page.height();

    fractions
        .iter()
        .map(|&fraction| {
            let crop_height = ((height as f32 * fraction).floor() as u32).clamp(1, height.max(1));
            HeaderRegion {
                fraction,
                image: page.crop_imm(0, 0, width, crop_height),
            }
        })
        .collect()
}
