use std::ops::Range;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::separable_filter_equal;
use thiserror::Error;

/// Neighbourhood size of the adaptive threshold (pixels, odd).
pub const THRESHOLD_BLOCK_SIZE: u32 = 11;
/// Subtracted from the weighted neighbourhood mean before comparing.
pub const THRESHOLD_OFFSET: f32 = 2.0;
/// Rows denoised per band; accumulators are sized to one band plus its halo.
const DENOISE_BAND_ROWS: usize = 256;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("page image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Non-local-means parameters. Windows are given as radii around the centre pixel.
#[derive(Debug, Clone, Copy)]
pub struct NlMeansParams {
    pub strength: f32,
    pub patch_radius: u32,
    pub search_radius: u32,
}

impl Default for NlMeansParams {
    fn default() -> Self {
        Self {
            strength: 3.0,
            patch_radius: 2,
            search_radius: 5,
        }
    }
}

/// Grayscale, adaptive Gaussian threshold, then non-local-means denoise.
///
/// The output has the same dimensions as the input and a single channel.
pub fn preprocess(image: &DynamicImage) -> Result<GrayImage, PreprocessError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }

    let gray = image.to_luma8();
    let binary = adaptive_gaussian_threshold(&gray, THRESHOLD_BLOCK_SIZE, THRESHOLD_OFFSET);
    Ok(denoise_non_local_means(&binary, NlMeansParams::default()))
}

/// Sigma for a Gaussian kernel of `block_size` taps, matching the usual
/// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule.
fn gaussian_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian weights, exactly `block_size` taps wide.
fn gaussian_kernel(block_size: u32) -> Vec<f32> {
    let sigma = gaussian_sigma(block_size);
    let radius = (block_size / 2) as i32;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|d| (-((d * d) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// A pixel becomes white when it is brighter than its Gaussian-weighted
/// `block_size` x `block_size` neighbourhood minus `offset`, black otherwise.
pub fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let local_mean = separable_filter_equal(gray, &gaussian_kernel(block_size));

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = f32::from(gray.get_pixel(x, y)[0]);
        let threshold = f32::from(local_mean.get_pixel(x, y)[0]) - offset;
        if value > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Non-local-means denoising over a single-channel image.
///
/// For every offset in the search window, patch distances for all pixels are
/// read from an integral image of squared differences, so the cost is
/// `pixels * search_window` instead of `pixels * search_window * patch`.
/// Rows are processed in bands so working memory does not grow with page height.
pub fn denoise_non_local_means(image: &GrayImage, params: NlMeansParams) -> GrayImage {
    denoise_in_bands(image, params, DENOISE_BAND_ROWS)
}

fn denoise_in_bands(image: &GrayImage, params: NlMeansParams, band_rows: usize) -> GrayImage {
    let width = image.width() as usize;
    let height = image.height() as usize;
    if width == 0 || height == 0 {
        return image.clone();
    }

    // rows a band needs beyond its own so no lookup is clipped at a band edge
    let halo = (params.search_radius + params.patch_radius) as usize;
    let band_rows = band_rows.max(1);
    let raw = image.as_raw();
    let mut output = GrayImage::new(image.width(), image.height());
    let pixels: &mut [u8] = &mut output;

    for band_start in (0..height).step_by(band_rows) {
        let band_end = (band_start + band_rows).min(height);
        let first = band_start.saturating_sub(halo);
        let last = (band_end + halo).min(height);

        let source: Vec<f32> = raw[first * width..last * width]
            .iter()
            .map(|&value| f32::from(value))
            .collect();
        let rows = denoise_rows(
            &source,
            width,
            last - first,
            band_start - first..band_end - first,
            params,
        );
        pixels[band_start * width..band_end * width].copy_from_slice(&rows);
    }

    output
}

/// Denoises the `keep` rows of a `width` x `height` block.
fn denoise_rows(
    source: &[f32],
    width: usize,
    height: usize,
    keep: Range<usize>,
    params: NlMeansParams,
) -> Vec<u8> {
    let search = params.search_radius as isize;
    let patch = params.patch_radius as isize;
    let patch_area = ((2 * patch + 1) * (2 * patch + 1)) as f64;
    let h2 = f64::from(params.strength * params.strength).max(f64::EPSILON);

    let kept = keep.len() * width;
    let mut weight_sum = vec![0.0_f64; kept];
    let mut value_sum = vec![0.0_f64; kept];
    let mut integral = vec![0.0_f64; (width + 1) * (height + 1)];

    for dy in -search..=search {
        for dx in -search..=search {
            fill_squared_difference_integral(source, width, height, dx, dy, &mut integral);

            for (row, y) in keep.clone().enumerate() {
                for x in 0..width {
                    let distance =
                        window_sum(&integral, width, height, x, y, patch) / patch_area;
                    let weight = (-distance / h2).exp();
                    let neighbour = source[clamped_index(width, height, x, y, dx, dy)];
                    let index = row * width + x;
                    weight_sum[index] += weight;
                    value_sum[index] += weight * f64::from(neighbour);
                }
            }
        }
    }

    // the zero offset always contributes weight 1, so weight_sum >= 1
    value_sum
        .iter()
        .zip(&weight_sum)
        .map(|(value, weight)| (value / weight).round().clamp(0.0, 255.0) as u8)
        .collect()
}

fn clamped_index(width: usize, height: usize, x: usize, y: usize, dx: isize, dy: isize) -> usize {
    let nx = (x as isize + dx).clamp(0, width as isize - 1) as usize;
    let ny = (y as isize + dy).clamp(0, height as isize - 1) as usize;
    ny * width + nx
}

fn fill_squared_difference_integral(
    source: &[f32],
    width: usize,
    height: usize,
    dx: isize,
    dy: isize,
    integral: &mut [f64],
) {
    let stride = width + 1;
    for value in integral.iter_mut().take(stride) {
        *value = 0.0;
    }

    for y in 0..height {
        let mut row_sum = 0.0_f64;
        integral[(y + 1) * stride] = 0.0;
        for x in 0..width {
            let diff = source[y * width + x] - source[clamped_index(width, height, x, y, dx, dy)];
            row_sum += f64::from(diff * diff);
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }
}

/// Sum over the patch centred at (x, y), clipped to the image bounds.
fn window_sum(
    integral: &[f64],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    radius: isize,
) -> f64 {
    let stride = width + 1;
    let x0 = (x as isize - radius).max(0) as usize;
    let y0 = (y as isize - radius).max(0) as usize;
    let x1 = ((x as isize + radius + 1) as usize).min(width);
    let y1 = ((y as isize + radius + 1) as usize).min(height);

    integral[y1 * stride + x1] - integral[y0 * stride + x1] - integral[y1 * stride + x0]
        + integral[y0 * stride + x0]
}
