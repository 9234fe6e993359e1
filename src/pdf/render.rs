use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use image::DynamicImage;
use tracing::{debug, info};

/// Renders PDF pages to grayscale rasters with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    program: String,
}

impl PdftoppmRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// One raster per page, in page order. Intermediate PNGs live in a
    /// temporary directory removed on return.
    pub fn render(
        &self,
        pdf_path: &Path,
        page_count: usize,
        dpi: u32,
    ) -> Result<Vec<DynamicImage>> {
        info!(dpi, pages = page_count, "converting PDF to images");

        let workdir = tempfile::Builder::new()
            .prefix("liquidacion_render_")
            .tempdir()
            .context("failed to create render directory")?;

        let mut pages = Vec::with_capacity(page_count);
        for page_number in 1..=page_count {
            pages.push(self.render_page(pdf_path, page_number, dpi, workdir.path())?);
        }

        info!(pages = pages.len(), "PDF converted");
        Ok(pages)
    }

    fn render_page(
        &self,
        pdf_path: &Path,
        page_number: usize,
        dpi: u32,
        workdir: &Path,
    ) -> Result<DynamicImage> {
        let output_root = workdir.join(format!("page_{page_number}"));
        let png_path = output_root.with_extension("png");

        let output = Command::new(&self.program)
            .arg("-f")
            .arg(page_number.to_string())
            .arg("-l")
            .arg(page_number.to_string())
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-gray")
            .arg("-singlefile")
            .arg("-png")
            .arg(pdf_path)
            .arg(&output_root)
            .output()
            .with_context(|| {
                format!("failed to execute {} for {}", self.program, pdf_path.display())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} returned non-zero exit status for {} page {}: {}",
                self.program,
                pdf_path.display(),
                page_number,
                stderr.trim()
            );
        }

        if !png_path.exists() {
            bail!(
                "{} did not produce expected image for {} page {}",
                self.program,
                pdf_path.display(),
                page_number
            );
        }

        let image = image::open(&png_path)
            .with_context(|| format!("failed to decode {}", png_path.display()))?;
        let _ = fs::remove_file(&png_path);

        debug!(
            page = page_number,
            width = image.width(),
            height = image.height(),
            "rendered page"
        );
        Ok(image)
    }
}
