use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use image::DynamicImage;
use lopdf::Document;
use tracing::info;

use crate::cli::DetectionArgs;
use crate::detect::{
    BoundaryDetector, DetectorConfig, PatternSet, PatternTable, TesseractEngine,
};
use crate::model::{DetectionSettings, ToolVersions};
use crate::pdf::render::PdftoppmRenderer;
use crate::pdf::split::{load_document, page_count};
use crate::util::tool_version;

pub mod analyze;
pub mod split;
pub mod tools;

/// A loaded input PDF together with one raster per page.
struct RenderedInput {
    document: Document,
    pages: Vec<DynamicImage>,
}

fn load_pattern_set(args: &DetectionArgs) -> Result<PatternSet> {
    let table = match &args.patterns_path {
        Some(path) => PatternTable::load(path)?,
        None => PatternTable::builtin(),
    };
    let patterns = PatternSet::compile(&table).context("invalid pattern table")?;
    info!(
        version = patterns.version(),
        patterns = patterns.sources().len(),
        "loaded pattern table"
    );
    Ok(patterns)
}

fn build_detector(args: &DetectionArgs) -> Result<BoundaryDetector> {
    let engine = TesseractEngine::new(
        &args.tesseract_bin,
        Duration::from_secs(args.ocr_timeout_secs),
    );
    let config = DetectorConfig {
        language: args.lang.clone(),
        fallback_policy: args.fallback_policy,
        ..DetectorConfig::default()
    };
    Ok(BoundaryDetector::new(
        Box::new(engine),
        load_pattern_set(args)?,
        config,
    ))
}

fn detection_settings(args: &DetectionArgs, detector: &BoundaryDetector) -> DetectionSettings {
    DetectionSettings {
        dpi: args.dpi,
        language: args.lang.clone(),
        fallback_policy: args.fallback_policy.as_str().to_string(),
        pattern_table_version: detector.patterns().version(),
    }
}

fn render_input(input_pdf: &Path, args: &DetectionArgs) -> Result<RenderedInput> {
    if !input_pdf.exists() {
        bail!("input PDF {} does not exist", input_pdf.display());
    }

    let document = load_document(input_pdf)?;
    let expected_pages = page_count(&document);
    if expected_pages == 0 {
        bail!("{} has no pages", input_pdf.display());
    }

    let pages =
        PdftoppmRenderer::new(&args.pdftoppm_bin).render(input_pdf, expected_pages, args.dpi)?;
    if pages.len() != expected_pages {
        bail!(
            "rendered {} images for {} but the document has {} pages",
            pages.len(),
            input_pdf.display(),
            expected_pages
        );
    }

    Ok(RenderedInput { document, pages })
}

fn thread_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|index| format!("page-worker-{index}"))
        .build()
        .context("failed to build page worker pool")
}

fn collect_tool_versions(args: &DetectionArgs) -> ToolVersions {
    ToolVersions {
        pdftoppm: tool_version(&args.pdftoppm_bin, &["-v"]),
        tesseract: tool_version(&args.tesseract_bin, &["--version"]),
    }
}
