use image::DynamicImage;
use tracing::warn;

use super::engine::{RecognitionEngine, SegmentationMode};
use super::preprocess::{PreprocessError, preprocess};
use super::regions::{HeaderRegion, sample_header_regions};

/// Segmentation modes tried on every header crop.
pub const HEADER_MODES: [SegmentationMode; 3] = [
    SegmentationMode::UniformBlock,
    SegmentationMode::SingleColumn,
    SegmentationMode::FullyAutomatic,
];

/// The (crop height x segmentation mode) table driving header recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionPlan {
    pub fractions: Vec<f32>,
    pub modes: Vec<SegmentationMode>,
}

impl Default for RecognitionPlan {
    fn default() -> Self {
        Self {
            fractions: super::regions::HEADER_FRACTIONS.to_vec(),
            modes: HEADER_MODES.to_vec(),
        }
    }
}

/// Union of every non-empty recognition output for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedText {
    /// Uppercased outputs joined by single spaces.
    pub text: String,
    /// Trimmed outputs as the engine returned them, one per line.
    pub raw: String,
    pub attempts: usize,
    pub failures: usize,
}

impl AggregatedText {
    /// Every attempt errored, so an empty `text` says nothing about the page.
    pub fn is_degraded(&self) -> bool {
        self.attempts > 0 && self.failures == self.attempts
    }
}

/// Preprocesses each crop and runs every mode over it.
///
/// A failed recognition call is logged and skipped; a crop that cannot be
/// preprocessed aborts the page.
pub fn recognize_all(
    engine: &dyn RecognitionEngine,
    regions: &[HeaderRegion],
    modes: &[SegmentationMode],
    language: &str,
) -> Result<AggregatedText, PreprocessError> {
    let mut outputs = Vec::new();
    let mut aggregated = AggregatedText::default();

    for region in regions {
        let normalized = preprocess(&region.image)?;

        for &mode in modes {
            aggregated.attempts += 1;
            match engine.recognize(&normalized, language, mode) {
                Ok(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        outputs.push(trimmed.to_string());
                    }
                }
                Err(error) => {
                    aggregated.failures += 1;
                    warn!(
                        fraction = region.fraction,
                        mode = mode.as_str(),
                        error = %error,
                        "header recognition failed"
                    );
                }
            }
        }
    }

    aggregated.text = outputs
        .iter()
        .map(|output| output.to_uppercase())
        .collect::<Vec<_>>()
        .join(" ");
    aggregated.raw = outputs.join("\n");
    Ok(aggregated)
}

/// Samples the header crops of `page` per `plan` and recognizes them.
pub fn recognize_header(
    engine: &dyn RecognitionEngine,
    page: &DynamicImage,
    plan: &RecognitionPlan,
    language: &str,
) -> Result<AggregatedText, PreprocessError> {
    let regions = sample_header_regions(page, &plan.fractions);
    recognize_all(engine, &regions, &plan.modes, language)
}
