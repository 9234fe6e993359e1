//! Page-boundary detection: decides, per rendered page, whether it starts a
//! new "LIQUIDACIÓN PROVISIONAL" statement.
//!
//! Header crops are preprocessed and recognized under several segmentation
//! modes, the union of the text is tested against the pattern set, and a
//! full-page pass runs when the header finds nothing. Any recognition trouble
//! degrades to "not a boundary" for that page only.

use clap::ValueEnum;

pub mod diagnostics;
pub mod engine;
pub mod patterns;
pub mod preprocess;
pub mod recognition;
pub mod regions;
pub mod scanner;
#[cfg(test)]
mod tests;

pub use diagnostics::DebugTrace;
pub use engine::{RecognitionEngine, SegmentationMode, TesseractEngine};
pub use patterns::{PatternSet, PatternTable};
pub use recognition::RecognitionPlan;
pub use scanner::{BoundaryDetector, DetectionPass, PageOutcome, ScanReport};

pub const DEFAULT_LANGUAGE: &str = "spa";

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub language: String,
    pub header_plan: RecognitionPlan,
    pub fullpage_mode: SegmentationMode,
    pub fallback_policy: FallbackPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            header_plan: RecognitionPlan::default(),
            fullpage_mode: SegmentationMode::FullyAutomatic,
            fallback_policy: FallbackPolicy::Always,
        }
    }
}

/// When the full-page pass runs after the header pass found nothing.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FallbackPolicy {
    Always,
    /// Only when header tokens resemble the marker.
    Suspicious,
    Never,
}

impl FallbackPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Suspicious => "suspicious",
            Self::Never => "never",
        }
    }

    /// Whether a page whose header produced `header_text` gets a full-page pass.
    pub fn should_run(self, header_text: &str) -> bool {
        match self {
            Self::Always => true,
            Self::Suspicious => diagnostics::looks_suspicious(header_text),
            Self::Never => false,
        }
    }
}
