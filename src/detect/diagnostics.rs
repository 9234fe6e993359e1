use image::DynamicImage;
use serde::Serialize;
use tracing::warn;

use super::engine::RecognitionEngine;
use super::patterns::PatternSet;
use super::recognition::{RecognitionPlan, recognize_header};

/// Token roots that hint at a garbled marker.
pub const SUSPICIOUS_ROOTS: [&str; 2] = ["LIQUID", "PROVIS"];

/// Advisory record of what the header recognition saw on one page.
///
/// Every field is always present; on failure they are simply empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebugTrace {
    pub header_text: String,
    pub image_dimensions: (u32, u32),
    pub patterns_tried: Vec<String>,
    pub similar_text_found: Vec<String>,
    pub raw_text: String,
}

/// Whitespace-delimited tokens of uppercased `text` containing a suspicious root.
pub fn similar_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(str::to_uppercase)
        .filter(|token| SUSPICIOUS_ROOTS.iter().any(|root| token.contains(root)))
        .collect()
}

pub fn looks_suspicious(text: &str) -> bool {
    !similar_tokens(text).is_empty()
}

/// Re-runs header recognition and reports it. Never fails.
pub fn collect(
    engine: &dyn RecognitionEngine,
    page: &DynamicImage,
    plan: &RecognitionPlan,
    patterns: &PatternSet,
    language: &str,
) -> DebugTrace {
    match recognize_header(engine, page, plan, language) {
        Ok(aggregated) => DebugTrace {
            similar_text_found: similar_tokens(&aggregated.text),
            header_text: aggregated.text,
            image_dimensions: (page.width(), page.height()),
            patterns_tried: patterns.sources(),
            raw_text: aggregated.raw,
        },
        Err(error) => {
            warn!(error = %error, "diagnostics fell back to an empty trace");
            DebugTrace::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similar_tokens_pick_up_partial_marker_roots() {
        let tokens = similar_tokens("ACME LIQUIDA XPROVISX liquidacíon otra PR0VIS LIQ");
        assert_eq!(
            tokens,
            vec![
                "LIQUIDA".to_string(),
                "XPROVISX".to_string(),
                "LIQUIDACÍON".to_string()
            ]
        );
    }

    #[test]
    fn empty_text_has_no_similar_tokens() {
        assert!(similar_tokens("").is_empty());
        assert!(!looks_suspicious("   "));
    }

    #[test]
    fn default_trace_is_fully_empty() {
        let trace = DebugTrace::default();
        assert!(trace.header_text.is_empty());
        assert_eq!(trace.image_dimensions, (0, 0));
        assert!(trace.patterns_tried.is_empty());
        assert!(trace.similar_text_found.is_empty());
        assert!(trace.raw_text.is_empty());
    }
}
