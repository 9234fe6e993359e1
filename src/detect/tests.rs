use std::collections::{HashMap, HashSet};

use image::{DynamicImage, GrayImage, Luma};

use super::engine::RecognitionError;
use super::*;
use crate::pdf::split::{Segment, plan_segments};

const PAGE_HEIGHT: u32 = 100;

/// Answers by image width, which header crops and preprocessing preserve;
/// full-height images are the full-page pass.
#[derive(Default)]
struct StubEngine {
    header: HashMap<u32, String>,
    full_page: HashMap<u32, String>,
    failing_widths: HashSet<u32>,
}

impl StubEngine {
    fn with_header(mut self, width: u32, text: &str) -> Self {
        self.header.insert(width, text.to_string());
        self
    }

    fn with_full_page(mut self, width: u32, text: &str) -> Self {
        self.full_page.insert(width, text.to_string());
        self
    }

    fn failing(mut self, width: u32) -> Self {
        self.failing_widths.insert(width);
        self
    }
}

impl RecognitionEngine for StubEngine {
    fn recognize(
        &self,
        image: &GrayImage,
        _language: &str,
        _mode: SegmentationMode,
    ) -> Result<String, RecognitionError> {
        if self.failing_widths.contains(&image.width()) {
            return Err(RecognitionError::Timeout {
                program: "stub".to_string(),
                timeout: std::time::Duration::from_secs(1),
            });
        }

        let table = if image.height() == PAGE_HEIGHT {
            &self.full_page
        } else {
            &self.header
        };
        Ok(table.get(&image.width()).cloned().unwrap_or_default())
    }
}

fn page(width: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, PAGE_HEIGHT, Luma([255])))
}

fn pages(widths: &[u32]) -> Vec<DynamicImage> {
    widths.iter().map(|&width| page(width)).collect()
}

fn detector(engine: StubEngine) -> BoundaryDetector {
    detector_with_policy(engine, FallbackPolicy::Always)
}

fn detector_with_policy(engine: StubEngine, policy: FallbackPolicy) -> BoundaryDetector {
    let config = DetectorConfig {
        fallback_policy: policy,
        ..DetectorConfig::default()
    };
    BoundaryDetector::new(
        Box::new(engine),
        PatternSet::builtin().expect("builtin patterns compile"),
        config,
    )
}

#[test]
fn exact_marker_in_header_is_a_boundary() {
    let detector = detector(StubEngine::default().with_header(11, "LIQUIDACIÓN PROVISIONAL"));

    assert_eq!(detector.detect_boundaries(&pages(&[11])), vec![0]);
    assert_eq!(
        detector.evaluate_page(0, 1, &page(11)),
        PageOutcome::Boundary {
            pass: DetectionPass::Header,
            pattern: "literal_accented".to_string()
        }
    );
}

#[test]
fn accent_misread_as_stroke_is_still_a_boundary() {
    let detector = detector(
        StubEngine::default()
            .with_header(11, "LIQUIDACIlN PROVISIONAL")
            .with_header(12, "LIQUIDACIIN PROVISIONAL"),
    );

    assert_eq!(detector.detect_boundaries(&pages(&[11, 12])), vec![0, 1]);
}

#[test]
fn empty_recognition_is_not_a_boundary_and_yields_empty_diagnostics() {
    let detector = detector(StubEngine::default());

    assert!(detector.detect_boundaries(&pages(&[11])).is_empty());
    assert_eq!(detector.evaluate_page(0, 1, &page(11)), PageOutcome::NoMarker);

    let trace = detector.get_diagnostics(&page(11));
    assert!(trace.header_text.is_empty());
    assert!(trace.similar_text_found.is_empty());
    assert!(trace.raw_text.is_empty());
    assert_eq!(trace.image_dimensions, (11, PAGE_HEIGHT));
    assert_eq!(trace.patterns_tried, detector.patterns().sources());
}

#[test]
fn flagged_pages_of_five_page_document_split_into_two_segments() {
    let detector = detector(
        StubEngine::default()
            .with_header(10, "LIQUIDACIÓN PROVISIONAL Nº 1")
            .with_header(11, "DETALLE DE CONCEPTOS")
            .with_header(12, "liquidacion provisional")
            .with_header(13, "ANEXO"),
    );
    let document = pages(&[10, 11, 12, 13, 14]);

    let boundaries = detector.detect_boundaries(&document);
    assert_eq!(boundaries, vec![0, 2]);
    assert_eq!(
        plan_segments(&boundaries, document.len()),
        vec![
            Segment {
                index: 0,
                start: 0,
                end: 2
            },
            Segment {
                index: 1,
                start: 2,
                end: 5
            },
        ]
    );
}

#[test]
fn no_marker_anywhere_yields_empty_boundary_list() {
    let detector = detector(StubEngine::default().with_header(11, "FACTURA"));

    let report = detector.scan(&pages(&[10, 11, 12]));
    assert!(report.boundaries.is_empty());
    assert!(report.degraded_pages().is_empty());
    assert!(report.outcomes.iter().all(|outcome| *outcome == PageOutcome::NoMarker));
}

#[test]
fn repeated_scans_with_deterministic_engine_agree() {
    let detector = detector(
        StubEngine::default()
            .with_header(12, "LIQUIDACION PROVISIONAL")
            .with_full_page(14, "... LIQUIDACIÓN PROVISIONAL ..."),
    );
    let document = pages(&[10, 11, 12, 13, 14, 15]);

    let first = detector.detect_boundaries(&document);
    let second = detector.detect_boundaries(&document);
    assert_eq!(first, second);
    assert_eq!(first, vec![2, 4]);
}

#[test]
fn boundaries_are_strictly_increasing_and_in_range() {
    let widths: Vec<u32> = (10..40).collect();
    let mut engine = StubEngine::default();
    for width in widths.iter().copied().filter(|width| width % 3 == 0) {
        engine = engine.with_header(width, "LIQUIDACIÓN PROVISIONAL");
    }
    let detector = detector(engine);
    let document = pages(&widths);

    let boundaries = detector.detect_boundaries(&document);
    assert!(!boundaries.is_empty());
    assert!(boundaries.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(boundaries.iter().all(|&index| index < document.len()));
}

#[test]
fn full_page_pass_catches_markers_missed_by_header_crops() {
    let engine = StubEngine::default().with_full_page(11, "texto LIQUIDACIÓN PROVISIONAL texto");
    let detector = detector(engine);

    assert_eq!(
        detector.evaluate_page(0, 1, &page(11)),
        PageOutcome::Boundary {
            pass: DetectionPass::FullPage,
            pattern: "literal_accented".to_string()
        }
    );
    assert!(
        detector
            .matches_fullpage(&page(11))
            .expect("full page recognizes")
            .is_some()
    );
}

#[test]
fn never_policy_skips_the_full_page_pass() {
    let engine = StubEngine::default().with_full_page(11, "LIQUIDACIÓN PROVISIONAL");
    let detector = detector_with_policy(engine, FallbackPolicy::Never);

    assert_eq!(detector.evaluate_page(0, 1, &page(11)), PageOutcome::NoMarker);
}

#[test]
fn suspicious_policy_runs_full_page_only_for_partial_tokens() {
    let engine = StubEngine::default()
        .with_header(11, "LIQUIDAC10M PR0V")
        .with_full_page(11, "LIQUIDACIÓN PROVISIONAL")
        .with_header(12, "FACTURA")
        .with_full_page(12, "LIQUIDACIÓN PROVISIONAL");
    let detector = detector_with_policy(engine, FallbackPolicy::Suspicious);

    assert_eq!(detector.detect_boundaries(&pages(&[11, 12])), vec![0]);
}

#[test]
fn failing_recognition_degrades_the_page_without_aborting_the_scan() {
    let engine = StubEngine::default()
        .failing(11)
        .with_header(12, "LIQUIDACIÓN PROVISIONAL");
    let detector = detector(engine);

    let report = detector.scan(&pages(&[11, 12]));
    assert_eq!(report.boundaries, vec![1]);
    assert_eq!(report.degraded_pages(), vec![0]);

    let trace = detector.get_diagnostics(&page(11));
    assert!(trace.header_text.is_empty());
    assert!(trace.similar_text_found.is_empty());
}

#[test]
fn malformed_page_is_treated_as_no_boundary() {
    let engine = StubEngine::default().with_header(12, "LIQUIDACIÓN PROVISIONAL");
    let detector = detector(engine);
    let document = vec![DynamicImage::ImageLuma8(GrayImage::new(12, 0)), page(12)];

    let report = detector.scan(&document);
    assert_eq!(report.boundaries, vec![1]);
    assert!(matches!(report.outcomes[0], PageOutcome::Degraded { .. }));
    assert_eq!(detector.get_diagnostics(&document[0]), DebugTrace::default());
}

#[test]
fn diagnostics_report_similar_tokens_without_changing_the_decision() {
    let engine = StubEngine::default().with_header(11, "LIQUIDAC1ON PR0VISI0NAL");
    let detector = detector_with_policy(engine, FallbackPolicy::Never);

    let trace = detector.get_diagnostics(&page(11));
    assert!(trace.header_text.starts_with("LIQUIDAC1ON"));
    assert!(trace.similar_text_found.contains(&"LIQUIDAC1ON".to_string()));
    assert_eq!(detector.evaluate_page(0, 1, &page(11)), PageOutcome::NoMarker);
}

#[test]
fn fallback_policy_round_trips_through_its_command_line_name() {
    use clap::ValueEnum;

    for policy in [
        FallbackPolicy::Always,
        FallbackPolicy::Suspicious,
        FallbackPolicy::Never,
    ] {
        assert_eq!(
            <FallbackPolicy as ValueEnum>::from_str(policy.as_str(), false),
            Ok(policy)
        );
    }
    assert!(!FallbackPolicy::Suspicious.should_run("TOTAL A PAGAR"));
    assert!(FallbackPolicy::Suspicious.should_run("LIQUIDAC1ON"));
}
