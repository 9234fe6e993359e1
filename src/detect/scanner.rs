use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, debug, enabled, info, warn};

use super::DetectorConfig;
use super::diagnostics::{self, DebugTrace};
use super::engine::{RecognitionEngine, RecognitionError};
use super::patterns::{PatternEntry, PatternSet};
use super::preprocess::{PreprocessError, preprocess};
use super::recognition::recognize_header;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPass {
    Header,
    FullPage,
}

impl DetectionPass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::FullPage => "full_page",
        }
    }
}

/// Per-page decision. Only `Boundary` pages become split points; `Degraded`
/// means recognition trouble kept the page from being judged.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageOutcome {
    Boundary {
        pass: DetectionPass,
        pattern: String,
    },
    NoMarker,
    Degraded {
        reason: String,
    },
}

impl PageOutcome {
    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::Boundary { .. })
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub outcomes: Vec<PageOutcome>,
    /// Strictly increasing 0-based page positions.
    pub boundaries: Vec<usize>,
}

impl ScanReport {
    pub fn degraded_pages(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| matches!(outcome, PageOutcome::Degraded { .. }))
            .map(|(index, _)| index)
            .collect()
    }
}

pub struct BoundaryDetector {
    engine: Box<dyn RecognitionEngine>,
    patterns: PatternSet,
    config: DetectorConfig,
}

impl BoundaryDetector {
    pub fn new(
        engine: Box<dyn RecognitionEngine>,
        patterns: PatternSet,
        config: DetectorConfig,
    ) -> Self {
        Self {
            engine,
            patterns,
            config,
        }
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Positions of every page judged to start a new statement.
    pub fn detect_boundaries(&self, pages: &[DynamicImage]) -> Vec<usize> {
        self.scan(pages).boundaries
    }

    /// Evaluates pages on the current rayon pool. Outcomes come back in page
    /// order, and the boundary list is built from them in a single pass.
    pub fn scan(&self, pages: &[DynamicImage]) -> ScanReport {
        let total = pages.len();
        info!(pages = total, "searching for split points");

        let outcomes: Vec<PageOutcome> = pages
            .par_iter()
            .enumerate()
            .map(|(index, page)| self.evaluate_page(index, total, page))
            .collect();

        let boundaries: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| outcome.is_boundary())
            .map(|(index, _)| index)
            .collect();

        info!(split_points = boundaries.len(), "search completed");
        ScanReport {
            outcomes,
            boundaries,
        }
    }

    pub fn evaluate_page(&self, index: usize, total: usize, page: &DynamicImage) -> PageOutcome {
        let page_number = index + 1;
        info!(page = page_number, total, "processing page");

        if enabled!(Level::DEBUG) {
            let trace = self.get_diagnostics(page);
            debug!(page = page_number, trace = ?trace, "page diagnostics");
        }

        let mut degraded = None;
        let header_text = match recognize_header(
            &*self.engine,
            page,
            &self.config.header_plan,
            &self.config.language,
        ) {
            Ok(aggregated) => {
                if let Some(entry) = self.patterns.first_match(&aggregated.text) {
                    return self.boundary(page_number, DetectionPass::Header, entry);
                }
                if aggregated.is_degraded() {
                    degraded = Some(format!(
                        "all {} header recognitions failed",
                        aggregated.attempts
                    ));
                }
                aggregated.text
            }
            Err(error) => {
                warn!(page = page_number, error = %error, "header pass failed");
                degraded = Some(error.to_string());
                String::new()
            }
        };

        if self.config.fallback_policy.should_run(&header_text) {
            match self.matches_fullpage(page) {
                Ok(Some(entry)) => {
                    return self.boundary(page_number, DetectionPass::FullPage, entry);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(page = page_number, error = %error, "full-page pass failed");
                    degraded.get_or_insert_with(|| error.to_string());
                }
            }
        }

        debug!(page = page_number, header_text = %header_text, "no marker detected");
        match degraded {
            Some(reason) => PageOutcome::Degraded { reason },
            None => PageOutcome::NoMarker,
        }
    }

    /// Preprocesses the whole page, recognizes it once and tests the pattern set.
    pub fn matches_fullpage(
        &self,
        page: &DynamicImage,
    ) -> Result<Option<&PatternEntry>, PageError> {
        let normalized = preprocess(page)?;
        let text = self
            .engine
            .recognize(&normalized, &self.config.language, self.config.fullpage_mode)?
            .to_uppercase();
        Ok(self.patterns.first_match(&text))
    }

    /// Advisory trace for one page; never influences `evaluate_page`.
    pub fn get_diagnostics(&self, page: &DynamicImage) -> DebugTrace {
        diagnostics::collect(
            &*self.engine,
            page,
            &self.config.header_plan,
            &self.patterns,
            &self.config.language,
        )
    }

    fn boundary(
        &self,
        page_number: usize,
        pass: DetectionPass,
        entry: &PatternEntry,
    ) -> PageOutcome {
        info!(
            page = page_number,
            pass = pass.as_str(),
            pattern = %entry.name,
            "found split point"
        );
        PageOutcome::Boundary {
            pass,
            pattern: entry.name.clone(),
        }
    }
}
