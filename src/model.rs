use serde::Serialize;

use crate::detect::DebugTrace;

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftoppm: Option<String>,
    pub tesseract: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentRecord {
    pub index: usize,
    pub first_page: usize,
    pub last_page: usize,
    pub page_count: usize,
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionSettings {
    pub dpi: u32,
    pub language: String,
    pub fallback_policy: String,
    pub pattern_table_version: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub input_pdf: String,
    pub input_sha256: String,
    pub page_count: usize,
    pub settings: DetectionSettings,
    pub boundaries: Vec<usize>,
    pub degraded_pages: Vec<usize>,
    pub segments: Vec<SegmentRecord>,
    pub tool_versions: ToolVersions,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageAnalysis {
    pub page: usize,
    pub header_matches: bool,
    pub trace: DebugTrace,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub input_pdf: String,
    pub page_count: usize,
    pub settings: DetectionSettings,
    pub pages: Vec<PageAnalysis>,
}
