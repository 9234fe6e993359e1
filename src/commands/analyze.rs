use std::fs;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::info;

use crate::cli::AnalyzeArgs;
use crate::model::{AnalysisReport, PageAnalysis};
use crate::util::{ensure_directory, now_utc_string, write_json_pretty};

use super::{build_detector, detection_settings, render_input, thread_pool};

const REPORT_FILE_NAME: &str = "analisis_texto.txt";
const REPORT_JSON_NAME: &str = "analisis_texto.json";
const RULE_WIDTH: usize = 50;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    info!(input = %args.input_pdf.display(), "starting text analysis");

    ensure_directory(&args.output_dir)?;

    let detector = build_detector(&args.detection)?;
    let input = render_input(&args.input_pdf, &args.detection)?;

    let pool = thread_pool(args.detection.jobs)?;
    let pages: Vec<PageAnalysis> = pool.install(|| {
        input
            .pages
            .par_iter()
            .enumerate()
            .map(|(index, page)| {
                let trace = detector.get_diagnostics(page);
                PageAnalysis {
                    page: index + 1,
                    header_matches: detector.patterns().matches(&trace.header_text),
                    trace,
                }
            })
            .collect()
    });

    let report = AnalysisReport {
        generated_at: now_utc_string(),
        input_pdf: args.input_pdf.display().to_string(),
        page_count: pages.len(),
        settings: detection_settings(&args.detection, &detector),
        pages,
    };

    let text_path = args.output_dir.join(REPORT_FILE_NAME);
    fs::write(&text_path, render_text_report(&report))
        .with_context(|| format!("failed to write {}", text_path.display()))?;
    info!(path = %text_path.display(), "wrote text analysis");

    let json_path = args.output_dir.join(REPORT_JSON_NAME);
    write_json_pretty(&json_path, &report)?;
    info!(path = %json_path.display(), "wrote analysis json");

    Ok(())
}

fn render_text_report(report: &AnalysisReport) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = format!("ANÁLISIS DE TEXTO DETECTADO EN PDF\n{rule}\n\n");

    for page in &report.pages {
        let trace = &page.trace;
        out.push_str(&format!("PÁGINA {}\n{}\n", page.page, "-".repeat(30)));
        out.push_str(&format!("Texto detectado en encabezado:\n{}\n\n", trace.header_text));
        if page.header_matches {
            out.push_str("Marcador encontrado en encabezado\n\n");
        }

        if !trace.similar_text_found.is_empty() {
            out.push_str("Textos similares encontrados:\n");
            out.push_str(&bullet_list(&trace.similar_text_found));
        }

        out.push_str("\nPatrones buscados:\n");
        out.push_str(&bullet_list(&trace.patterns_tried));
        out.push_str(&format!("\n{rule}\n\n"));
    }

    out
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|item| format!("- {item}\n")).collect()
}
