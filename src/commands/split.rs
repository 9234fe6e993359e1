use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::SplitArgs;
use crate::detect::PageOutcome;
use crate::model::{SegmentRecord, SplitRunManifest};
use crate::pdf::split::{plan_segments, validate_output_pattern, write_segments};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

use super::{build_detector, collect_tool_versions, detection_settings, render_input, thread_pool};

pub fn run(args: SplitArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("split-{}", utc_compact_string(started_ts));

    info!(input = %args.input_pdf.display(), run_id = %run_id, "starting split");

    validate_output_pattern(&args.output_pattern)?;
    ensure_directory(&args.output_dir)?;

    let detector = build_detector(&args.detection)?;
    let input = render_input(&args.input_pdf, &args.detection)?;
    let page_count = input.pages.len();

    let pool = thread_pool(args.detection.jobs)?;
    let report = pool.install(|| detector.scan(&input.pages));
    drop(input.pages);

    let mut warnings = Vec::new();
    for (index, outcome) in report.outcomes.iter().enumerate() {
        if let PageOutcome::Degraded { reason } = outcome {
            warn!(page = index + 1, reason = %reason, "page recognition degraded");
            warnings.push(format!("page {} recognition degraded: {}", index + 1, reason));
        }
    }

    let segments = plan_segments(&report.boundaries, page_count);
    let written = if segments.is_empty() {
        warn!("no split points found, no files written");
        warnings.push("no split points found".to_string());
        Vec::new()
    } else {
        if let Some(first) = report.boundaries.first().filter(|&&first| first > 0) {
            warn!(pages = first, "pages before the first split point are not written");
        }
        write_segments(
            &input.document,
            &segments,
            &args.output_dir,
            &args.output_pattern,
        )?
    };

    if let Some(manifest_path) = &args.manifest_path {
        let manifest = SplitRunManifest {
            manifest_version: 1,
            run_id,
            started_at,
            completed_at: now_utc_string(),
            input_pdf: args.input_pdf.display().to_string(),
            input_sha256: sha256_file(&args.input_pdf)?,
            page_count,
            settings: detection_settings(&args.detection, &detector),
            boundaries: report.boundaries.clone(),
            degraded_pages: report.degraded_pages(),
            segments: segments
                .iter()
                .zip(&written)
                .map(|(segment, path)| SegmentRecord {
                    index: segment.index,
                    first_page: segment.start + 1,
                    last_page: segment.end,
                    page_count: segment.page_count(),
                    output_path: path.display().to_string(),
                })
                .collect(),
            tool_versions: collect_tool_versions(&args.detection),
            warnings,
        };
        write_json_pretty(manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote split manifest");
    }

    info!(files = written.len(), "split completed");
    Ok(())
}
