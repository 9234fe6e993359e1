use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use lopdf::Document;
use serde::Serialize;
use tracing::info;

const PLACEHOLDER: &str = "{}";

/// Half-open page range `[start, end)` of one output document, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn page_count(&self) -> usize {
        self.end - self.start
    }
}

/// Each boundary opens a segment that runs to the next boundary or to the
/// end of the document. Pages before the first boundary are not covered.
pub fn plan_segments(boundaries: &[usize], total_pages: usize) -> Vec<Segment> {
    let starts: Vec<usize> = boundaries
        .iter()
        .copied()
        .filter(|&start| start < total_pages)
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(index, &start)| Segment {
            index,
            start,
            end: starts.get(index + 1).copied().unwrap_or(total_pages),
        })
        .collect()
}

pub fn validate_output_pattern(pattern: &str) -> Result<()> {
    let placeholders = pattern.matches(PLACEHOLDER).count();
    if placeholders != 1 {
        bail!(
            "output pattern '{}' must contain exactly one '{}' placeholder, found {}",
            pattern,
            PLACEHOLDER,
            placeholders
        );
    }
    Ok(())
}

pub fn output_file_name(pattern: &str, index: usize) -> String {
    pattern.replacen(PLACEHOLDER, &index.to_string(), 1)
}

pub fn load_document(path: &Path) -> Result<Document> {
    Document::load(path).with_context(|| format!("failed to load PDF {}", path.display()))
}

pub fn page_count(document: &Document) -> usize {
    document.get_pages().len()
}

/// Writes one PDF per segment into `output_dir`, named after `pattern`.
pub fn write_segments(
    document: &Document,
    segments: &[Segment],
    output_dir: &Path,
    pattern: &str,
) -> Result<Vec<PathBuf>> {
    let total_pages = page_count(document) as u32;
    let mut written = Vec::with_capacity(segments.len());

    for segment in segments {
        info!(
            segment = segment.index + 1,
            first_page = segment.start + 1,
            last_page = segment.end,
            "processing segment"
        );

        // lopdf page numbers are 1-based
        let keep = (segment.start as u32 + 1)..=(segment.end as u32);
        let dropped: Vec<u32> = (1..=total_pages)
            .filter(|page_number| !keep.contains(page_number))
            .collect();

        let mut part = document.clone();
        part.delete_pages(&dropped);
        part.prune_objects();
        part.compress();

        let path = output_dir.join(output_file_name(pattern, segment.index));
        part.save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "created file");
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use lopdf::{Object, Stream, dictionary};

    use super::*;

    fn blank_document(pages: usize) -> Document {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();

        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                let content_id = document.add_object(Stream::new(dictionary! {}, Vec::new()));
                document
                    .add_object(dictionary! {
                        "Type" => "Page",
                        "Parent" => pages_id,
                        "Contents" => content_id,
                        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                    })
                    .into()
            })
            .collect();

        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        document
    }

    #[test]
    fn segments_run_from_each_boundary_to_the_next() {
        assert_eq!(
            plan_segments(&[0, 2], 5),
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
    fn pages_before_the_first_boundary_are_not_emitted() {
        let segments = plan_segments(&[3], 6);
        assert_eq!(
            segments,
            vec![Segment {
                index: 0,
                start: 3,
                end: 6
            }]
        );
        assert_eq!(segments[0].page_count(), 3);
    }

    #[test]
    fn empty_boundaries_plan_no_segments() {
        assert!(plan_segments(&[], 4).is_empty());
    }

    #[test]
    fn out_of_range_boundaries_are_ignored() {
        assert_eq!(plan_segments(&[1, 9], 4).len(), 1);
        assert_eq!(plan_segments(&[1, 9], 4)[0].end, 4);
    }

    #[test]
    fn output_pattern_needs_a_single_placeholder() {
        assert!(validate_output_pattern("liquidacion_{}.pdf").is_ok());
        assert!(validate_output_pattern("liquidacion.pdf").is_err());
        assert!(validate_output_pattern("{}_{}.pdf").is_err());
        assert_eq!(output_file_name("liquidacion_{}.pdf", 3), "liquidacion_3.pdf");
    }

    #[test]
    fn write_segments_partitions_the_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source_path = dir.path().join("input.pdf");
        blank_document(5).save(&source_path).expect("save source");

        let document = load_document(&source_path).expect("reload source");
        assert_eq!(page_count(&document), 5);

        let segments = plan_segments(&[0, 2], page_count(&document));
        let written = write_segments(&document, &segments, dir.path(), "liquidacion_{}.pdf")
            .expect("segments written");

        assert_eq!(
            written,
            vec![
                dir.path().join("liquidacion_0.pdf"),
                dir.path().join("liquidacion_1.pdf")
            ]
        );
        let counts: Vec<usize> = written
            .iter()
            .map(|path| page_count(&load_document(path).expect("segment loads")))
            .collect();
        assert_eq!(counts, vec![2, 3]);
    }
}
