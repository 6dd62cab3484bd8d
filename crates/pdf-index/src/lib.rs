//! PDF post-processing for pagelink.
//!
//! Takes the PDF printed by a rendering engine together with the anchor
//! geometry measured in the rendered document, and adds:
//! - invisible `/Link` annotations over every in-document link
//! - a nested outline built from numbered target titles ("1.2 Scope")

mod error;

pub mod annotate;
pub mod geometry;
pub mod outline;

pub use annotate::{emit, media_box_size, EmitSummary, IndexOptions};
pub use error::IndexError;
pub use geometry::{map_point, map_rect, scale_factor, PdfRect, DEFAULT_BASELINE_CORRECTION};
pub use outline::{build, parse_numbering, write_outline, Destination, OutlineEntry, OutlineTree};

use log::info;
use lopdf::Document;
use pagelink_types::AnchorRecord;
use std::path::Path;

/// Loads `src`, annotates it and saves the result to `dest`.
///
/// `src` and `dest` may be the same path.
pub fn index_pdf_file(
    src: &Path,
    dest: &Path,
    records: &[AnchorRecord],
    toc_page: Option<usize>,
    options: &IndexOptions,
) -> Result<EmitSummary, IndexError> {
    let mut doc = Document::load(src)?;
    let summary = emit(records, &mut doc, toc_page, options)?;
    doc.save(dest)?;
    info!("[INDEX] Wrote indexed PDF to {}.", dest.display());
    Ok(summary)
}

/// In-memory variant of [`index_pdf_file`].
pub fn index_pdf_bytes(
    bytes: &[u8],
    records: &[AnchorRecord],
    toc_page: Option<usize>,
    options: &IndexOptions,
) -> Result<(Vec<u8>, EmitSummary), IndexError> {
    let mut doc = Document::load_mem(bytes)?;
    let summary = emit(records, &mut doc, toc_page, options)?;
    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok((out, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object};
    use pagelink_types::GeometrySample;

    fn one_page_pdf() -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }
            .into(),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn sample(title: &str, y: f64) -> GeometrySample {
        GeometrySample {
            title: title.to_string(),
            x: 10.0,
            y,
            width: 100.0,
            height: 20.0,
            page_width: 794.0,
            page_height: 1123.0,
            page_index: 1,
        }
    }

    #[test]
    fn indexes_a_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        one_page_pdf().save(&path).unwrap();

        let mut record = AnchorRecord::new("top", sample("", 500.0));
        record.target = Some(sample("1 Top", 20.0));
        let summary = index_pdf_file(&path, &path, &[record], None, &IndexOptions::default()).unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.outline_entries, 1);

        let reloaded = Document::load(&path).unwrap();
        assert!(reloaded.catalog().unwrap().has(b"Outlines"));
    }

    #[test]
    fn rejects_bytes_that_are_not_pdf() {
        let err = index_pdf_bytes(b"hello", &[], None, &IndexOptions::default());
        assert!(matches!(err, Err(IndexError::Pdf(_))));
    }
}
