//! Turns resolved anchors into `/Link` annotations and outline entries.

use crate::error::IndexError;
use crate::geometry::{map_point, map_rect, DEFAULT_BASELINE_CORRECTION};
use crate::outline::{self, Destination, OutlineEntry};
use log::{debug, info, warn};
use lopdf::{dictionary, Document, Object, ObjectId};
use pagelink_types::{AnchorRecord, Size};
use std::collections::BTreeMap;

/// Tuning for the post-processing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOptions {
    /// Share of the CSS page height subtracted from link rectangles' y.
    pub baseline_correction: f64,
    /// Draw a one point border around every link.
    pub debug_borders: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            baseline_correction: DEFAULT_BASELINE_CORRECTION,
            debug_borders: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub applied: usize,
    pub skipped: usize,
    pub outline_entries: usize,
}

/// Adds a link annotation for every usable record and attaches the outline.
///
/// A record is usable when it has a target, both page indices fall inside
/// the document and all four page sizes are positive. Anything else is
/// counted in `skipped` and logged.
pub fn emit(
    records: &[AnchorRecord],
    doc: &mut Document,
    toc_page: Option<usize>,
    options: &IndexOptions,
) -> Result<EmitSummary, IndexError> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let page_sizes: Vec<Size> = page_ids.iter().map(|&id| media_box_size(doc, id)).collect();

    let mut summary = EmitSummary::default();
    let mut annots_by_page: BTreeMap<usize, Vec<ObjectId>> = BTreeMap::new();
    let mut entries = Vec::new();

    for record in records {
        let Some(target) = &record.target else {
            debug!("[INDEX] Anchor '{}' has no target in this document; skipped.", record.name);
            summary.skipped += 1;
            continue;
        };
        let (Some(source_page), Some(target_page)) = (
            record.source.page_in(page_ids.len()),
            target.page_in(page_ids.len()),
        ) else {
            warn!(
                "[INDEX] Anchor '{}' links page {} to page {} but the document has {} pages; skipped.",
                record.name,
                record.source.page_index,
                target.page_index,
                page_ids.len()
            );
            summary.skipped += 1;
            continue;
        };

        let (source_pdf, target_pdf) = (page_sizes[source_page], page_sizes[target_page]);
        let sizes = [record.source.page_size(), target.page_size(), source_pdf, target_pdf];
        if !sizes.iter().all(|s| s.is_positive()) {
            warn!(
                "[INDEX] Anchor '{}' has unusable page sizes (css {:?} -> {:?}, pdf {:?} -> {:?}); skipped.",
                record.name, sizes[0], sizes[1], sizes[2], sizes[3]
            );
            summary.skipped += 1;
            continue;
        }

        let rect = map_rect(&record.source, source_pdf, options.baseline_correction);
        let (left, top) = map_point(target, target_pdf);
        let destination = Destination {
            page_index: target_page,
            left,
            top,
        };

        let border = if options.debug_borders { 1 } else { 0 };
        let annot = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect.to_array().iter().map(|&v| Object::Real(v as f32)).collect::<Vec<_>>(),
            "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(border)],
            "Dest" => destination.to_pdf(page_ids[target_page]),
        };
        let annot_id = doc.add_object(annot);
        annots_by_page.entry(source_page).or_default().push(annot_id);
        summary.applied += 1;

        if let Some(entry) = OutlineEntry::from_title(&target.title, destination) {
            entries.push(entry);
        }
    }

    for (page, annots) in annots_by_page {
        append_annotations(doc, page_ids[page], annots)?;
    }

    let toc_destination = toc_page.and_then(|page| {
        page_sizes.get(page).map(|size| Destination {
            page_index: page,
            left: 0.0,
            top: size.height,
        })
    });
    if let Some(tree) = outline::build(entries, toc_destination, page_ids.len()) {
        outline::write_outline(doc, &tree, &page_ids)?;
        summary.outline_entries = tree.entry_count();
    }

    info!(
        "[INDEX] {} links applied, {} skipped, {} outline entries.",
        summary.applied, summary.skipped, summary.outline_entries
    );
    Ok(summary)
}

/// Width and height of a page's `/MediaBox`, following `/Parent` for
/// inherited boxes. Zero when none is found.
pub fn media_box_size(doc: &Document, page_id: ObjectId) -> Size {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Ok(media_box) = dict.get(b"MediaBox") {
            let values: Vec<f64> = resolve(doc, media_box)
                .and_then(|o| o.as_array().ok())
                .map(|arr| arr.iter().filter_map(|o| number(doc, o)).collect())
                .unwrap_or_default();
            if let [llx, lly, urx, ury] = values[..] {
                return Size::new((urx - llx).abs(), (ury - lly).abs());
            }
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Size::zero()
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(doc: &Document, obj: &Object) -> Option<f64> {
    match resolve(doc, obj)? {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Appends to the page's `/Annots`, which may be inline, a reference or absent.
fn append_annotations(
    doc: &mut Document,
    page_id: ObjectId,
    annots: Vec<ObjectId>,
) -> Result<(), IndexError> {
    let refs = annots.into_iter().map(Object::Reference);
    let existing = doc.get_dictionary(page_id)?.get(b"Annots").ok().cloned();

    match existing {
        Some(Object::Reference(array_id)) => {
            doc.get_object_mut(array_id)?.as_array_mut()?.extend(refs);
        }
        Some(Object::Array(mut array)) => {
            array.extend(refs);
            doc.get_dictionary_mut(page_id)?.set("Annots", array);
        }
        _ => {
            doc.get_dictionary_mut(page_id)?
                .set("Annots", refs.collect::<Vec<_>>());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Stream};
    use pagelink_types::{AnchorRegistry, GeometrySample};

    /// Creates an empty document with one page per media box.
    fn create_dummy_pdf(media_boxes: &[(f64, f64)]) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = vec![];
        for &(w, h) in media_boxes {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(w as f32), Object::Real(h as f32)],
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => media_boxes.len() as i64,
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

    fn sample(title: &str, x: f64, y: f64, page: u32) -> GeometrySample {
        GeometrySample {
            title: title.into(),
            x,
            y,
            width: 50.0,
            height: 10.0,
            page_width: 600.0,
            page_height: 800.0,
            page_index: page,
        }
    }

    fn annots_of(doc: &Document, page: u32) -> Vec<Dictionary> {
        let page_id = doc.get_pages()[&page];
        doc.get_dictionary(page_id)
            .and_then(|d| d.get(b"Annots"))
            .and_then(Object::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|o| o.as_reference().ok())
                    .filter_map(|id| doc.get_dictionary(id).ok().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn links_one_anchor_and_builds_outline() {
        let mut doc = create_dummy_pdf(&[(420.0, 595.0), (420.0, 595.0)]);
        let mut registry = AnchorRegistry::new();
        registry.register("t1", sample("", 100.0, 200.0, 1));
        registry.resolve_target("t1", sample("1. Intro", 0.0, 100.0, 2));

        let summary = emit(registry.records(), &mut doc, None, &IndexOptions::default()).unwrap();
        assert_eq!(summary, EmitSummary { applied: 1, skipped: 0, outline_entries: 1 });

        let annots = annots_of(&doc, 1);
        assert_eq!(annots.len(), 1);
        assert!(annots_of(&doc, 2).is_empty());

        let dest = annots[0].get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), doc.get_pages()[&2]);
        assert_eq!(dest[1].as_name().unwrap(), b"XYZ");
        // 700 px below the top edge, at 0.7 pt/px
        assert!((dest[3].as_float().unwrap() - 490.0).abs() < 1e-3);

        let border = annots[0].get(b"Border").unwrap().as_array().unwrap();
        assert_eq!(border[2].as_i64().unwrap(), 0);
    }

    #[test]
    fn unresolved_and_out_of_range_records_are_skipped() {
        let mut doc = create_dummy_pdf(&[(420.0, 595.0)]);
        let mut registry = AnchorRegistry::new();
        registry.register("missing", sample("", 0.0, 0.0, 1));
        registry.register("far", sample("", 0.0, 0.0, 1));
        registry.resolve_target("far", sample("2. Far", 0.0, 0.0, 5));

        let summary = emit(registry.records(), &mut doc, None, &IndexOptions::default()).unwrap();
        assert_eq!(summary, EmitSummary { applied: 0, skipped: 2, outline_entries: 0 });
        assert!(annots_of(&doc, 1).is_empty());
        assert!(doc.catalog().unwrap().get(b"Outlines").is_err());
    }

    #[test]
    fn zero_sized_pages_are_skipped() {
        let mut doc = create_dummy_pdf(&[(420.0, 595.0)]);
        let mut source = sample("", 0.0, 0.0, 1);
        source.page_width = 0.0;
        let mut registry = AnchorRegistry::new();
        registry.register("a", source);
        registry.resolve_target("a", sample("1 A", 0.0, 0.0, 1));

        let summary = emit(registry.records(), &mut doc, None, &IndexOptions::default()).unwrap();
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn debug_borders_and_existing_annotations() {
        let mut doc = create_dummy_pdf(&[(420.0, 595.0)]);
        let page_id = doc.get_pages()[&1];
        let existing = doc.add_object(dictionary! { "Type" => "Annot", "Subtype" => "Text" });
        doc.get_dictionary_mut(page_id)
            .unwrap()
            .set("Annots", vec![Object::Reference(existing)]);

        let mut registry = AnchorRegistry::new();
        registry.register("a", sample("", 10.0, 10.0, 1));
        registry.resolve_target("a", sample("Untitled", 0.0, 400.0, 1));
        let options = IndexOptions { debug_borders: true, ..Default::default() };

        let summary = emit(registry.records(), &mut doc, None, &options).unwrap();
        assert_eq!(summary.outline_entries, 0);

        let annots = annots_of(&doc, 1);
        assert_eq!(annots.len(), 2);
        let border = annots[1].get(b"Border").unwrap().as_array().unwrap();
        assert_eq!(border[2].as_i64().unwrap(), 1);
    }

    #[test]
    fn toc_page_becomes_root_destination() {
        let mut doc = create_dummy_pdf(&[(420.0, 595.0), (420.0, 595.0)]);
        let mut registry = AnchorRegistry::new();
        registry.register("a", sample("", 10.0, 10.0, 1));
        registry.resolve_target("a", sample("1 A", 0.0, 400.0, 2));

        emit(registry.records(), &mut doc, Some(0), &IndexOptions::default()).unwrap();

        let outlines_id = doc.catalog().unwrap().get(b"Outlines").unwrap().as_reference().unwrap();
        let outlines = doc.get_dictionary(outlines_id).unwrap();
        let root_id = outlines.get(b"First").unwrap().as_reference().unwrap();
        let root = doc.get_dictionary(root_id).unwrap();
        assert_eq!(root.get(b"Title").unwrap().as_str().unwrap(), b"Contents");
        let dest = root.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), doc.get_pages()[&1]);
        assert!((dest[3].as_float().unwrap() - 595.0).abs() < 1e-3);
    }

    #[test]
    fn inherited_media_box_is_found() {
        let mut doc = create_dummy_pdf(&[(100.0, 100.0)]);
        let page_id = doc.get_pages()[&1];
        doc.get_dictionary_mut(page_id).unwrap().remove(b"MediaBox");
        let pages_id = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Parent")
            .unwrap()
            .as_reference()
            .unwrap();
        doc.get_dictionary_mut(pages_id)
            .unwrap()
            .set("MediaBox", vec![0.into(), 0.into(), 300.into(), 400.into()]);

        assert_eq!(media_box_size(&doc, page_id), Size::new(300.0, 400.0));
    }
}
