use lopdf::{Document as LopdfDocument, Object, ObjectId};

/// Information about a link annotation
#[derive(Debug, Clone)]
pub struct LinkAnnotation {
    /// 1-based page the annotation sits on
    pub page: u32,
    pub rect: [f32; 4],
    /// 1-based page the destination points at
    pub dest_page: Option<u32>,
    pub dest_top: Option<f32>,
    pub border: Vec<i64>,
}

fn page_number(doc: &LopdfDocument, id: ObjectId) -> Option<u32> {
    doc.get_pages().into_iter().find(|(_, page_id)| *page_id == id).map(|(n, _)| n)
}

fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(obj: &Object) -> f32 {
    obj.as_float().unwrap_or(0.0)
}

/// Extract every /Link annotation in page order
pub fn extract_links(doc: &LopdfDocument) -> Vec<LinkAnnotation> {
    let mut links = Vec::new();
    for (page_num, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else { continue };
        let Some(annots) = page.get(b"Annots").ok().and_then(|a| resolve(doc, a)) else {
            continue;
        };
        let Ok(annots) = annots.as_array() else { continue };

        for annot in annots {
            let Some(Ok(annot)) = resolve(doc, annot).map(Object::as_dict) else { continue };
            if annot.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Link".as_slice()) {
                continue;
            }
            let rect = annot
                .get(b"Rect")
                .and_then(Object::as_array)
                .map(|r| [number(&r[0]), number(&r[1]), number(&r[2]), number(&r[3])])
                .unwrap_or_default();
            let dest = annot.get(b"Dest").and_then(Object::as_array).ok();
            let border = annot
                .get(b"Border")
                .and_then(Object::as_array)
                .map(|b| b.iter().filter_map(|v| v.as_i64().ok()).collect())
                .unwrap_or_default();
            links.push(LinkAnnotation {
                page: page_num,
                rect,
                dest_page: dest
                    .and_then(|d| d.first())
                    .and_then(|r| r.as_reference().ok())
                    .and_then(|id| page_number(doc, id)),
                dest_top: dest.and_then(|d| d.get(3)).map(number),
                border,
            });
        }
    }
    links
}

/// One outline item
#[derive(Debug, Clone)]
pub struct OutlineItem {
    pub title: String,
    pub depth: usize,
    /// 1-based destination page
    pub page: Option<u32>,
    pub count: i64,
}

fn decode_title(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).to_string()
    }
}

/// Walk the document outline depth first
pub fn extract_outline(doc: &LopdfDocument) -> Vec<OutlineItem> {
    let mut items = Vec::new();
    let Ok(catalog) = doc.catalog() else { return items };
    let Ok(outlines_id) = catalog.get(b"Outlines").and_then(Object::as_reference) else {
        return items;
    };
    let Ok(outlines) = doc.get_dictionary(outlines_id) else { return items };
    let first = outlines.get(b"First").and_then(Object::as_reference).ok();
    walk(doc, first, 0, &mut items);
    items
}

fn walk(doc: &LopdfDocument, mut next: Option<ObjectId>, depth: usize, items: &mut Vec<OutlineItem>) {
    while let Some(id) = next {
        let Ok(item) = doc.get_dictionary(id) else { return };
        let title = item
            .get(b"Title")
            .and_then(Object::as_str)
            .map(decode_title)
            .unwrap_or_default();
        let page = item
            .get(b"Dest")
            .and_then(Object::as_array)
            .ok()
            .and_then(|d| d.first())
            .and_then(|r| r.as_reference().ok())
            .and_then(|page_id| page_number(doc, page_id));
        let count = item.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        items.push(OutlineItem { title, depth, page, count });

        let first = item.get(b"First").and_then(Object::as_reference).ok();
        walk(doc, first, depth + 1, items);
        next = item.get(b"Next").and_then(Object::as_reference).ok();
    }
}

/// Titles of the outline, indented two spaces per level
pub fn outline_titles(doc: &LopdfDocument) -> Vec<String> {
    extract_outline(doc)
        .into_iter()
        .map(|item| format!("{}{}", "  ".repeat(item.depth), item.title))
        .collect()
}

/// Assert that PDF has a specific number of link annotations
#[macro_export]
macro_rules! assert_pdf_link_count {
    ($pdf:expr, $count:expr) => {
        let links = $crate::common::pdf_assertions::extract_links(&$pdf.doc);
        assert_eq!(
            links.len(),
            $count,
            "Expected {} links, got {:?}",
            $count,
            links
        );
    };
}
