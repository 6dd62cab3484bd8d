use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};

/// Builds a PDF with one empty page per `(width, height)` entry, in points.
pub fn pdf_with_pages(sizes: &[(f64, f64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));

    let kids: Vec<Object> = sizes
        .iter()
        .map(|&(width, height)| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(width as f32), Object::Real(height as f32)],
                "Contents" => content_id,
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture PDF serializes");
    bytes
}

/// Two A5-ish pages of 420 x 595 points.
pub fn two_page_pdf() -> Vec<u8> {
    pdf_with_pages(&[(420.0, 595.0), (420.0, 595.0)])
}

/// A link box as the extraction script reports it. Pages are 1-based and
/// the CSS page is 794 x 1123 px.
pub fn link(id: &str, page: u32, x: f64, y: f64) -> Value {
    json!({
        "id": id, "x": x, "y": y, "width": 120, "height": 18,
        "page": page, "page_width": 794, "page_height": 1123
    })
}

/// A target element as the extraction script reports it.
pub fn target(title: &str, page: u32, y: f64) -> Value {
    json!({
        "title": title, "x": 40, "y": y, "width": 500, "height": 24,
        "page": page, "page_width": 794, "page_height": 1123
    })
}

/// Assembles an extraction payload. `targets` pairs ids with targets.
pub fn payload(toc_page: Option<usize>, links: Vec<Value>, targets: Vec<(&str, Value)>) -> Value {
    let target_data: serde_json::Map<String, Value> = targets
        .into_iter()
        .map(|(id, target)| (id.to_string(), target))
        .collect();
    let mut payload = json!({
        "indexPositions": links,
        "targetData": target_data,
    });
    if let Some(page) = toc_page {
        payload["toc"] = json!({ "page": page });
    }
    payload
}

/// A three-page document for the real browser: a contents page flagged with
/// `toc`, two numbered chapters and one link to an id that does not exist.
/// Every box is absolutely placed so measurements are predictable.
pub const LINKED_DOCUMENT: &str = r##"<!DOCTYPE html>
<html>
<head>
<style>
  body { margin: 0; }
  .page { position: relative; width: 600px; height: 900px; overflow: hidden; break-after: page; }
  .page:last-child { break-after: auto; }
  .index-item { position: absolute; left: 20px; width: 400px; height: 24px; }
  .index-item a, .loose { position: absolute; left: 0; top: 0; display: block; width: 200px; height: 20px; }
  h2 { position: absolute; left: 40px; margin: 0; height: 30px; font-size: 20px; }
</style>
</head>
<body>
  <div class="page" toc>
    <div class="index-item" style="top: 100px"><a href="#s1">1 Introduction</a></div>
    <div class="index-item" style="top: 140px"><a href="#s2">2 Usage</a></div>
    <a class="loose" href="#nowhere" style="top: 400px">Missing</a>
  </div>
  <div class="page">
    <h2 id="s1" style="top: 120px">1 Introduction</h2>
  </div>
  <div class="page">
    <h2 id="s2" style="top: 60px">2 Usage</h2>
  </div>
</body>
</html>
"##;
