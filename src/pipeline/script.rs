// src/pipeline/script.rs
//! The script evaluated in the loaded document to measure anchors and targets.

use pagelink_types::IndexMode;

const ANCHORS_MARKER: &str = "/*ANCHORS*/";

/// Shared body. Each mode fills in how link elements are collected.
///
/// Geometry is relative to the closest `.page` ancestor; elements outside any
/// page are ignored. Pages are numbered from 1, the TOC page from 0.
const TEMPLATE: &str = r#"(() => {
  const pages = Array.from(document.querySelectorAll('.page'));
  const measure = (el) => {
    const page = el.closest('.page');
    if (!page) return null;
    const box = el.getBoundingClientRect();
    const pageBox = page.getBoundingClientRect();
    return {
      x: box.left - pageBox.left,
      y: box.top - pageBox.top,
      width: box.width,
      height: box.height,
      page: pages.indexOf(page) + 1,
      page_width: pageBox.width,
      page_height: pageBox.height,
    };
  };
  const targetOf = (link) => {
    const href = link.getAttribute('href') || '';
    if (!href.startsWith('#') || href.length < 2) return null;
    try { return decodeURIComponent(href.slice(1)); } catch (e) { return href.slice(1); }
  };

  const tocIndex = pages.findIndex((p) => p.hasAttribute('toc'));
  const indexPositions = [];
  const addAnchor = (link, measured) => {
    const id = targetOf(link);
    const geometry = measure(measured);
    if (id && geometry) indexPositions.push(Object.assign({ id }, geometry));
  };
  /*ANCHORS*/

  const targetData = {};
  for (const el of document.querySelectorAll('[id]')) {
    const geometry = measure(el);
    if (!geometry) continue;
    targetData[el.id] = Object.assign({ title: el.innerText || '' }, geometry);
  }

  return JSON.stringify({
    toc: tocIndex >= 0 ? { page: tocIndex } : null,
    indexPositions,
    targetData,
  });
})()"#;

const BASIC_ANCHORS: &str = r##"for (const link of document.querySelectorAll('a[href^="#"]')) {
    addAnchor(link, link);
  }"##;

const FULL_ANCHORS: &str = r#"for (const item of document.querySelectorAll('.index-item')) {
    const link = item.querySelector('a[href]');
    if (link) addAnchor(link, item);
  }"#;

/// Returns the extraction script for `mode`, or `None` when indexing is off.
pub fn extraction_script(mode: IndexMode) -> Option<String> {
    let anchors = match mode {
        IndexMode::Off => return None,
        IndexMode::Basic => BASIC_ANCHORS,
        IndexMode::Full => FULL_ANCHORS,
    };
    Some(TEMPLATE.replace(ANCHORS_MARKER, anchors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_has_no_script() {
        assert!(extraction_script(IndexMode::Off).is_none());
    }

    #[test]
    fn modes_collect_different_elements() {
        let basic = extraction_script(IndexMode::Basic).unwrap();
        let full = extraction_script(IndexMode::Full).unwrap();

        assert!(basic.contains(r##"a[href^="#"]"##));
        assert!(!basic.contains(".index-item"));
        assert!(full.contains(".index-item"));
        for script in [&basic, &full] {
            assert!(!script.contains(ANCHORS_MARKER));
            assert!(script.contains("JSON.stringify"));
            assert!(script.contains("indexPositions"));
            assert!(script.contains("targetData"));
        }
    }
}
