//! Conversion from CSS pixels, measured top-down within a page element, to
//! PDF points measured bottom-up within the printed page.

use pagelink_types::{GeometrySample, Size};

/// Default share of the CSS page height by which link rectangles are nudged
/// up to line up with the rendered text baseline.
pub const DEFAULT_BASELINE_CORRECTION: f64 = 0.004;

/// A rectangle in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl PdfRect {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// `[left bottom right top]`, the layout of a PDF `/Rect`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.left, self.bottom, self.right, self.top]
    }
}

/// Points per CSS pixel for one page. Derived from widths only.
pub fn scale_factor(css_page: Size, pdf_page: Size) -> f64 {
    pdf_page.width / css_page.width
}

/// Maps the box of a measured element onto `pdf_page`.
///
/// The CSS y is first reduced by `css_page_height * baseline_correction`.
/// Callers check [`Size::is_positive`] on both page sizes beforehand.
pub fn map_rect(sample: &GeometrySample, pdf_page: Size, baseline_correction: f64) -> PdfRect {
    let css_page = sample.page_size();
    let scale = scale_factor(css_page, pdf_page);
    let y = sample.y - css_page.height * baseline_correction;

    let left = sample.x * scale;
    let top = (css_page.height - y) * scale;
    PdfRect {
        left,
        bottom: top - sample.height * scale,
        right: left + sample.width * scale,
        top,
    }
}

/// Maps the top-left corner of a measured element to a `(left, top)`
/// destination point on `pdf_page`.
pub fn map_point(sample: &GeometrySample, pdf_page: Size) -> (f64, f64) {
    let css_page = sample.page_size();
    let scale = scale_factor(css_page, pdf_page);
    (sample.x * scale, (css_page.height - sample.y) * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64, y: f64, w: f64, h: f64, page_w: f64, page_h: f64) -> GeometrySample {
        GeometrySample {
            x,
            y,
            width: w,
            height: h,
            page_width: page_w,
            page_height: page_h,
            page_index: 1,
            ..Default::default()
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn maps_a4_sized_page() {
        let pdf = Size::new(420.0, 595.0);
        let rect = map_rect(&sample(100.0, 200.0, 50.0, 10.0, 600.0, 800.0), pdf, 0.0);
        assert!(close(rect.left, 70.0));
        assert!(close(rect.right, 105.0));
        assert!(close(rect.top, 420.0));
        assert!(close(rect.bottom, 413.0));
    }

    #[test]
    fn doubling_css_width_halves_everything() {
        let pdf = Size::new(420.0, 595.0);
        let narrow = map_rect(&sample(100.0, 200.0, 50.0, 10.0, 600.0, 800.0), pdf, 0.0);
        let wide = map_rect(&sample(100.0, 200.0, 50.0, 10.0, 1200.0, 800.0), pdf, 0.0);

        assert!(close(wide.left * 2.0, narrow.left));
        assert!(close(wide.top * 2.0, narrow.top));
        assert!(close(wide.width() * 2.0, narrow.width()));
        assert!(close(wide.height() * 2.0, narrow.height()));
    }

    #[test]
    fn top_of_page_maps_to_pdf_page_height() {
        let pdf = Size::new(595.0, 842.0);
        let css = sample(0.0, 0.0, 10.0, 10.0, 595.0, 842.0);
        let (left, top) = map_point(&css, pdf);
        assert!(close(left, 0.0));
        assert!(close(top, 842.0));
        assert!(close(map_rect(&css, pdf, 0.0).top, 842.0));
    }

    #[test]
    fn baseline_correction_lifts_link_rect() {
        let pdf = Size::new(420.0, 595.0);
        let css = sample(100.0, 200.0, 50.0, 10.0, 600.0, 800.0);
        let plain = map_rect(&css, pdf, 0.0);
        let corrected = map_rect(&css, pdf, DEFAULT_BASELINE_CORRECTION);

        // 800 px * 0.004 = 3.2 px, times 0.7 pt/px
        assert!(close(corrected.top - plain.top, 2.24));
        assert!(close(corrected.height(), plain.height()));
    }
}
