#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn zero() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
        }
    }

    /// Both edges are strictly positive (and not NaN).
    pub fn is_positive(self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A measurement of one element taken in the rendered document.
///
/// Coordinates are CSS pixels relative to the top-left corner of the page
/// element that contains the measured element. `page_index` is 1-based; zero
/// means the element was not inside any page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometrySample {
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub page_index: u32,
}

impl GeometrySample {
    pub fn page_size(&self) -> Size {
        Size::new(self.page_width, self.page_height)
    }

    /// Returns the 0-based page index if it falls within `page_count` pages.
    pub fn page_in(&self, page_count: usize) -> Option<usize> {
        let index = (self.page_index as usize).checked_sub(1)?;
        (index < page_count).then_some(index)
    }
}
