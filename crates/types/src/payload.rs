//! The JSON document returned by the in-page extraction script.

use crate::anchor::AnchorRegistry;
use crate::geometry::GeometrySample;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Marks the page that holds the table of contents. `page` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocMarker {
    pub page: usize,
}

/// A link element, keyed by the id its `href` points to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page: u32,
    pub page_width: f64,
    pub page_height: f64,
}

/// An addressable element. `title` is its rendered text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetPosition {
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page: u32,
    pub page_width: f64,
    pub page_height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionPayload {
    pub toc: Option<TocMarker>,
    pub index_positions: Vec<SourcePosition>,
    pub target_data: HashMap<String, TargetPosition>,
}

impl From<&SourcePosition> for GeometrySample {
    fn from(pos: &SourcePosition) -> Self {
        GeometrySample {
            title: String::new(),
            x: pos.x,
            y: pos.y,
            width: pos.width,
            height: pos.height,
            page_width: pos.page_width,
            page_height: pos.page_height,
            page_index: pos.page,
        }
    }
}

impl From<&TargetPosition> for GeometrySample {
    fn from(pos: &TargetPosition) -> Self {
        GeometrySample {
            title: pos.title.trim().to_string(),
            x: pos.x,
            y: pos.y,
            width: pos.width,
            height: pos.height,
            page_width: pos.page_width,
            page_height: pos.page_height,
            page_index: pos.page,
        }
    }
}

impl ExtractionPayload {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn toc_page(&self) -> Option<usize> {
        self.toc.map(|t| t.page)
    }

    /// Registers every anchor, then attaches the targets whose id matches.
    pub fn to_registry(&self) -> AnchorRegistry {
        let mut registry = AnchorRegistry::new();
        for source in &self.index_positions {
            registry.register(source.id.clone(), GeometrySample::from(source));
        }
        for (id, target) in &self.target_data {
            registry.resolve_target(id, GeometrySample::from(target));
        }
        registry
    }
}
