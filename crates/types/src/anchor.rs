//! In-document links and the targets they point at.

use crate::geometry::GeometrySample;
use log::debug;
use std::collections::HashMap;

/// A link discovered in the rendered document, keyed by the id it points to.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorRecord {
    pub name: String,
    pub source: GeometrySample,
    /// Filled in once an element with a matching id has been measured.
    pub target: Option<GeometrySample>,
}

impl AnchorRecord {
    pub fn new(name: impl Into<String>, source: GeometrySample) -> Self {
        Self {
            name: name.into(),
            source,
            target: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

/// Collects the anchors of one render job and pairs them with their targets.
///
/// Names are unique. Registering a name twice replaces the earlier record but
/// keeps its position, so iteration follows the order in which names were
/// first seen.
#[derive(Debug, Clone, Default)]
pub struct AnchorRegistry {
    records: Vec<AnchorRecord>,
    by_name: HashMap<String, usize>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, source: GeometrySample) {
        let record = AnchorRecord::new(name, source);
        match self.by_name.get(&record.name) {
            Some(&slot) => {
                debug!("Anchor '{}' registered twice; keeping the latest.", record.name);
                self.records[slot] = record;
            }
            None => {
                self.by_name.insert(record.name.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Attaches a target to the anchor named `name`.
    ///
    /// Returns `false` when no anchor has that name. That is normal: any
    /// element with an id is a candidate target, linked to or not.
    pub fn resolve_target(&mut self, name: &str, target: GeometrySample) -> bool {
        match self.by_name.get(name) {
            Some(&slot) => {
                self.records[slot].target = Some(target);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&AnchorRecord> {
        self.by_name.get(name).map(|&slot| &self.records[slot])
    }

    pub fn records(&self) -> &[AnchorRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AnchorRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(page: u32, y: f64) -> GeometrySample {
        GeometrySample {
            y,
            page_index: page,
            page_width: 600.0,
            page_height: 800.0,
            ..Default::default()
        }
    }

    #[test]
    fn resolves_targets_by_exact_name() {
        let mut registry = AnchorRegistry::new();
        registry.register("a1", sample(1, 10.0));
        registry.register("a2", sample(1, 20.0));

        assert!(registry.resolve_target("a2", sample(3, 5.0)));
        assert!(!registry.resolve_target("A2", sample(3, 5.0)));

        assert!(!registry.get("a1").unwrap().is_resolved());
        assert_eq!(registry.get("a2").unwrap().target.as_ref().unwrap().page_index, 3);
    }

    #[test]
    fn unknown_target_is_dropped_silently() {
        let mut registry = AnchorRegistry::new();
        registry.register("a1", sample(1, 10.0));
        assert!(!registry.resolve_target("elsewhere", sample(2, 0.0)));
        assert_eq!(registry.len(), 1);
        assert!(registry.records().iter().all(|r| r.target.is_none()));
    }

    #[test]
    fn duplicate_names_keep_last_write_in_first_slot() {
        let mut registry = AnchorRegistry::new();
        registry.register("a1", sample(1, 10.0));
        registry.register("b", sample(1, 15.0));
        registry.register("a1", sample(2, 99.0));

        let names: Vec<_> = registry.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a1", "b"]);
        assert_eq!(registry.get("a1").unwrap().source.y, 99.0);
    }
}
