//! Property snapshot and change detection (spec §4.3).
//!
//! A shallow copy of an entity's tracked properties, taken before a handler
//! runs, diffed against the view taken after. The tracked set is implicit:
//! whatever keys the entity chose to expose from [`crate::ScarabEntity::view`]
//! at the moment a snapshot is captured. Property values are
//! `serde_json::Value`, so "structural equality" (spec) is exactly
//! `PartialEq` on `Value` — nested mutation that doesn't change the
//! top-level value compares equal and produces no reported change, matching
//! the spec's "identity copy of opaque objects" rule.

use serde_json::Map;

use crate::view::EntityView;

/// A point-in-time copy of one entity's public properties.
#[derive(Debug, Clone)]
pub struct PropertySnapshot {
    properties: Map<String, serde_json::Value>,
}

impl PropertySnapshot {
    /// Capture the tracked properties of `view`.
    #[must_use]
    pub fn capture(view: &EntityView) -> Self {
        Self {
            properties: view.properties.clone(),
        }
    }

    /// Diff this snapshot against a newer view, returning the sorted names
    /// of properties whose values differ (added, removed, or changed).
    #[must_use]
    pub fn diff(&self, new_view: &EntityView) -> Vec<String> {
        let mut changed = Vec::new();

        for (name, new_value) in &new_view.properties {
            match self.properties.get(name) {
                Some(old_value) if old_value == new_value => {}
                _ => changed.push(name.clone()),
            }
        }
        for name in self.properties.keys() {
            if !new_view.properties.contains_key(name) {
                changed.push(name.clone());
            }
        }

        changed.sort();
        changed
    }
}
