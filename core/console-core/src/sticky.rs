//! Deep-link stickiness between sibling entity views.
//!
//! When the user switches between two entity-detail views of the same kind
//! (say, one resource to another, or a resource to an autogroup in the same
//! tree) the tab/subtab they were looking at should follow them. Carrying is
//! structural: only the segments after the entity segment, up to but not
//! including the first further id-bearing segment, move across. Detail
//! segments below that depth are entity-specific and would render
//! non-applicable views.
//!
//! Views exchange suffixes only within an explicitly declared sibling class;
//! navigation across classes, or to an unclassified view, carries nothing.

use std::collections::HashMap;

use crate::path::{ViewId, ViewPath};

/// Declared sibling-compatibility classes: view name → class name.
#[derive(Debug, Clone, Default)]
pub struct SiblingClasses {
    classes: HashMap<String, String>,
}

impl SiblingClasses {
    pub fn new(classes: HashMap<String, String>) -> Self {
        Self { classes }
    }

    pub fn class_of(&self, view_name: &str) -> Option<&str> {
        self.classes.get(view_name).map(String::as_str)
    }

    /// True when both names belong to the same declared class.
    pub fn same_class(&self, a: &str, b: &str) -> bool {
        match (self.class_of(a), self.class_of(b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }
}

/// Structural suffix of `current` worth carrying onto `target`.
///
/// Applies only when `target` is a bare entity segment (`name/id`) whose
/// name shares a sibling class with the current top-level view, and the
/// target is not already a prefix of where we are. Returns the carried
/// segments, possibly empty.
pub fn carry_suffix(
    classes: &SiblingClasses,
    current: &ViewPath,
    target: &ViewPath,
) -> Vec<ViewId> {
    if target.len() != 1 {
        return Vec::new();
    }
    let target_top = match target.segments().first() {
        Some(segment) if segment.key().is_some() => segment,
        _ => return Vec::new(),
    };
    let current_top = match current.segments().first() {
        Some(segment) => segment,
        None => return Vec::new(),
    };
    if current_top == target_top {
        // Already on this entity; nothing to restore.
        return Vec::new();
    }
    if !classes.same_class(current_top.name(), target_top.name()) {
        return Vec::new();
    }

    current
        .segments()
        .iter()
        .skip(1)
        .take_while(|segment| segment.key().is_none())
        .cloned()
        .collect()
}
