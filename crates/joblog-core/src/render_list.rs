//! Flattening of groups into the row list the view draws.
//!
//! Expansion state lives outside the groups, keyed by group position, so it
//! survives the rebuild that happens every time new text arrives.

use std::collections::HashMap;

use crate::grouper::LogGroup;
use crate::line_classifier::LogLine;

// ---------------------------------------------------------------------------
// ExpansionState
// ---------------------------------------------------------------------------

/// Per-session expand/collapse state for named groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    default_expanded: bool,
    overrides: HashMap<usize, bool>,
}

impl ExpansionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the named group at `position` is expanded.
    #[must_use]
    pub fn is_expanded(&self, position: usize) -> bool {
        self.overrides
            .get(&position)
            .copied()
            .unwrap_or(self.default_expanded)
    }

    /// Flip the group at `position`. Returns the new state.
    pub fn toggle(&mut self, position: usize) -> bool {
        let next = !self.is_expanded(position);
        self.overrides.insert(position, next);
        next
    }

    pub fn expand(&mut self, position: usize) {
        self.overrides.insert(position, true);
    }

    pub fn expand_all(&mut self) {
        self.default_expanded = true;
        self.overrides.clear();
    }

    pub fn collapse_all(&mut self) {
        self.default_expanded = false;
        self.overrides.clear();
    }

    /// Copy this state onto freshly built groups. Standalone runs are always
    /// expanded.
    pub fn apply(&self, groups: &mut [LogGroup]) {
        for (position, group) in groups.iter_mut().enumerate() {
            group.expanded = group.is_standalone() || self.is_expanded(position);
        }
    }
}

// ---------------------------------------------------------------------------
// RenderItem
// ---------------------------------------------------------------------------

/// One row of the flattened render list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderItem {
    /// Header row of a named group.
    GroupHeader {
        group: usize,
        name: String,
        level: usize,
        line_count: usize,
        expanded: bool,
        source_index: Option<usize>,
    },
    /// A log line, visible because its group is expanded or standalone.
    Line { group: usize, line: LogLine },
}

impl RenderItem {
    /// Position of the owning group.
    #[must_use]
    pub fn group(&self) -> usize {
        match self {
            Self::GroupHeader { group, .. } | Self::Line { group, .. } => *group,
        }
    }

    /// Source line index this row was produced from, when known.
    #[must_use]
    pub fn source_index(&self) -> Option<usize> {
        match self {
            Self::GroupHeader { source_index, .. } => *source_index,
            Self::Line { line, .. } => Some(line.index),
        }
    }
}

/// Flatten groups into rows: a header per named group followed by its lines
/// when expanded; standalone lines directly.
#[must_use]
pub fn flatten(groups: &[LogGroup]) -> Vec<RenderItem> {
    let mut items = Vec::new();
    for (position, group) in groups.iter().enumerate() {
        if !group.is_standalone() {
            items.push(RenderItem::GroupHeader {
                group: position,
                name: group.name.clone(),
                level: group.level,
                line_count: group.lines.len(),
                expanded: group.expanded,
                source_index: group.header_index,
            });
        }
        if group.expanded {
            items.extend(group.lines.iter().map(|line| RenderItem::Line {
                group: position,
                line: line.clone(),
            }));
        }
    }
    items
}

/// Flattened position of source line `source_index`.
///
/// Exact matches win. Otherwise the first row produced from a later source
/// line is used (blank lines and closing markers have no row of their own).
#[must_use]
pub fn flat_index_of_line(items: &[RenderItem], source_index: usize) -> Option<usize> {
    let mut fallback = None;
    for (position, item) in items.iter().enumerate() {
        match item.source_index() {
            Some(index) if index == source_index => return Some(position),
            Some(index) if index > source_index && fallback.is_none() => {
                fallback = Some(position);
            }
            _ => {}
        }
    }
    fallback
}
