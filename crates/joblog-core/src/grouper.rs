//! Folding of classified lines into collapsible groups.
//!
//! Groups are flat: a `group-start` seen while a group is already open
//! closes the open one first. Lines outside any group land in standalone
//! groups with an empty name, which always render expanded.

use crate::line_classifier::{LineKind, LogLine};

/// Name given to groups opened without a title, so they stay collapsible.
pub const UNNAMED_GROUP: &str = "(unnamed group)";

/// A named, collapsible run of lines, or a standalone run when `name` is
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroup {
    pub name: String,
    pub lines: Vec<LogLine>,
    /// Level of the opening marker; 0 for standalone runs.
    pub level: usize,
    pub expanded: bool,
    /// Source index of the opening marker, `None` for standalone runs.
    pub header_index: Option<usize>,
}

impl LogGroup {
    fn standalone() -> Self {
        Self {
            name: String::new(),
            lines: Vec::new(),
            level: 0,
            expanded: true,
            header_index: None,
        }
    }

    fn named(name: String, level: usize, header_index: usize) -> Self {
        Self {
            name,
            lines: Vec::new(),
            level,
            expanded: false,
            header_index: Some(header_index),
        }
    }

    #[must_use]
    pub fn is_standalone(&self) -> bool {
        self.name.is_empty()
    }

    /// Whether the raw source line `index` is this group's opening marker or
    /// one of its lines.
    #[must_use]
    pub fn contains_line(&self, index: usize) -> bool {
        self.header_index == Some(index) || self.lines.iter().any(|line| line.index == index)
    }
}

/// Fold a flat classified sequence into groups.
///
/// Named groups are kept even when empty so a freshly opened group shows up
/// before its first line arrives. Empty standalone runs are dropped.
#[must_use]
pub fn group_lines(lines: &[LogLine]) -> Vec<LogGroup> {
    let mut groups = Vec::new();
    let mut current = LogGroup::standalone();

    for line in lines {
        match line.kind {
            LineKind::GroupStart => {
                push_group(&mut groups, current);
                let name = match line.group_name.as_deref() {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => UNNAMED_GROUP.to_string(),
                };
                current = LogGroup::named(name, line.level, line.index);
            }
            LineKind::GroupEnd => {
                // Stray closers outside an open group are dropped.
                if !current.is_standalone() {
                    push_group(&mut groups, current);
                    current = LogGroup::standalone();
                }
            }
            _ => current.lines.push(line.clone()),
        }
    }
    push_group(&mut groups, current);
    groups
}

fn push_group(groups: &mut Vec<LogGroup>, group: LogGroup) {
    if group.is_standalone() && group.lines.is_empty() {
        return;
    }
    groups.push(group);
}
