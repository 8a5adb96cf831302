//! View model tying the pipeline stages to per-session UI state.
//!
//! `LogView` owns what the user changes (expansion, search term, show-all,
//! focus). `LogSnapshot` is the read-only result of running the pipeline over
//! the current cumulative text; it is rebuilt whenever new text arrives.

use crate::ansi::{render_segments, strip_codes};
use crate::annotations::{parse_annotations, Annotation};
use crate::grouper::{group_lines, LogGroup};
use crate::line_classifier::{classify_text, LogLine};
use crate::render_list::{flat_index_of_line, flatten, ExpansionState, RenderItem};
use crate::search_highlight::{highlight_with, HighlightedSegment, SearchPattern};
use crate::truncation::{TruncationConfig, TruncationWindow, WindowPlan};

/// Per-session UI state over one job log.
#[derive(Debug, Clone, Default)]
pub struct LogView {
    expansion: ExpansionState,
    window: TruncationWindow,
    search: Option<SearchPattern>,
    /// Source line index of the focus target.
    focus_line: Option<usize>,
}

impl LogView {
    #[must_use]
    pub fn new(config: TruncationConfig) -> Self {
        Self {
            window: TruncationWindow::new(config),
            ..Self::default()
        }
    }

    /// Set the search term. A blank term clears the search.
    pub fn set_search(&mut self, term: &str) {
        self.search = SearchPattern::new(term);
    }

    pub fn clear_search(&mut self) {
        self.search = None;
    }

    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_ref().map(SearchPattern::term)
    }

    /// Toggle the named group at `position`. Returns its new state.
    pub fn toggle_group(&mut self, position: usize) -> bool {
        self.expansion.toggle(position)
    }

    pub fn expand_all(&mut self) {
        self.expansion.expand_all();
    }

    pub fn collapse_all(&mut self) {
        self.expansion.collapse_all();
    }

    pub fn show_all(&mut self) {
        self.window.show_all();
    }

    #[must_use]
    pub fn is_showing_all(&self) -> bool {
        self.window.is_showing_all()
    }

    /// Source line of the current focus target, if any. Snapshots resolve
    /// it to a row, so it stays put when groups above it change.
    #[must_use]
    pub fn focus_line(&self) -> Option<usize> {
        self.focus_line
    }

    /// Run the pipeline over `text`.
    #[must_use]
    pub fn snapshot(&self, text: &str) -> LogSnapshot {
        let lines = classify_text(text);
        let match_count = self.search.as_ref().map_or(0, |pattern| {
            lines
                .iter()
                .map(|line| pattern.count(&strip_codes(&line.content)))
                .sum()
        });
        let mut groups = group_lines(&lines);
        self.expansion.apply(&mut groups);
        let items = flatten(&groups);
        let plan = self.window.plan(items.len());
        let focus = self
            .focus_line
            .and_then(|line| flat_index_of_line(&items, line));
        LogSnapshot {
            groups,
            items,
            plan,
            annotations: parse_annotations(text),
            match_count,
            search: self.search.clone(),
            focus,
        }
    }

    /// Make source line `source_index` the focus target.
    ///
    /// Expands the group holding the line and switches the truncation
    /// window to show-all when the line would otherwise be omitted. Returns
    /// the flattened index of the focused row.
    pub fn jump_to_line(&mut self, text: &str, source_index: usize) -> Option<usize> {
        let groups = group_lines(&classify_text(text));
        if let Some(position) = groups
            .iter()
            .position(|group| !group.is_standalone() && group.contains_line(source_index))
        {
            if !self.expansion.is_expanded(position) {
                self.expansion.expand(position);
            }
        }

        let snapshot = self.snapshot(text);
        let index = flat_index_of_line(&snapshot.items, source_index)?;
        self.window.request_focus(index, snapshot.items.len());
        self.focus_line = Some(source_index);
        Some(index)
    }
}

/// Pipeline output for one version of the cumulative text.
#[derive(Debug, Clone)]
pub struct LogSnapshot {
    pub groups: Vec<LogGroup>,
    pub items: Vec<RenderItem>,
    pub plan: WindowPlan,
    pub annotations: Vec<Annotation>,
    /// Search hits across all classified lines, hidden ones included.
    pub match_count: usize,
    /// Flattened index of the focused row.
    pub focus: Option<usize>,
    search: Option<SearchPattern>,
}

impl LogSnapshot {
    /// Rows to draw, with their flattened indices.
    pub fn visible_items(&self) -> impl Iterator<Item = (usize, &RenderItem)> {
        self.plan
            .visible_indices()
            .filter_map(|index| self.items.get(index).map(|item| (index, item)))
    }

    /// Styled, search-highlighted fragments for one line.
    #[must_use]
    pub fn render_line(&self, line: &LogLine) -> Vec<HighlightedSegment> {
        highlight_with(&render_segments(&line.content), self.search.as_ref())
    }
}
