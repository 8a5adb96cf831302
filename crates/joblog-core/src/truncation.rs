//! Head/tail truncation of long render lists.
//!
//! Lists longer than the hard limit render only their first `head` and last
//! `tail` rows plus an omission marker. "Show all" is sticky for the session
//! and is switched on automatically when focus lands in the omitted middle.

use std::ops::Range;

pub const DEFAULT_MAX_ITEMS: usize = 1000;
pub const DEFAULT_HEAD_ITEMS: usize = 250;
pub const DEFAULT_TAIL_ITEMS: usize = 250;

/// Size budget for one render list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncationConfig {
    /// Lists up to this long always render in full.
    pub max_items: usize,
    pub head: usize,
    pub tail: usize,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            head: DEFAULT_HEAD_ITEMS,
            tail: DEFAULT_TAIL_ITEMS,
        }
    }
}

/// The slice of a list of `total` rows that should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPlan {
    pub total: usize,
    pub head: Range<usize>,
    pub tail: Range<usize>,
    pub omitted: usize,
}

impl WindowPlan {
    fn full(total: usize) -> Self {
        Self {
            total,
            head: 0..total,
            tail: total..total,
            omitted: 0,
        }
    }

    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.omitted > 0
    }

    /// Indices hidden behind the omission marker.
    #[must_use]
    pub fn omitted_range(&self) -> Range<usize> {
        self.head.end..self.tail.start
    }

    #[must_use]
    pub fn is_visible(&self, index: usize) -> bool {
        self.head.contains(&index) || self.tail.contains(&index)
    }

    /// Visible indices in render order.
    pub fn visible_indices(&self) -> impl Iterator<Item = usize> {
        self.head.clone().chain(self.tail.clone())
    }

    /// Row on screen for `index`, counting the omission marker as one row.
    #[must_use]
    pub fn row_of(&self, index: usize) -> Option<usize> {
        if self.head.contains(&index) {
            Some(index)
        } else if self.tail.contains(&index) {
            Some(self.head.len() + 1 + (index - self.tail.start))
        } else {
            None
        }
    }
}

/// Truncation state for one render session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TruncationWindow {
    config: TruncationConfig,
    show_all: bool,
}

impl TruncationWindow {
    #[must_use]
    pub fn new(config: TruncationConfig) -> Self {
        Self {
            config,
            show_all: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> TruncationConfig {
        self.config
    }

    #[must_use]
    pub fn is_showing_all(&self) -> bool {
        self.show_all
    }

    /// Manual "show all". Never reverts within the session.
    pub fn show_all(&mut self) {
        self.show_all = true;
    }

    #[must_use]
    pub fn plan(&self, total: usize) -> WindowPlan {
        let TruncationConfig {
            max_items,
            head,
            tail,
        } = self.config;
        let kept = match head.checked_add(tail) {
            Some(kept) if kept < total => kept,
            _ => return WindowPlan::full(total),
        };
        if self.show_all || total <= max_items {
            return WindowPlan::full(total);
        }
        WindowPlan {
            total,
            head: 0..head,
            tail: total - tail..total,
            omitted: total - kept,
        }
    }

    /// Ask for `index` to be on screen in a list of `total` rows. Switches to
    /// show-all when the index is hidden in the omitted middle; returns
    /// whether that happened.
    pub fn request_focus(&mut self, index: usize, total: usize) -> bool {
        let plan = self.plan(total);
        if plan.is_truncated() && plan.omitted_range().contains(&index) {
            self.show_all = true;
            return true;
        }
        false
    }
}
