//! Case-insensitive search term highlighting over styled segments.
//!
//! The term is matched literally (regex metacharacters are escaped). Matches
//! are found inside every segment, styled or not, and split segments keep
//! their original style. A match never spans two segments.

use std::ops::Range;

use regex::{Regex, RegexBuilder};

use crate::ansi::{Segment, SegmentStyle};

/// A compiled, case-insensitive literal search term.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    term: String,
    regex: Regex,
}

impl SearchPattern {
    /// Compile `term`. Blank terms (and terms the regex engine refuses, such
    /// as ones over its size limit) yield `None`, meaning "no search".
    #[must_use]
    pub fn new(term: &str) -> Option<Self> {
        if term.trim().is_empty() {
            return None;
        }
        let regex = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(Self {
            term: term.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Byte ranges of every non-overlapping match in `text`.
    #[must_use]
    pub fn find_ranges(&self, text: &str) -> Vec<Range<usize>> {
        self.regex.find_iter(text).map(|m| m.range()).collect()
    }

    #[must_use]
    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

/// A styled fragment, possibly marked as a search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedSegment {
    pub text: String,
    pub style: SegmentStyle,
    pub highlighted: bool,
}

/// Highlight `term` inside `segments`. With no (or a blank) term the
/// segments come back unchanged and unhighlighted.
#[must_use]
pub fn highlight(segments: &[Segment], term: Option<&str>) -> Vec<HighlightedSegment> {
    let pattern = term.and_then(SearchPattern::new);
    highlight_with(segments, pattern.as_ref())
}

/// Same as [`highlight`] with a pre-compiled pattern.
#[must_use]
pub fn highlight_with(
    segments: &[Segment],
    pattern: Option<&SearchPattern>,
) -> Vec<HighlightedSegment> {
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let Some(pattern) = pattern else {
            out.push(unmarked(&segment.text, segment.style));
            continue;
        };
        let mut cursor = 0;
        for range in pattern.find_ranges(&segment.text) {
            if range.start > cursor {
                out.push(unmarked(&segment.text[cursor..range.start], segment.style));
            }
            out.push(HighlightedSegment {
                text: segment.text[range.clone()].to_string(),
                style: segment.style,
                highlighted: true,
            });
            cursor = range.end;
        }
        if cursor < segment.text.len() {
            out.push(unmarked(&segment.text[cursor..], segment.style));
        }
    }
    out
}

/// Number of matches of `term` in `text`.
#[must_use]
pub fn count_matches(text: &str, term: Option<&str>) -> usize {
    term.and_then(SearchPattern::new)
        .map_or(0, |pattern| pattern.count(text))
}

fn unmarked(text: &str, style: SegmentStyle) -> HighlightedSegment {
    HighlightedSegment {
        text: text.to_string(),
        style,
        highlighted: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ansi::{render_segments, AnsiColor};

    fn marked(segments: &[HighlightedSegment]) -> Vec<(&str, bool)> {
        segments
            .iter()
            .map(|s| (s.text.as_str(), s.highlighted))
            .collect()
    }

    #[test]
    fn no_term_passes_segments_through() {
        let segments = render_segments("a \x1b[31mb");
        let out = highlight(&segments, None);
        assert_eq!(marked(&out), vec![("a ", false), ("b", false)]);
        assert_eq!(out[1].style.color, Some(AnsiColor::Red));
        assert_eq!(marked(&highlight(&segments, Some("  "))), marked(&out));
    }

    #[test]
    fn matches_are_case_insensitive() {
        let out = highlight(&render_segments("Error then error"), Some("ERROR"));
        assert_eq!(
            marked(&out),
            vec![("Error", true), (" then ", false), ("error", true)]
        );
    }

    #[test]
    fn metacharacters_are_literal() {
        let out = highlight(&render_segments("a.b axb (c)"), Some("a.b"));
        assert_eq!(marked(&out), vec![("a.b", true), (" axb (c)", false)]);
        let out = highlight(&render_segments("f(x)"), Some("(x)"));
        assert_eq!(marked(&out), vec![("f", false), ("(x)", true)]);
    }

    #[test]
    fn styled_segments_keep_their_style() {
        let out = highlight(&render_segments("\x1b[1;32mall tests passed"), Some("tests"));
        assert_eq!(
            marked(&out),
            vec![("all ", false), ("tests", true), (" passed", false)]
        );
        assert!(out.iter().all(|s| s.style.bold));
        assert!(out.iter().all(|s| s.style.color == Some(AnsiColor::Green)));
    }

    #[test]
    fn count_matches_counts_all_hits() {
        assert_eq!(count_matches("foo FOO fOo bar", Some("foo")), 3);
        assert_eq!(count_matches("foo", None), 0);
        assert_eq!(count_matches("foo", Some("")), 0);
    }

    #[test]
    fn pattern_keeps_original_term() {
        let pattern = SearchPattern::new("Needle");
        assert_eq!(pattern.as_ref().map(SearchPattern::term), Some("Needle"));
    }
}
