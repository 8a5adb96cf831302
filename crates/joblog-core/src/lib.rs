//! joblog-core: the pure half of the CI job log viewer.
//!
//! Everything in this crate is synchronous and total over its inputs. The
//! stream crate supplies the cumulative log text; this crate turns it into
//! something a terminal (or any other front end) can draw:
//!
//! ```text
//! cumulative text
//!   -> classify_text (line_classifier)   => Vec<LogLine>
//!   -> group_lines   (grouper)           => Vec<LogGroup>
//!   -> flatten       (render_list)       => Vec<RenderItem>
//!   -> TruncationWindow::plan            => head/tail slice
//!   -> render_segments + highlight       => styled fragments per line
//!
//! cumulative text
//!   -> parse_annotations (annotations)   => Vec<Annotation>
//! ```

pub mod ansi;
pub mod annotations;
pub mod grouper;
pub mod line_classifier;
pub mod log_view;
pub mod render_list;
pub mod search_highlight;
pub mod truncation;

pub use ansi::{render_segments, AnsiColor, Segment, SegmentStyle};
pub use annotations::{parse_annotations, Annotation, AnnotationLevel};
pub use grouper::{group_lines, LogGroup};
pub use line_classifier::{classify_line, classify_text, Classified, LineKind, LogLine};
pub use log_view::{LogSnapshot, LogView};
pub use render_list::{flat_index_of_line, flatten, ExpansionState, RenderItem};
pub use search_highlight::{count_matches, highlight, HighlightedSegment, SearchPattern};
pub use truncation::{TruncationConfig, TruncationWindow, WindowPlan};
