//! Terminal output for classified log lines.
//!
//! Two entry points: [`write_snapshot`] draws a whole [`LogSnapshot`]
//! through its truncation window, and [`TailPrinter`] prints only the lines
//! that became complete since the previous call while a stream is followed.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use joblog_core::search_highlight::highlight_with;
use joblog_core::{
    classify_line, render_segments, Annotation, AnnotationLevel, AnsiColor, HighlightedSegment,
    LineKind, LogLine, LogSnapshot, RenderItem, SearchPattern,
};

const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: bool,
    pub timestamps: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: true,
            timestamps: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

fn crossterm_color(color: AnsiColor) -> Color {
    match color {
        AnsiColor::Black => Color::Black,
        AnsiColor::Red => Color::DarkRed,
        AnsiColor::Green => Color::DarkGreen,
        AnsiColor::Yellow => Color::DarkYellow,
        AnsiColor::Blue => Color::DarkBlue,
        AnsiColor::Magenta => Color::DarkMagenta,
        AnsiColor::Cyan => Color::DarkCyan,
        AnsiColor::White => Color::Grey,
        AnsiColor::BrightBlack => Color::DarkGrey,
        AnsiColor::BrightRed => Color::Red,
        AnsiColor::BrightGreen => Color::Green,
        AnsiColor::BrightYellow => Color::Yellow,
        AnsiColor::BrightBlue => Color::Blue,
        AnsiColor::BrightMagenta => Color::Magenta,
        AnsiColor::BrightCyan => Color::Cyan,
        AnsiColor::BrightWhite => Color::White,
    }
}

/// Color used for unstyled text on a line of this kind.
fn kind_color(kind: LineKind) -> Option<Color> {
    match kind {
        LineKind::Error => Some(Color::Red),
        LineKind::Warning => Some(Color::Yellow),
        LineKind::Command => Some(Color::Cyan),
        LineKind::GroupStart | LineKind::GroupEnd | LineKind::Regular => None,
    }
}

fn write_fragment<W: Write>(
    out: &mut W,
    fragment: &HighlightedSegment,
    fallback: Option<Color>,
    opts: RenderOptions,
) -> io::Result<()> {
    if !opts.color {
        return queue!(out, Print(&fragment.text));
    }
    let fg = fragment.style.color.map(crossterm_color).or(fallback);
    let styled = fg.is_some() || fragment.style.bold || fragment.highlighted;
    if let Some(fg) = fg {
        queue!(out, SetForegroundColor(fg))?;
    }
    if fragment.style.bold {
        queue!(out, SetAttribute(Attribute::Bold))?;
    }
    if fragment.highlighted {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    queue!(out, Print(&fragment.text))?;
    if styled {
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
    }
    Ok(())
}

fn write_dim<W: Write>(out: &mut W, text: &str, opts: RenderOptions) -> io::Result<()> {
    if opts.color {
        queue!(
            out,
            SetAttribute(Attribute::Dim),
            Print(text),
            SetAttribute(Attribute::Reset)
        )
    } else {
        queue!(out, Print(text))
    }
}

/// One log line: indentation, optional timestamp, styled content.
pub fn write_line<W: Write>(
    out: &mut W,
    line: &LogLine,
    fragments: &[HighlightedSegment],
    focused: bool,
    opts: RenderOptions,
) -> io::Result<()> {
    queue!(out, Print(if focused { "> " } else { "" }))?;
    queue!(out, Print(INDENT.repeat(line.level)))?;
    if opts.timestamps {
        if let Some(ts) = &line.timestamp {
            write_dim(out, &format!("{ts} "), opts)?;
        }
    }
    let fallback = kind_color(line.kind);
    for fragment in fragments {
        write_fragment(out, fragment, fallback, opts)?;
    }
    queue!(out, Print("\n"))
}

/// Header row of a named group.
pub fn write_header<W: Write>(
    out: &mut W,
    name: &str,
    level: usize,
    line_count: Option<usize>,
    expanded: bool,
    focused: bool,
    opts: RenderOptions,
) -> io::Result<()> {
    let marker = if expanded { "\u{25be}" } else { "\u{25b8}" };
    queue!(out, Print(if focused { "> " } else { "" }))?;
    queue!(out, Print(INDENT.repeat(level)))?;
    if opts.color {
        queue!(
            out,
            SetAttribute(Attribute::Bold),
            Print(format!("{marker} {name}")),
            SetAttribute(Attribute::Reset)
        )?;
    } else {
        queue!(out, Print(format!("{marker} {name}")))?;
    }
    match line_count {
        Some(count) if !expanded => {
            let noun = if count == 1 { "line" } else { "lines" };
            write_dim(out, &format!(" ({count} {noun})"), opts)?;
        }
        _ => {}
    }
    queue!(out, Print("\n"))
}

fn write_omitted<W: Write>(out: &mut W, omitted: usize, opts: RenderOptions) -> io::Result<()> {
    write_dim(
        out,
        &format!("\u{2026} {omitted} rows hidden, rerun with --show-all to see them \u{2026}"),
        opts,
    )?;
    queue!(out, Print("\n"))
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Draw the visible rows of `snapshot`, with the omission marker between the
/// head and tail when the window is truncated.
pub fn write_snapshot<W: Write>(
    out: &mut W,
    snapshot: &LogSnapshot,
    opts: RenderOptions,
) -> io::Result<()> {
    let plan = &snapshot.plan;
    for (index, item) in snapshot.visible_items() {
        if plan.is_truncated() && index == plan.tail.start {
            write_omitted(out, plan.omitted, opts)?;
        }
        let focused = snapshot.focus == Some(index);
        match item {
            RenderItem::GroupHeader {
                name,
                level,
                line_count,
                expanded,
                ..
            } => write_header(out, name, *level, Some(*line_count), *expanded, focused, opts)?,
            RenderItem::Line { line, .. } => {
                write_line(out, line, &snapshot.render_line(line), focused, opts)?;
            }
        }
    }
    if plan.is_truncated() && plan.tail.is_empty() {
        write_omitted(out, plan.omitted, opts)?;
    }
    out.flush()
}

/// Human-readable annotation list.
pub fn write_annotations<W: Write>(
    out: &mut W,
    annotations: &[Annotation],
    opts: RenderOptions,
) -> io::Result<()> {
    for annotation in annotations {
        let color = match annotation.annotation_level {
            AnnotationLevel::Failure => Color::Red,
            AnnotationLevel::Warning => Color::Yellow,
            AnnotationLevel::Notice => Color::Cyan,
        };
        let label = HighlightedSegment {
            text: annotation.annotation_level.label().to_string(),
            style: Default::default(),
            highlighted: false,
        };
        write_fragment(out, &label, Some(color), opts)?;

        let mut location = String::new();
        if let Some(path) = &annotation.path {
            location.push_str(path);
            if let Some(line) = annotation.start_line {
                location.push_str(&format!(":{line}"));
                if let Some(col) = annotation.column {
                    location.push_str(&format!(":{col}"));
                }
            }
        }
        if !location.is_empty() {
            queue!(out, Print(format!(" {location}")))?;
        }
        queue!(out, Print(format!(" {}", annotation.message)))?;
        write_dim(out, &format!(" [log line {}]", annotation.line + 1), opts)?;
        queue!(out, Print("\n"))?;
    }
    out.flush()
}

// ---------------------------------------------------------------------------
// TailPrinter
// ---------------------------------------------------------------------------

/// Prints newly completed lines of a growing log.
///
/// A line is complete once its terminating newline has arrived; the
/// trailing partial line is held back until it completes or the stream
/// finishes. Group markers become headers; everything is shown expanded.
/// Each update classifies only the bytes past the last complete line.
#[derive(Debug, Clone, Default)]
pub struct TailPrinter {
    /// Source lines consumed so far.
    printed: usize,
    /// Byte offset just past the last consumed line.
    consumed: usize,
    /// Group level carried into the next line.
    level: usize,
    search: Option<SearchPattern>,
    opts: RenderOptions,
}

impl TailPrinter {
    #[must_use]
    pub fn new(opts: RenderOptions, search: Option<SearchPattern>) -> Self {
        Self {
            printed: 0,
            consumed: 0,
            level: 0,
            search,
            opts,
        }
    }

    /// Source lines already printed.
    #[must_use]
    pub fn printed(&self) -> usize {
        self.printed
    }

    /// Forget progress; the next update reprints from the first line.
    pub fn reset(&mut self) {
        self.printed = 0;
        self.consumed = 0;
        self.level = 0;
    }

    /// Print lines of `text` not printed yet. With `finished`, the trailing
    /// unterminated line is printed too. Returns the number of rows written.
    ///
    /// `text` is expected to extend the text of the previous call. A shorter
    /// text starts over from the first line.
    pub fn update<W: Write>(&mut self, out: &mut W, text: &str, finished: bool) -> io::Result<usize> {
        if self.consumed > text.len() || !text.is_char_boundary(self.consumed) {
            self.reset();
        }

        let mut rows = 0;
        let mut rest = &text[self.consumed..];
        while let Some(end) = rest.find('\n') {
            rows += self.print_raw(out, &rest[..end])?;
            self.consumed += end + 1;
            rest = &rest[end + 1..];
        }
        if finished && !rest.is_empty() {
            rows += self.print_raw(out, rest)?;
            self.consumed = text.len();
        }

        if rows > 0 {
            out.flush()?;
        }
        Ok(rows)
    }

    fn print_raw<W: Write>(&mut self, out: &mut W, raw: &str) -> io::Result<usize> {
        let classified = classify_line(raw, self.level);
        self.level = classified.level;
        let index = self.printed;
        self.printed += 1;
        let Some(mut line) = classified.line else {
            return Ok(0);
        };
        line.index = index;

        match line.kind {
            LineKind::GroupStart => {
                let name = line.group_name.as_deref().unwrap_or_default();
                write_header(out, name, line.level, None, true, false, self.opts)?;
            }
            LineKind::GroupEnd => return Ok(0),
            _ => {
                let fragments =
                    highlight_with(&render_segments(&line.content), self.search.as_ref());
                write_line(out, &line, &fragments, false, self.opts)?;
            }
        }
        Ok(1)
    }
}
