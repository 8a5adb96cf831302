//! Line classification for runner console output.
//!
//! Turns one raw line into a typed [`LogLine`], threading the group nesting
//! level through successive calls. Classification never looks ahead: an
//! unterminated group keeps every later line indented at the open level.

use serde::Serialize;

const GROUP_OPEN_MARKERS: [&str; 2] = ["##[group]", "::group::"];
const GROUP_CLOSE_MARKERS: [&str; 2] = ["##[endgroup]", "::endgroup::"];
const COMMAND_MARKERS: [&str; 3] = ["##[command]", "##[section]", "[command]"];

const ERROR_GLYPHS: [char; 3] = ['\u{274c}', '\u{2716}', '\u{2717}'];
const WARNING_GLYPHS: [char; 1] = ['\u{26a0}'];

// ---------------------------------------------------------------------------
// LineKind / LogLine
// ---------------------------------------------------------------------------

/// Semantic category of a classified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineKind {
    GroupStart,
    GroupEnd,
    Command,
    Error,
    Warning,
    Regular,
}

impl LineKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::GroupStart => "group-start",
            Self::GroupEnd => "group-end",
            Self::Command => "command",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Regular => "regular",
        }
    }
}

/// One classified, non-blank log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Leading ISO-8601 timestamp, when the runner emitted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Line text with the timestamp (and command marker) removed.
    pub content: String,
    #[serde(rename = "type")]
    pub kind: LineKind,
    /// Group title, only set on `GroupStart` lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// Visual nesting depth.
    pub level: usize,
    /// Zero-based position in the split-by-newline source text.
    pub index: usize,
}

/// Result of classifying one raw line: the line (if not blank) and the
/// level to use for the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub line: Option<LogLine>,
    pub level: usize,
}

// ---------------------------------------------------------------------------
// classify_line
// ---------------------------------------------------------------------------

/// Classify a single raw line at `current_level`.
///
/// Pure: the same `(raw, current_level)` pair always produces the same
/// result. The returned line carries `index == 0`; [`classify_text`] fills
/// in real positions.
#[must_use]
pub fn classify_line(raw: &str, current_level: usize) -> Classified {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    if raw.trim().is_empty() {
        return Classified {
            line: None,
            level: current_level,
        };
    }

    let (timestamp, content) = split_timestamp(raw);
    if content.trim().is_empty() {
        return Classified {
            line: None,
            level: current_level,
        };
    }
    let timestamp = timestamp.map(str::to_string);

    if let Some(title) = strip_any_prefix(content, &GROUP_OPEN_MARKERS) {
        let name = title.trim().to_string();
        return Classified {
            line: Some(LogLine {
                timestamp,
                content: name.clone(),
                kind: LineKind::GroupStart,
                group_name: Some(name),
                level: current_level,
                index: 0,
            }),
            level: current_level + 1,
        };
    }

    if let Some(rest) = strip_any_prefix(content, &GROUP_CLOSE_MARKERS) {
        let level = current_level.saturating_sub(1);
        return Classified {
            line: Some(LogLine {
                timestamp,
                content: rest.trim().to_string(),
                kind: LineKind::GroupEnd,
                group_name: None,
                level,
                index: 0,
            }),
            level,
        };
    }

    let (kind, content) = match strip_any_prefix(content, &COMMAND_MARKERS) {
        Some(command) => (LineKind::Command, command.trim_start()),
        None => (severity_of(content), content),
    };

    Classified {
        line: Some(LogLine {
            timestamp,
            content: content.to_string(),
            kind,
            group_name: None,
            level: current_level,
            index: 0,
        }),
        level: current_level,
    }
}

/// Classify every line of `text`, threading the level from line to line.
///
/// Blank lines are dropped; surviving lines keep their source position in
/// [`LogLine::index`].
#[must_use]
pub fn classify_text(text: &str) -> Vec<LogLine> {
    let mut level = 0;
    let mut lines = Vec::new();
    for (index, raw) in text.split('\n').enumerate() {
        let classified = classify_line(raw, level);
        level = classified.level;
        if let Some(mut line) = classified.line {
            line.index = index;
            lines.push(line);
        }
    }
    lines
}

/// Split a leading `YYYY-MM-DDTHH:MM:SS[.fraction]Z` timestamp (and the
/// single separating space) from the rest of the line.
#[must_use]
pub fn split_timestamp(raw: &str) -> (Option<&str>, &str) {
    let bytes = raw.as_bytes();
    if bytes.len() < 20 {
        return (None, raw);
    }
    let shape = b"dddd-dd-ddTdd:dd:dd";
    let matches_shape = shape.iter().zip(bytes).all(|(expected, actual)| {
        if *expected == b'd' {
            actual.is_ascii_digit()
        } else {
            expected == actual
        }
    });
    if !matches_shape {
        return (None, raw);
    }

    let mut end = shape.len();
    if bytes.get(end) == Some(&b'.') {
        let digits = bytes[end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return (None, raw);
        }
        end += 1 + digits;
    }
    if bytes.get(end) != Some(&b'Z') {
        return (None, raw);
    }
    end += 1;

    let rest = &raw[end..];
    (Some(&raw[..end]), rest.strip_prefix(' ').unwrap_or(rest))
}

fn strip_any_prefix<'a>(content: &'a str, markers: &[&str]) -> Option<&'a str> {
    markers
        .iter()
        .find_map(|marker| content.strip_prefix(marker))
}

fn severity_of(content: &str) -> LineKind {
    let lower = content.to_lowercase();
    if lower.contains("error") || content.contains(&ERROR_GLYPHS[..]) {
        LineKind::Error
    } else if lower.contains("warn") || content.contains(&WARNING_GLYPHS[..]) {
        LineKind::Warning
    } else {
        LineKind::Regular
    }
}
