//! SGR color code interpretation.
//!
//! Only reset, bold and the 16 standard/bright foreground colors are
//! understood. Both the real `ESC [ ... m` form and the bare `[ ... m` form
//! (escape byte stripped in transit) are accepted. Other CSI sequences with
//! a real escape byte are removed; everything else passes through as text.

const ESC: u8 = 0x1b;

// ---------------------------------------------------------------------------
// AnsiColor
// ---------------------------------------------------------------------------

/// One of the 16 standard foreground colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl AnsiColor {
    const BASE: [AnsiColor; 8] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
    ];
    const BRIGHT: [AnsiColor; 8] = [
        Self::BrightBlack,
        Self::BrightRed,
        Self::BrightGreen,
        Self::BrightYellow,
        Self::BrightBlue,
        Self::BrightMagenta,
        Self::BrightCyan,
        Self::BrightWhite,
    ];

    /// Map an SGR foreground code (30-37, 90-97) to a color.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            30..=37 => Some(Self::BASE[usize::from(code - 30)]),
            90..=97 => Some(Self::BRIGHT[usize::from(code - 90)]),
            _ => None,
        }
    }

    /// Style class name for the color.
    #[must_use]
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Black => "ansi-black",
            Self::Red => "ansi-red",
            Self::Green => "ansi-green",
            Self::Yellow => "ansi-yellow",
            Self::Blue => "ansi-blue",
            Self::Magenta => "ansi-magenta",
            Self::Cyan => "ansi-cyan",
            Self::White => "ansi-white",
            Self::BrightBlack => "ansi-bright-black",
            Self::BrightRed => "ansi-bright-red",
            Self::BrightGreen => "ansi-bright-green",
            Self::BrightYellow => "ansi-bright-yellow",
            Self::BrightBlue => "ansi-bright-blue",
            Self::BrightMagenta => "ansi-bright-magenta",
            Self::BrightCyan => "ansi-bright-cyan",
            Self::BrightWhite => "ansi-bright-white",
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentStyle / Segment
// ---------------------------------------------------------------------------

/// Accumulated SGR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SegmentStyle {
    pub bold: bool,
    pub color: Option<AnsiColor>,
}

impl SegmentStyle {
    #[must_use]
    pub fn is_plain(self) -> bool {
        !self.bold && self.color.is_none()
    }

    /// Style classes in a stable order: bold first, then color.
    #[must_use]
    pub fn classes(self) -> Vec<&'static str> {
        let mut classes = Vec::new();
        if self.bold {
            classes.push("ansi-bold");
        }
        if let Some(color) = self.color {
            classes.push(color.class_name());
        }
        classes
    }

    fn apply(&mut self, params: &str) {
        let mut codes = params.split(';').map(|p| {
            if p.is_empty() {
                Some(0)
            } else {
                p.parse::<u16>().ok()
            }
        });
        while let Some(code) = codes.next() {
            match code {
                Some(0) => *self = Self::default(),
                Some(1) => self.bold = true,
                // Extended colors: swallow their arguments so they are not
                // misread as standalone codes.
                Some(38 | 48) => match codes.next() {
                    Some(Some(5)) => {
                        codes.next();
                    }
                    Some(Some(2)) => {
                        codes.next();
                        codes.next();
                        codes.next();
                    }
                    _ => {}
                },
                Some(other) => {
                    if let Some(color) = AnsiColor::from_code(other) {
                        self.color = Some(color);
                    }
                }
                None => {}
            }
        }
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: SegmentStyle,
}

// ---------------------------------------------------------------------------
// render_segments
// ---------------------------------------------------------------------------

struct Sequence<'a> {
    end: usize,
    sgr: Option<&'a str>,
}

/// Split `text` into styled segments, removing recognised escape codes.
///
/// Concatenating the segment texts reproduces the input without its escape
/// codes. Style resets at every newline.
#[must_use]
pub fn render_segments(text: &str) -> Vec<Segment> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut style = SegmentStyle::default();
    let mut plain_start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\n' => {
                push_fragment(&mut segments, &text[plain_start..=pos], style);
                style = SegmentStyle::default();
                pos += 1;
                plain_start = pos;
            }
            ESC | b'[' => match parse_sequence(text, pos) {
                Some(sequence) => {
                    push_fragment(&mut segments, &text[plain_start..pos], style);
                    if let Some(params) = sequence.sgr {
                        style.apply(params);
                    }
                    pos = sequence.end;
                    plain_start = pos;
                }
                None => pos += 1,
            },
            _ => pos += 1,
        }
    }
    push_fragment(&mut segments, &text[plain_start..], style);
    segments
}

/// `text` with every recognised escape code removed.
#[must_use]
pub fn strip_codes(text: &str) -> String {
    render_segments(text)
        .into_iter()
        .map(|segment| segment.text)
        .collect()
}

fn parse_sequence(text: &str, start: usize) -> Option<Sequence<'_>> {
    let bytes = text.as_bytes();
    let escaped = bytes[start] == ESC;
    let params_start = if escaped {
        if bytes.get(start + 1) != Some(&b'[') {
            return None;
        }
        start + 2
    } else {
        start + 1
    };

    let mut end = params_start;
    while let Some(&b) = bytes.get(end) {
        if b.is_ascii_digit() || b == b';' || (escaped && b == b'?') {
            end += 1;
        } else {
            break;
        }
    }
    let final_byte = *bytes.get(end)?;
    let params = &text[params_start..end];

    if final_byte == b'm' && !params.contains('?') {
        if !escaped && !params.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        return Some(Sequence {
            end: end + 1,
            sgr: Some(params),
        });
    }
    if escaped && final_byte.is_ascii_alphabetic() {
        return Some(Sequence {
            end: end + 1,
            sgr: None,
        });
    }
    None
}

fn push_fragment(segments: &mut Vec<Segment>, fragment: &str, style: SegmentStyle) {
    if fragment.is_empty() {
        return;
    }
    if let Some(last) = segments.last_mut() {
        if last.style == style {
            last.text.push_str(fragment);
            return;
        }
    }
    segments.push(Segment {
        text: fragment.to_string(),
        style,
    });
}
