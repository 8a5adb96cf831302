//! Extraction of runner annotation directives from raw log text.
//!
//! Recognised shapes, optionally preceded by a runner timestamp:
//!
//! ```text
//! ::error file=src/a.go,line=10,endLine=12,col=3::message
//! ::warning::message
//! ##[notice]message
//! ```
//!
//! This is a best-effort scan. Anything that does not fit is skipped.

use serde::Serialize;

use crate::line_classifier::split_timestamp;

/// Severity of an annotation as reported to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Failure,
    Warning,
    Notice,
}

impl AnnotationLevel {
    /// Map a directive token to a level. `error` becomes `Failure`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("error") {
            Some(Self::Failure)
        } else if token.eq_ignore_ascii_case("warning") {
            Some(Self::Warning)
        } else if token.eq_ignore_ascii_case("notice") {
            Some(Self::Notice)
        } else {
            None
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Failure => "failure",
            Self::Warning => "warning",
            Self::Notice => "notice",
        }
    }
}

/// A structured diagnostic found in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    pub message: String,
    pub annotation_level: AnnotationLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Zero-based index of the directive in the split-by-newline text.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
}

/// Scan `text` for annotation directives, in source order.
#[must_use]
pub fn parse_annotations(text: &str) -> Vec<Annotation> {
    text.split('\n')
        .enumerate()
        .filter_map(|(index, raw)| parse_directive(raw, index))
        .collect()
}

fn parse_directive(raw: &str, index: usize) -> Option<Annotation> {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    let (_, content) = split_timestamp(raw);
    let content = content.trim_start();

    if let Some(rest) = content.strip_prefix("::") {
        return parse_workflow_command(rest, index);
    }
    if let Some(rest) = content.strip_prefix("##[") {
        let (token, message) = rest.split_once(']')?;
        let level = AnnotationLevel::from_token(token)?;
        return build(level, Metadata::default(), message, index);
    }
    None
}

fn parse_workflow_command(rest: &str, index: usize) -> Option<Annotation> {
    let (header, message) = rest.split_once("::")?;
    let header = header.trim();
    let (token, params) = match header.split_once(char::is_whitespace) {
        Some((token, params)) => (token, params),
        None => (header, ""),
    };
    let level = AnnotationLevel::from_token(token)?;
    build(level, Metadata::parse(params), message, index)
}

fn build(level: AnnotationLevel, meta: Metadata, message: &str, index: usize) -> Option<Annotation> {
    let message = message.trim();
    if message.is_empty() {
        return None;
    }
    let title = meta.title.or_else(|| Some(default_title(message)));
    Some(Annotation {
        path: meta.file,
        start_line: meta.line,
        end_line: meta.end_line,
        message: message.to_string(),
        annotation_level: level,
        title,
        line: index,
        column: meta.col,
        end_column: meta.end_column,
    })
}

fn default_title(message: &str) -> String {
    match message.split_once(':') {
        Some((head, _)) if !head.trim().is_empty() => head.trim().to_string(),
        _ => message.to_string(),
    }
}

#[derive(Debug, Default)]
struct Metadata {
    file: Option<String>,
    line: Option<u32>,
    end_line: Option<u32>,
    col: Option<u32>,
    end_column: Option<u32>,
    title: Option<String>,
}

impl Metadata {
    fn parse(params: &str) -> Self {
        let mut meta = Self::default();
        for pair in params.split(',') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "file" => meta.file = Some(value.to_string()),
                "line" => meta.line = value.parse().ok(),
                "endLine" => meta.end_line = value.parse().ok(),
                "col" => meta.col = value.parse().ok(),
                "endColumn" => meta.end_column = value.parse().ok(),
                "title" => meta.title = Some(value.to_string()),
                _ => {}
            }
        }
        meta
    }
}
