//! Errors surfaced by chunk sources.

/// Failure of one offset fetch.
///
/// `NotFound` is the "log not produced yet" class and is treated as zero
/// growth by the controller; everything else is a transport-level failure
/// retried on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("log not available yet")]
    NotFound,
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport: {0}")]
    Transport(String),
    #[error("decode response: {0}")]
    Decode(String),
    #[error("io: {0}")]
    Io(String),
}

impl FetchError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// HTTP status code, when the failure carried one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(err.to_string())
        }
    }
}
