//! The offset fetch primitive and its local implementations.

use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::chunk::ChunkPayload;
use crate::error::FetchError;

/// Something that can return "everything after byte `offset`" of a job log.
///
/// Implementations must report `FetchError::NotFound` when the log does not
/// exist yet, and should never return bytes before `offset`.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    async fn fetch_chunk(&self, job_id: &str, offset: u64) -> Result<ChunkPayload, FetchError>;
}

// ---------------------------------------------------------------------------
// FileChunkSource
// ---------------------------------------------------------------------------

/// Reads a log file that another process is appending to.
///
/// The job id is ignored. Content is cut back to the last complete UTF-8
/// character so a multi-byte sequence split across two reads is not
/// mangled; the reported length covers only what was returned.
#[derive(Debug, Clone)]
pub struct FileChunkSource {
    path: PathBuf,
}

impl FileChunkSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChunkSource for FileChunkSource {
    async fn fetch_chunk(&self, _job_id: &str, offset: u64) -> Result<ChunkPayload, FetchError> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        let len = file.metadata().await?.len();
        if len <= offset {
            // Truncated or unchanged; the controller decides which.
            return Ok(ChunkPayload::text("", len));
        }
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        let (content, consumed) = decode_complete_prefix(&buf);
        Ok(ChunkPayload::text(content, offset + consumed as u64))
    }
}

/// Decode `buf`, leaving a trailing incomplete UTF-8 sequence for the next
/// read. Invalid bytes elsewhere are replaced.
fn decode_complete_prefix(buf: &[u8]) -> (String, usize) {
    match std::str::from_utf8(buf) {
        Ok(text) => (text.to_string(), buf.len()),
        Err(err) if err.error_len().is_none() => {
            let valid = err.valid_up_to();
            let prefix = &buf[..valid];
            (String::from_utf8_lossy(prefix).into_owned(), valid)
        }
        Err(_) => {
            let cut = incomplete_tail_start(buf);
            (String::from_utf8_lossy(&buf[..cut]).into_owned(), cut)
        }
    }
}

fn incomplete_tail_start(buf: &[u8]) -> usize {
    (1..=buf.len().min(3))
        .map(|back| buf.len() - back)
        .find(|&start| {
            matches!(
                std::str::from_utf8(&buf[start..]),
                Err(err) if err.error_len().is_none() && err.valid_up_to() == 0
            )
        })
        .unwrap_or(buf.len())
}

// ---------------------------------------------------------------------------
// MockChunkSource
// ---------------------------------------------------------------------------

/// Scripted source for tests: replays queued results in order and records
/// every requested offset.
#[derive(Debug, Default)]
pub struct MockChunkSource {
    responses: Mutex<VecDeque<Result<ChunkPayload, FetchError>>>,
    offsets: Mutex<Vec<u64>>,
}

impl MockChunkSource {
    #[must_use]
    pub fn new(responses: Vec<Result<ChunkPayload, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            offsets: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: Result<ChunkPayload, FetchError>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Offsets requested so far, in call order.
    #[must_use]
    pub fn requested_offsets(&self) -> Vec<u64> {
        self.offsets
            .lock()
            .map(|offsets| offsets.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChunkSource for MockChunkSource {
    async fn fetch_chunk(&self, _job_id: &str, offset: u64) -> Result<ChunkPayload, FetchError> {
        self.offsets
            .lock()
            .map_err(|_| FetchError::Io("mock offsets mutex poisoned".into()))?
            .push(offset);
        self.responses
            .lock()
            .map_err(|_| FetchError::Io("mock responses mutex poisoned".into()))?
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("mock source exhausted".into())))
    }
}
