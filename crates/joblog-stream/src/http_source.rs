//! Offset fetches against the log proxy over HTTP.
//!
//! `GET {base_url}/jobs/{job_id}/logs?offset={offset}` answering with a
//! JSON [`ChunkPayload`]. A 404 means the runner has not produced a log yet.

use std::time::Duration;

use async_trait::async_trait;

use crate::chunk::ChunkPayload;
use crate::error::FetchError;
use crate::source::ChunkSource;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking `ureq` client run on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct HttpChunkSource {
    base_url: String,
    timeout: Duration,
    token: Option<String>,
}

impl HttpChunkSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            token: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bearer token sent with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn chunk_url(&self, job_id: &str, offset: u64) -> String {
        format!(
            "{}/jobs/{}/logs?offset={}",
            self.base_url.trim_end_matches('/'),
            job_id,
            offset
        )
    }
}

#[async_trait]
impl ChunkSource for HttpChunkSource {
    async fn fetch_chunk(&self, job_id: &str, offset: u64) -> Result<ChunkPayload, FetchError> {
        let url = self.chunk_url(job_id, offset);
        let timeout = self.timeout;
        let token = self.token.clone();
        tokio::task::spawn_blocking(move || fetch_blocking(&url, timeout, token.as_deref()))
            .await
            .map_err(|err| FetchError::Transport(format!("fetch task failed: {err}")))?
    }
}

fn fetch_blocking(
    url: &str,
    timeout: Duration,
    token: Option<&str>,
) -> Result<ChunkPayload, FetchError> {
    tracing::trace!(url, "GET log chunk");
    let mut request = ureq::get(url)
        .set("Accept", "application/json")
        .timeout(timeout);
    if let Some(token) = token {
        request = request.set("Authorization", &format!("Bearer {token}"));
    }

    let response = match request.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(404, _)) => return Err(FetchError::NotFound),
        Err(ureq::Error::Status(status, response)) => {
            let message = response
                .into_string()
                .unwrap_or_else(|err| format!("unreadable body: {err}"));
            return Err(FetchError::Status {
                status,
                message: message.trim().to_string(),
            });
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(FetchError::Transport(transport.to_string()));
        }
    };

    let body = response
        .into_string()
        .map_err(|err| FetchError::Io(format!("read response body: {err}")))?;
    ChunkPayload::from_json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_url_joins_base_and_offset() {
        let source = HttpChunkSource::new("https://ci.example.com/api/");
        assert_eq!(
            source.chunk_url("1234", 512),
            "https://ci.example.com/api/jobs/1234/logs?offset=512"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let source = HttpChunkSource::new("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(200))
            .with_token("t");
        let result = source.fetch_chunk("1", 0).await;
        assert!(matches!(result, Err(FetchError::Transport(_))), "{result:?}");
    }
}
