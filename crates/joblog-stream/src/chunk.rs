//! Wire shapes of the offset fetch and job metadata contracts.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Lifecycle status of a CI job as reported by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    /// Any status string this client does not know.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Unknown => "unknown",
        }
    }
}

/// Job status plus conclusion (`success`, `failure`, ... or none yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMeta {
    pub status: JobStatus,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStep {
    pub name: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub number: Option<u32>,
}

/// Newly observed text plus the cumulative length ever observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub content: String,
    pub total_length: u64,
    pub is_complete: Option<bool>,
}

/// Successful response of one offset fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    #[serde(default)]
    pub content: String,
    pub total_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub job_steps: Vec<JobStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChunkPayload {
    /// Payload carrying only text, as most tests and the file source need.
    #[must_use]
    pub fn text(content: impl Into<String>, total_length: u64) -> Self {
        Self {
            content: content.into(),
            total_length,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_complete(mut self, complete: bool) -> Self {
        self.is_complete = Some(complete);
        self
    }

    #[must_use]
    pub fn with_job(mut self, status: JobStatus, conclusion: Option<&str>) -> Self {
        self.job_status = Some(status);
        self.job_conclusion = conclusion.map(str::to_string);
        self
    }

    pub fn from_json(body: &str) -> Result<Self, FetchError> {
        serde_json::from_str(body).map_err(|err| FetchError::Decode(err.to_string()))
    }

    #[must_use]
    pub fn chunk(&self) -> LogChunk {
        LogChunk {
            content: self.content.clone(),
            total_length: self.total_length,
            is_complete: self.is_complete,
        }
    }

    /// Job metadata embedded in the payload, when a status was sent.
    #[must_use]
    pub fn job_meta(&self) -> Option<JobMeta> {
        self.job_status.map(|status| JobMeta {
            status,
            conclusion: self.job_conclusion.clone(),
        })
    }
}
