//! joblog-stream: offset-based acquisition of a growing job log.
//!
//! A [`StreamController`] owns one stream's state and applies fetch results
//! strictly in order, one fetch at a time. [`follow`] drives it on a fixed
//! cadence against any [`ChunkSource`] until the job completes or the caller
//! cancels. Multiple controllers share nothing and can be driven
//! concurrently.

pub mod chunk;
pub mod controller;
pub mod error;
pub mod follow;
pub mod http_source;
pub mod source;

pub use chunk::{ChunkPayload, JobMeta, JobStatus, JobStep, LogChunk};
pub use controller::{
    FetchTicket, PollOutcome, StreamConfig, StreamController, StreamPhase, StreamState,
};
pub use error::FetchError;
pub use follow::{follow, poll_once, FollowExit};
pub use http_source::HttpChunkSource;
pub use source::{ChunkSource, FileChunkSource, MockChunkSource};
