//! Polling state machine for one job log stream.
//!
//! ```text
//! Idle -> Fetching -> Growing | Stalled | NotFound | Error -> ... -> Completed
//! ```
//!
//! The controller never performs I/O itself. A caller asks for a
//! [`FetchTicket`], performs the fetch at the ticket's offset and hands the
//! result back through [`StreamController::apply`]. At most one ticket is
//! outstanding; ticks that arrive meanwhile get `None` and are dropped.
//! Stopping bumps a generation counter so late results are discarded.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::chunk::{ChunkPayload, JobMeta, JobStatus, JobStep, LogChunk};
use crate::error::FetchError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_STALL_THRESHOLD: u32 = 10;
pub const DEFAULT_COMPLETION_GRACE: u32 = 3;

const NOT_AVAILABLE_MESSAGE: &str = "log not available yet, waiting for the runner";

// ---------------------------------------------------------------------------
// Config / state types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub poll_interval: Duration,
    /// Polls without growth before the stall advisory is raised.
    pub stall_threshold: u32,
    /// Polls without growth, after the source reports completion, before
    /// finalizing when no job status is known.
    pub completion_grace: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            completion_grace: DEFAULT_COMPLETION_GRACE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamPhase {
    Idle,
    Fetching,
    Growing,
    Stalled,
    NotFound,
    Error,
    Completed,
}

impl StreamPhase {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Growing => "growing",
            Self::Stalled => "stalled",
            Self::NotFound => "not-found",
            Self::Error => "error",
            Self::Completed => "completed",
        }
    }
}

/// Observable stream state. Only the controller mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    /// Most recently merged chunk.
    pub chunk: Option<LogChunk>,
    pub last_poll: Option<DateTime<Utc>>,
    pub cycles_without_growth: u32,
    pub is_complete: bool,
}

/// Permission to perform one fetch at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    offset: u64,
    generation: u64,
}

impl FetchTicket {
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// What applying one fetch result did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Appended { bytes: usize },
    NoGrowth { cycles: u32 },
    NotYetAvailable,
    Failed(FetchError),
    /// Length went backwards; the buffer was dropped and the next fetch
    /// starts at offset 0.
    Reset { previous: u64, reported: u64 },
    Completed,
    /// Result of a fetch issued before a stop; nothing changed.
    Discarded,
}

// ---------------------------------------------------------------------------
// StreamController
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StreamController {
    job_id: String,
    config: StreamConfig,
    phase: StreamPhase,
    state: StreamState,
    text: String,
    streaming: bool,
    in_flight: Option<u64>,
    generation: u64,
    job: Option<JobMeta>,
    /// Status from `set_job_meta`; stays in force until replaced.
    external_status: Option<JobStatus>,
    steps: Vec<JobStep>,
    last_error: Option<FetchError>,
    message: Option<String>,
}

impl StreamController {
    #[must_use]
    pub fn new(job_id: impl Into<String>, config: StreamConfig) -> Self {
        Self {
            job_id: job_id.into(),
            config,
            phase: StreamPhase::Idle,
            state: StreamState::default(),
            text: String::new(),
            streaming: false,
            in_flight: None,
            generation: 0,
            job: None,
            external_status: None,
            steps: Vec::new(),
            last_error: None,
            message: None,
        }
    }

    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    #[must_use]
    pub fn config(&self) -> StreamConfig {
        self.config
    }

    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Cumulative text merged so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn job(&self) -> Option<&JobMeta> {
        self.job.as_ref()
    }

    #[must_use]
    pub fn steps(&self) -> &[JobStep] {
        &self.steps
    }

    /// Most recent transport failure; cleared by the next successful fetch.
    #[must_use]
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Informational status for the user (not-yet-available, stall, or a
    /// message relayed from the source).
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Offset the next fetch will request: the last known total length.
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.state
            .chunk
            .as_ref()
            .map_or(0, |chunk| chunk.total_length)
    }

    /// Enable polling. Returns `false` when the stream already completed.
    pub fn start(&mut self) -> bool {
        if self.state.is_complete {
            return false;
        }
        self.streaming = true;
        true
    }

    /// Disable polling and orphan any outstanding fetch.
    pub fn stop(&mut self) {
        self.streaming = false;
        if self.in_flight.take().is_some() {
            tracing::debug!(job_id = %self.job_id, "stream stopped with fetch in flight");
        }
        self.generation += 1;
        if self.phase != StreamPhase::Completed {
            self.phase = StreamPhase::Idle;
        }
    }

    /// Record job metadata obtained outside the log fetch. Its status is
    /// used for completion on every poll whose payload carries none.
    pub fn set_job_meta(&mut self, meta: JobMeta) {
        self.external_status = Some(meta.status);
        self.job = Some(meta);
    }

    /// Ask to fetch. `None` when not streaming or a fetch is already out.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if !self.streaming {
            return None;
        }
        if self.in_flight.is_some() {
            tracing::trace!(job_id = %self.job_id, "poll tick dropped, fetch outstanding");
            return None;
        }
        self.in_flight = Some(self.generation);
        self.phase = StreamPhase::Fetching;
        let offset = self.next_offset();
        tracing::debug!(job_id = %self.job_id, offset, "fetching log chunk");
        Some(FetchTicket {
            offset,
            generation: self.generation,
        })
    }

    /// Merge the result of the fetch authorised by `ticket`.
    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        result: Result<ChunkPayload, FetchError>,
    ) -> PollOutcome {
        if ticket.generation != self.generation || self.in_flight != Some(ticket.generation) {
            return PollOutcome::Discarded;
        }
        self.in_flight = None;
        self.state.last_poll = Some(Utc::now());

        match result {
            Ok(payload) => self.apply_payload(payload),
            Err(err) if err.is_not_found() => {
                self.state.cycles_without_growth += 1;
                self.phase = StreamPhase::NotFound;
                self.last_error = None;
                self.message = Some(NOT_AVAILABLE_MESSAGE.to_string());
                PollOutcome::NotYetAvailable
            }
            Err(err) => {
                tracing::warn!(job_id = %self.job_id, error = %err, "log fetch failed");
                self.phase = StreamPhase::Error;
                self.last_error = Some(err.clone());
                PollOutcome::Failed(err)
            }
        }
    }

    fn apply_payload(&mut self, payload: ChunkPayload) -> PollOutcome {
        self.last_error = None;
        self.message = payload.message.clone();
        let current_status = payload.job_meta().map(|meta| meta.status);
        if let Some(meta) = payload.job_meta() {
            self.job = Some(meta);
        }
        if !payload.job_steps.is_empty() {
            self.steps = payload.job_steps.clone();
        }

        let previous = self.next_offset();
        if payload.total_length < previous {
            tracing::warn!(
                job_id = %self.job_id,
                previous,
                reported = payload.total_length,
                "log length regressed, restarting from offset 0"
            );
            self.text.clear();
            self.state.chunk = None;
            self.state.cycles_without_growth = 0;
            self.phase = StreamPhase::Idle;
            return PollOutcome::Reset {
                previous,
                reported: payload.total_length,
            };
        }

        let grew = payload.total_length > previous;
        let appended = if grew {
            self.text.push_str(&payload.content);
            self.state.cycles_without_growth = 0;
            self.phase = StreamPhase::Growing;
            payload.content.len()
        } else {
            self.state.cycles_without_growth += 1;
            self.phase = StreamPhase::Stalled;
            0
        };
        self.state.chunk = Some(payload.chunk());

        let status = current_status.or(self.external_status);
        if self.should_finalize(payload.is_complete == Some(true), status) {
            self.state.is_complete = true;
            self.streaming = false;
            self.phase = StreamPhase::Completed;
            tracing::info!(
                job_id = %self.job_id,
                total_length = payload.total_length,
                "log stream completed"
            );
            return PollOutcome::Completed;
        }

        let cycles = self.state.cycles_without_growth;
        if grew {
            PollOutcome::Appended { bytes: appended }
        } else {
            if cycles >= self.config.stall_threshold {
                self.message = Some(format!("no new output for {cycles} polls"));
            }
            PollOutcome::NoGrowth { cycles }
        }
    }

    /// `status` is what this poll knows about the job. A status reported by
    /// an earlier payload does not carry over.
    fn should_finalize(&self, source_complete: bool, status: Option<JobStatus>) -> bool {
        if !source_complete {
            return false;
        }
        match status {
            Some(JobStatus::Completed) => true,
            Some(JobStatus::Unknown) | None => {
                self.state.cycles_without_growth > self.config.completion_grace
            }
            Some(JobStatus::Queued | JobStatus::InProgress) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streaming(config: StreamConfig) -> StreamController {
        let mut controller = StreamController::new("42", config);
        assert!(controller.start());
        controller
    }

    fn poll(
        controller: &mut StreamController,
        result: Result<ChunkPayload, FetchError>,
    ) -> (u64, PollOutcome) {
        let Some(ticket) = controller.begin_fetch() else {
            panic!("expected a fetch ticket");
        };
        (ticket.offset(), controller.apply(ticket, result))
    }

    #[test]
    fn idle_controller_does_not_fetch() {
        let mut controller = StreamController::new("1", StreamConfig::default());
        assert_eq!(controller.begin_fetch(), None);
        assert_eq!(controller.phase(), StreamPhase::Idle);
    }

    #[test]
    fn growth_appends_and_advances_offset() {
        let mut controller = streaming(StreamConfig::default());
        let (offset, outcome) = poll(&mut controller, Ok(ChunkPayload::text("abc\n", 4)));
        assert_eq!(offset, 0);
        assert_eq!(outcome, PollOutcome::Appended { bytes: 4 });
        assert_eq!(controller.phase(), StreamPhase::Growing);

        let (offset, _) = poll(&mut controller, Ok(ChunkPayload::text("de\n", 7)));
        assert_eq!(offset, 4);
        assert_eq!(controller.text(), "abc\nde\n");
        assert_eq!(controller.next_offset(), 7);
        assert!(controller.state().last_poll.is_some());
    }

    #[test]
    fn tick_during_fetch_is_dropped() {
        let mut controller = streaming(StreamConfig::default());
        let first = controller.begin_fetch();
        assert!(first.is_some());
        assert!(controller.is_fetching());
        assert_eq!(controller.begin_fetch(), None);
        if let Some(ticket) = first {
            controller.apply(ticket, Ok(ChunkPayload::text("x", 1)));
        }
        assert!(controller.begin_fetch().is_some());
    }

    #[test]
    fn no_growth_counts_cycles_and_raises_stall_advisory() {
        let config = StreamConfig {
            stall_threshold: 2,
            ..StreamConfig::default()
        };
        let mut controller = streaming(config);
        poll(&mut controller, Ok(ChunkPayload::text("a", 1)));
        let (_, outcome) = poll(&mut controller, Ok(ChunkPayload::text("", 1)));
        assert_eq!(outcome, PollOutcome::NoGrowth { cycles: 1 });
        assert_eq!(controller.phase(), StreamPhase::Stalled);
        assert_eq!(controller.message(), None);
        poll(&mut controller, Ok(ChunkPayload::text("", 1)));
        assert_eq!(controller.message(), Some("no new output for 2 polls"));
        assert!(controller.is_streaming());

        poll(&mut controller, Ok(ChunkPayload::text("b", 2)));
        assert_eq!(controller.state().cycles_without_growth, 0);
        assert_eq!(controller.message(), None);
    }

    #[test]
    fn regression_resets_to_offset_zero() {
        let mut controller = streaming(StreamConfig::default());
        poll(&mut controller, Ok(ChunkPayload::text("hello\n", 6)));
        let (_, outcome) = poll(&mut controller, Ok(ChunkPayload::text("", 3)));
        assert_eq!(
            outcome,
            PollOutcome::Reset {
                previous: 6,
                reported: 3
            }
        );
        assert_eq!(controller.text(), "");
        let (offset, _) = poll(&mut controller, Ok(ChunkPayload::text("new\n", 4)));
        assert_eq!(offset, 0);
        assert_eq!(controller.text(), "new\n");
    }

    #[test]
    fn not_found_is_zero_growth_not_an_error() {
        let mut controller = streaming(StreamConfig::default());
        let (_, outcome) = poll(&mut controller, Err(FetchError::NotFound));
        assert_eq!(outcome, PollOutcome::NotYetAvailable);
        assert_eq!(controller.phase(), StreamPhase::NotFound);
        assert_eq!(controller.state().cycles_without_growth, 1);
        assert!(controller.last_error().is_none());
        assert!(controller.message().is_some());
        assert!(controller.is_streaming());
    }

    #[test]
    fn transport_failure_keeps_content_and_retries() {
        let mut controller = streaming(StreamConfig::default());
        poll(&mut controller, Ok(ChunkPayload::text("keep\n", 5)));
        let err = FetchError::Status {
            status: 500,
            message: "boom".into(),
        };
        let (_, outcome) = poll(&mut controller, Err(err.clone()));
        assert_eq!(outcome, PollOutcome::Failed(err.clone()));
        assert_eq!(controller.phase(), StreamPhase::Error);
        assert_eq!(controller.last_error(), Some(&err));
        assert_eq!(controller.text(), "keep\n");

        let (offset, _) = poll(&mut controller, Ok(ChunkPayload::text("more\n", 10)));
        assert_eq!(offset, 5);
        assert!(controller.last_error().is_none());
    }

    #[test]
    fn completes_when_job_and_source_agree() {
        let mut controller = streaming(StreamConfig::default());
        let (_, outcome) = poll(
            &mut controller,
            Ok(ChunkPayload::text("a", 1).with_job(JobStatus::InProgress, None)),
        );
        assert_eq!(outcome, PollOutcome::Appended { bytes: 1 });

        let (_, outcome) = poll(
            &mut controller,
            Ok(ChunkPayload::text("b", 2).with_complete(true)),
        );
        assert_eq!(outcome, PollOutcome::Appended { bytes: 1 });

        let (_, outcome) = poll(
            &mut controller,
            Ok(ChunkPayload::text("", 2)
                .with_complete(true)
                .with_job(JobStatus::Completed, Some("success"))),
        );
        assert_eq!(outcome, PollOutcome::Completed);
        assert!(controller.state().is_complete);
        assert!(!controller.is_streaming());
        assert_eq!(controller.begin_fetch(), None);
        assert!(!controller.start());
        assert_eq!(
            controller.job().and_then(|job| job.conclusion.as_deref()),
            Some("success")
        );
    }

    #[test]
    fn completes_from_data_alone_after_grace() {
        let config = StreamConfig {
            completion_grace: 1,
            ..StreamConfig::default()
        };
        let mut controller = streaming(config);
        poll(&mut controller, Ok(ChunkPayload::text("a", 1).with_complete(true)));
        let (_, outcome) = poll(&mut controller, Ok(ChunkPayload::text("", 1).with_complete(true)));
        assert_eq!(outcome, PollOutcome::NoGrowth { cycles: 1 });
        let (_, outcome) = poll(&mut controller, Ok(ChunkPayload::text("", 1).with_complete(true)));
        assert_eq!(outcome, PollOutcome::Completed);
    }

    #[test]
    fn earlier_in_progress_status_does_not_block_data_completion() {
        let config = StreamConfig {
            completion_grace: 1,
            ..StreamConfig::default()
        };
        let mut controller = streaming(config);
        poll(
            &mut controller,
            Ok(ChunkPayload::text("a\n", 2).with_job(JobStatus::InProgress, None)),
        );
        let (_, outcome) = poll(&mut controller, Ok(ChunkPayload::text("", 2).with_complete(true)));
        assert_eq!(outcome, PollOutcome::NoGrowth { cycles: 1 });
        let (_, outcome) = poll(&mut controller, Ok(ChunkPayload::text("", 2).with_complete(true)));
        assert_eq!(outcome, PollOutcome::Completed);
        assert_eq!(controller.phase(), StreamPhase::Completed);
        assert_eq!(
            controller.job().map(|job| job.status),
            Some(JobStatus::InProgress)
        );
    }

    #[test]
    fn in_progress_status_on_current_poll_defers_completion() {
        let config = StreamConfig {
            completion_grace: 0,
            ..StreamConfig::default()
        };
        let mut controller = streaming(config);
        poll(&mut controller, Ok(ChunkPayload::text("a\n", 2)));
        let (_, outcome) = poll(
            &mut controller,
            Ok(ChunkPayload::text("", 2)
                .with_complete(true)
                .with_job(JobStatus::InProgress, None)),
        );
        assert_eq!(outcome, PollOutcome::NoGrowth { cycles: 1 });
        let (_, outcome) = poll(&mut controller, Ok(ChunkPayload::text("", 2).with_complete(true)));
        assert_eq!(outcome, PollOutcome::Completed);
    }

    #[test]
    fn stop_discards_late_result() {
        let mut controller = streaming(StreamConfig::default());
        let Some(ticket) = controller.begin_fetch() else {
            panic!("expected ticket");
        };
        controller.stop();
        let before = controller.state().clone();
        let outcome = controller.apply(ticket, Ok(ChunkPayload::text("late", 4)));
        assert_eq!(outcome, PollOutcome::Discarded);
        assert_eq!(controller.state(), &before);
        assert_eq!(controller.text(), "");
        assert_eq!(controller.phase(), StreamPhase::Idle);

        assert!(controller.start());
        let (offset, _) = poll(&mut controller, Ok(ChunkPayload::text("x", 1)));
        assert_eq!(offset, 0);
    }

    #[test]
    fn external_job_meta_is_used_for_completion() {
        let mut controller = streaming(StreamConfig::default());
        controller.set_job_meta(JobMeta {
            status: JobStatus::Completed,
            conclusion: Some("failure".into()),
        });
        let (_, outcome) = poll(&mut controller, Ok(ChunkPayload::text("x", 1).with_complete(true)));
        assert_eq!(outcome, PollOutcome::Completed);
    }
}
