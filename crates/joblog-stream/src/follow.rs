//! Async driver that polls a [`ChunkSource`] on a fixed cadence.
//!
//! The only suspension points are the timer and the fetch itself. The
//! interval skips missed ticks, so a tick that would fire while a fetch is
//! still outstanding is dropped rather than queued. Cancelling the token
//! drops the in-flight fetch future; its result is never applied.

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::controller::{PollOutcome, StreamController, StreamPhase};
use crate::source::ChunkSource;

/// Why [`follow`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowExit {
    Completed,
    Cancelled,
    /// Streaming was disabled from the callback.
    Stopped,
}

/// Perform one tick: fetch at the current offset and apply the result.
/// `None` when the controller refused the tick.
pub async fn poll_once(
    controller: &mut StreamController,
    source: &dyn ChunkSource,
) -> Option<PollOutcome> {
    let ticket = controller.begin_fetch()?;
    let job_id = controller.job_id().to_string();
    let result = source.fetch_chunk(&job_id, ticket.offset()).await;
    Some(controller.apply(ticket, result))
}

/// Poll until the stream completes, the callback stops it, or `cancel`
/// fires. The first fetch happens immediately.
///
/// `on_poll` runs after every applied result. Calling
/// [`StreamController::stop`] from it ends the loop.
pub async fn follow<F>(
    controller: &mut StreamController,
    source: &dyn ChunkSource,
    cancel: CancellationToken,
    mut on_poll: F,
) -> FollowExit
where
    F: FnMut(&mut StreamController, &PollOutcome),
{
    if !controller.start() {
        return FollowExit::Completed;
    }
    let mut ticker = tokio::time::interval(controller.config().poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                controller.stop();
                return FollowExit::Cancelled;
            }
            _ = ticker.tick() => {}
        }

        let Some(ticket) = controller.begin_fetch() else {
            if !controller.is_streaming() {
                return FollowExit::Stopped;
            }
            continue;
        };
        let job_id = controller.job_id().to_string();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                controller.stop();
                return FollowExit::Cancelled;
            }
            result = source.fetch_chunk(&job_id, ticket.offset()) => result,
        };

        let outcome = controller.apply(ticket, result);
        on_poll(controller, &outcome);
        if controller.phase() == StreamPhase::Completed {
            return FollowExit::Completed;
        }
        if !controller.is_streaming() {
            return FollowExit::Stopped;
        }
    }
}
