#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use joblog_cli::commands::stream_to;
use joblog_cli::render::{RenderOptions, TailPrinter};
use joblog_stream::{
    ChunkPayload, FetchError, FollowExit, JobStatus, MockChunkSource, StreamConfig,
    StreamController,
};
use tokio_util::sync::CancellationToken;

fn plain() -> RenderOptions {
    RenderOptions {
        color: false,
        timestamps: false,
    }
}

fn controller() -> StreamController {
    StreamController::new(
        "7",
        StreamConfig {
            poll_interval: Duration::from_millis(100),
            stall_threshold: 2,
            completion_grace: 1,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn prints_lines_once_as_they_complete() {
    let source = MockChunkSource::new(vec![
        Err(FetchError::NotFound),
        Ok(ChunkPayload::text("##[group]Build\ncargo bu", 23).with_job(JobStatus::InProgress, None)),
        Ok(ChunkPayload::text("ild\n", 27)),
        Ok(ChunkPayload::text("", 27)),
        Ok(ChunkPayload::text("##[endgroup]\nok", 42)
            .with_complete(true)
            .with_job(JobStatus::Completed, Some("success"))),
    ]);
    let mut controller = controller();
    let mut printer = TailPrinter::new(plain(), None);
    let mut out = Vec::new();

    let exit = stream_to(
        &mut controller,
        &source,
        CancellationToken::new(),
        &mut printer,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(exit, FollowExit::Completed);
    assert_eq!(source.requested_offsets(), vec![0, 0, 23, 27, 27]);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "\u{25be} Build\n  cargo build\nok\n"
    );
}

#[tokio::test(start_paused = true)]
async fn restarted_log_is_printed_again() {
    let source = MockChunkSource::new(vec![
        Ok(ChunkPayload::text("attempt 1\n", 10)),
        Ok(ChunkPayload::text("", 2)),
        Ok(ChunkPayload::text("a2\n", 3)
            .with_complete(true)
            .with_job(JobStatus::Completed, Some("failure"))),
    ]);
    let mut controller = controller();
    let mut printer = TailPrinter::new(plain(), None);
    let mut out = Vec::new();

    let exit = stream_to(
        &mut controller,
        &source,
        CancellationToken::new(),
        &mut printer,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(exit, FollowExit::Completed);
    assert_eq!(String::from_utf8(out).unwrap(), "attempt 1\na2\n");
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_prints_nothing() {
    let source = MockChunkSource::new(vec![Ok(ChunkPayload::text("late\n", 5))]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut controller = controller();
    let mut printer = TailPrinter::new(plain(), None);
    let mut out = Vec::new();

    let exit = stream_to(&mut controller, &source, cancel, &mut printer, &mut out)
        .await
        .unwrap();

    assert_eq!(exit, FollowExit::Cancelled);
    assert!(out.is_empty());
    assert!(source.requested_offsets().is_empty());
}
