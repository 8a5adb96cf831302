//! Subcommand implementations.

use std::io::{self, Write};
use std::path::Path;

use joblog_core::{parse_annotations, LogView, SearchPattern};
use joblog_stream::{
    follow as follow_stream, ChunkSource, FileChunkSource, FollowExit, HttpChunkSource,
    PollOutcome, StreamController,
};
use tokio_util::sync::CancellationToken;

use crate::cli::{AnnotationsArgs, FollowArgs, RenderArgs};
use crate::config::Config;
use crate::render::{write_annotations, write_snapshot, RenderOptions, TailPrinter};

fn write_failed(err: io::Error) -> String {
    format!("write output: {err}")
}

fn read_log(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|err| format!("read {}: {err}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// follow
// ---------------------------------------------------------------------------

/// Stream the log of `args.job_id` until it completes or Ctrl-C.
pub fn follow<W: Write>(
    cfg: &Config,
    args: &FollowArgs,
    opts: RenderOptions,
    out: &mut W,
) -> Result<FollowExit, String> {
    let mut cfg = cfg.clone();
    if let Some(url) = &args.base_url {
        cfg.source.base_url = url.trim().to_string();
    }
    if let Some(interval) = args.interval_ms {
        cfg.stream.poll_interval_ms = interval;
    }
    cfg.validate()?;

    let source: Box<dyn ChunkSource> = match &args.file {
        Some(path) => Box::new(FileChunkSource::new(path)),
        None => {
            if cfg.source.base_url.is_empty() {
                return Err(
                    "no log source: set source.base_url, JOBLOG_BASE_URL or --base-url, or pass --file"
                        .into(),
                );
            }
            let mut http =
                HttpChunkSource::new(&cfg.source.base_url).with_timeout(cfg.request_timeout());
            if let Some(token) = &cfg.source.token {
                http = http.with_token(token);
            }
            Box::new(http)
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("start async runtime: {err}"))?;

    runtime.block_on(async {
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received");
                interrupt.cancel();
            }
        });

        let mut controller = StreamController::new(&args.job_id, cfg.stream_config());
        let search = args.search.as_deref().and_then(SearchPattern::new);
        let mut printer = TailPrinter::new(opts, search);
        let exit = stream_to(&mut controller, source.as_ref(), cancel, &mut printer, out).await?;
        write_follow_summary(out, &controller, exit, opts).map_err(write_failed)?;
        Ok::<_, String>(exit)
    })
}

/// Drive `controller` against `source`, printing lines as they complete.
pub async fn stream_to<W: Write>(
    controller: &mut StreamController,
    source: &dyn ChunkSource,
    cancel: CancellationToken,
    printer: &mut TailPrinter,
    out: &mut W,
) -> Result<FollowExit, String> {
    let stall_threshold = controller.config().stall_threshold;
    let mut write_error = None;

    let exit = follow_stream(controller, source, cancel, |controller, outcome| {
        match outcome {
            PollOutcome::Reset { .. } => printer.reset(),
            PollOutcome::NotYetAvailable if controller.state().cycles_without_growth == 1 => {
                tracing::info!(
                    job_id = %controller.job_id(),
                    "{}",
                    controller.message().unwrap_or("log not available yet")
                );
            }
            PollOutcome::NoGrowth { cycles } if *cycles == stall_threshold => {
                if let Some(message) = controller.message() {
                    tracing::warn!(job_id = %controller.job_id(), "{message}");
                }
            }
            _ => {}
        }
        let finished = matches!(outcome, PollOutcome::Completed);
        if let Err(err) = printer.update(out, controller.text(), finished) {
            write_error = Some(err);
            controller.stop();
        }
    })
    .await;

    match write_error {
        Some(err) => Err(write_failed(err)),
        None => Ok(exit),
    }
}

fn write_follow_summary<W: Write>(
    out: &mut W,
    controller: &StreamController,
    exit: FollowExit,
    opts: RenderOptions,
) -> io::Result<()> {
    let annotations = parse_annotations(controller.text());
    if !annotations.is_empty() {
        writeln!(out)?;
        write_annotations(out, &annotations, opts)?;
    }

    let mut status = format!("job {}: {}", controller.job_id(), controller.phase().label());
    if let Some(job) = controller.job() {
        status.push_str(&format!(" ({}", job.status.label()));
        if let Some(conclusion) = &job.conclusion {
            status.push_str(&format!(", {conclusion}"));
        }
        status.push(')');
    }
    if exit == FollowExit::Cancelled {
        status.push_str(", interrupted");
    }
    if let Some(err) = controller.last_error() {
        status.push_str(&format!(", last error: {err}"));
    }
    writeln!(out, "{status}")?;
    out.flush()
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

pub fn render<W: Write>(
    cfg: &Config,
    args: &RenderArgs,
    opts: RenderOptions,
    out: &mut W,
) -> Result<(), String> {
    let text = read_log(&args.path)?;
    let mut view = LogView::new(cfg.truncation());
    if let Some(term) = &args.search {
        view.set_search(term);
    }
    if args.expand_all {
        view.expand_all();
    } else if !args.expand.is_empty() {
        let groups = view.snapshot(&text).groups;
        for (position, group) in groups.iter().enumerate() {
            if !group.expanded && args.expand.contains(&group.name) {
                view.toggle_group(position);
            }
        }
    }
    if args.show_all {
        view.show_all();
    }
    if let Some(line) = args.jump {
        let index = line
            .checked_sub(1)
            .ok_or_else(|| "--jump line numbers start at 1".to_string())?;
        view.jump_to_line(&text, index)
            .ok_or_else(|| format!("line {line} is past the end of the log"))?;
    }

    let snapshot = view.snapshot(&text);
    write_snapshot(out, &snapshot, opts).map_err(write_failed)?;
    if let Some(term) = view.search_term() {
        let noun = if snapshot.match_count == 1 { "match" } else { "matches" };
        writeln!(out, "{} {noun} for {term:?}", snapshot.match_count).map_err(write_failed)?;
    }
    if !snapshot.annotations.is_empty() {
        writeln!(out).map_err(write_failed)?;
        write_annotations(out, &snapshot.annotations, opts).map_err(write_failed)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// annotations
// ---------------------------------------------------------------------------

pub fn annotations<W: Write>(args: &AnnotationsArgs, out: &mut W) -> Result<(), String> {
    let text = read_log(&args.path)?;
    let json = serde_json::to_string_pretty(&parse_annotations(&text))
        .map_err(|err| format!("encode annotations: {err}"))?;
    writeln!(out, "{json}").map_err(write_failed)
}
