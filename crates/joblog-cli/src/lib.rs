//! `joblog` command-line front end.
//!
//! Loads configuration, installs logging and dispatches to the subcommands
//! in [`commands`]. Everything writes to caller-supplied writers so the
//! whole binary can be driven from tests.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod render;

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};

use clap::Parser;
use joblog_stream::FollowExit;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::render::RenderOptions;

/// Exit status after Ctrl-C, as shells report SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

pub fn run_from_env() -> i32 {
    let color_capable = io::stdout().is_terminal();
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_with_args(
        std::env::args_os(),
        &mut stdout.lock(),
        &mut stderr.lock(),
        color_capable,
    )
}

/// Parse `args` and run. `color_capable` is false when stdout is not a
/// terminal; colors are then off regardless of configuration.
pub fn run_with_args<I, T, W, E>(args: I, out: &mut W, err: &mut E, color_capable: bool) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(parse_err) => {
            let rendered = parse_err.render().to_string();
            let _ = if parse_err.use_stderr() {
                write!(err, "{rendered}")
            } else {
                write!(out, "{rendered}")
            };
            return parse_err.exit_code();
        }
    };

    let cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            return 1;
        }
    };
    if let Err(message) = logging::init(&cfg.logging.level, &cfg.logging.format) {
        tracing::debug!(error = %message, "logging already initialised");
    }

    let opts = RenderOptions {
        color: color_capable && cfg.view.color && !cli.no_color,
        timestamps: cli.timestamps || cfg.view.timestamps,
    };

    let result = match &cli.command {
        Command::Follow(args) => commands::follow(&cfg, args, opts, out).map(|exit| match exit {
            FollowExit::Cancelled => EXIT_INTERRUPTED,
            FollowExit::Completed | FollowExit::Stopped => 0,
        }),
        Command::Render(args) => commands::render(&cfg, args, opts, out).map(|()| 0),
        Command::Annotations(args) => commands::annotations(args, out).map(|()| 0),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::debug!(error = %message, "command failed");
            let _ = writeln!(err, "error: {message}");
            1
        }
    }
}
