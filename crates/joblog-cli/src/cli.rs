//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Follow and render CI job logs.
#[derive(Parser, Debug, Clone)]
#[command(name = "joblog", version, about = "Follow and render CI job logs")]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/joblog/config.yaml or ~/.config/joblog/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colors
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Show line timestamps
    #[arg(long, global = true)]
    pub timestamps: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Stream a job log as it grows
    Follow(FollowArgs),
    /// Render a saved log
    Render(RenderArgs),
    /// Print annotations found in a saved log as JSON
    Annotations(AnnotationsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FollowArgs {
    /// Job identifier
    pub job_id: String,

    /// Read a local file that is being appended to instead of the HTTP source
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Log proxy base URL (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Poll interval in milliseconds (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Highlight this text in printed lines
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Log file
    pub path: PathBuf,

    /// Highlight this text and report the number of matches
    #[arg(long)]
    pub search: Option<String>,

    /// Focus this 1-based source line, expanding its group
    #[arg(long, value_name = "LINE")]
    pub jump: Option<usize>,

    /// Disable head/tail truncation
    #[arg(long)]
    pub show_all: bool,

    /// Expand every group
    #[arg(long)]
    pub expand_all: bool,

    /// Expand the groups with this name (repeatable)
    #[arg(long = "expand", value_name = "GROUP")]
    pub expand: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AnnotationsArgs {
    /// Log file
    pub path: PathBuf,
}
