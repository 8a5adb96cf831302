//! Configuration for the `joblog` binary.
//!
//! YAML file with per-section defaults, environment overrides and
//! validation. The library crates never read configuration themselves; they
//! receive the plain [`StreamConfig`] and [`TruncationConfig`] values built
//! here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use joblog_core::TruncationConfig;
use joblog_stream::StreamConfig;
use serde::{Deserialize, Serialize};

pub const ENV_BASE_URL: &str = "JOBLOG_BASE_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "JOBLOG_POLL_INTERVAL_MS";
pub const ENV_LOG_LEVEL: &str = "JOBLOG_LOG_LEVEL";

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stream: StreamSection,
    pub view: ViewSection,
    pub source: SourceSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    pub poll_interval_ms: u64,
    pub stall_threshold: u32,
    pub completion_grace: u32,
}

impl Default for StreamSection {
    fn default() -> Self {
        let defaults = StreamConfig::default();
        Self {
            poll_interval_ms: u64::try_from(defaults.poll_interval.as_millis()).unwrap_or(3000),
            stall_threshold: defaults.stall_threshold,
            completion_grace: defaults.completion_grace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSection {
    pub max_items: usize,
    pub head_items: usize,
    pub tail_items: usize,
    pub color: bool,
    pub timestamps: bool,
}

impl Default for ViewSection {
    fn default() -> Self {
        let defaults = TruncationConfig::default();
        Self {
            max_items: defaults.max_items,
            head_items: defaults.head,
            tail_items: defaults.tail,
            color: true,
            timestamps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    /// Root of the log proxy API. Empty means "not configured".
    pub base_url: String,
    pub timeout_secs: u64,
    pub token: Option<String>,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: 30,
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "console".into(),
        }
    }
}

impl Config {
    /// Load from `explicit` when given, otherwise from the first config file
    /// found in the standard locations, otherwise defaults. Environment
    /// overrides are applied and the result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let path = match explicit {
            Some(path) => Some(PathBuf::from(expand_tilde(&path.display().to_string()))),
            None => find_config_file(),
        };
        let mut cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| format!("read config {}: {err}", path.display()))?;
        Self::from_yaml(&raw).map_err(|err| format!("{}: {err}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|err| format!("parse config: {err}"))
    }

    /// Apply `JOBLOG_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.source.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS).filter(|v| !v.trim().is_empty()) {
            self.stream.poll_interval_ms = raw
                .trim()
                .parse()
                .map_err(|_| format!("{ENV_POLL_INTERVAL_MS} must be a number of milliseconds (got {raw:?})"))?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.logging.level = level.trim().to_string();
        }
        Ok(())
    }

    /// Validates the entire configuration, returning an error message on failure.
    pub fn validate(&self) -> Result<(), String> {
        // Stream
        if self.stream.poll_interval_ms < 100 {
            return Err("stream.poll_interval_ms must be at least 100".into());
        }
        if self.stream.stall_threshold < 1 {
            return Err("stream.stall_threshold must be at least 1".into());
        }

        // View
        if self.view.max_items < 1 {
            return Err("view.max_items must be at least 1".into());
        }
        match self.view.head_items.checked_add(self.view.tail_items) {
            Some(kept) if kept < self.view.max_items => {}
            _ => {
                return Err(
                    "view.head_items + view.tail_items must be less than view.max_items".into(),
                )
            }
        }

        // Source
        if self.source.timeout_secs < 1 {
            return Err("source.timeout_secs must be at least 1".into());
        }
        let base = self.source.base_url.trim();
        if !base.is_empty() && !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err("source.base_url must start with http:// or https://".into());
        }

        // Logging
        match self.logging.level.to_lowercase().trim() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err("logging.level must be one of trace, debug, info, warn, error".into())
            }
        }
        match self.logging.format.to_lowercase().trim() {
            "console" | "json" => {}
            _ => return Err("logging.format must be one of console, json".into()),
        }
        Ok(())
    }

    #[must_use]
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            poll_interval: Duration::from_millis(self.stream.poll_interval_ms),
            stall_threshold: self.stream.stall_threshold,
            completion_grace: self.stream.completion_grace,
        }
    }

    #[must_use]
    pub fn truncation(&self) -> TruncationConfig {
        TruncationConfig {
            max_items: self.view.max_items,
            head: self.view.head_items,
            tail: self.view.tail_items,
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// File lookup
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if path == "~" {
        return home_dir().display().to_string();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home_dir().join(rest).display().to_string();
    }
    path.to_string()
}

/// Search for `config.yaml` in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths()
        .into_iter()
        .map(|dir| dir.join("config.yaml"))
        .find(|candidate| candidate.is_file())
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            paths.push(Path::new(&xdg).join("joblog"));
        }
    }
    let home = home_dir();
    if home.as_os_str() != "" {
        paths.push(home.join(".config/joblog"));
    }
    paths
}

fn home_dir() -> PathBuf {
    #[allow(deprecated)]
    std::env::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.stream.poll_interval_ms, 3000);
        assert_eq!(cfg.stream.stall_threshold, 10);
        assert_eq!(cfg.view.max_items, 1000);
        assert_eq!(cfg.view.head_items, 250);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.validate().is_ok(), "default config must validate");
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let cfg = Config::from_yaml(
            "stream:\n  poll_interval_ms: 500\nsource:\n  base_url: https://ci.example.com/api\n",
        )
        .unwrap();
        assert_eq!(cfg.stream.poll_interval_ms, 500);
        assert_eq!(cfg.stream.completion_grace, 3);
        assert_eq!(cfg.source.base_url, "https://ci.example.com/api");
        assert_eq!(cfg.source.timeout_secs, 30);
        assert!(cfg.view.color);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let err = Config::from_yaml("stream: [").unwrap_err();
        assert!(err.starts_with("parse config"), "{err}");
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[
            (ENV_BASE_URL, " http://localhost:8080 "),
            (ENV_POLL_INTERVAL_MS, "250"),
            (ENV_LOG_LEVEL, "debug"),
        ]))
        .unwrap();
        assert_eq!(cfg.source.base_url, "http://localhost:8080");
        assert_eq!(cfg.stream.poll_interval_ms, 250);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn env_poll_interval_must_be_numeric() {
        let mut cfg = Config::default();
        let err = cfg.apply_env(env(&[(ENV_POLL_INTERVAL_MS, "soon")])).unwrap_err();
        assert!(err.contains(ENV_POLL_INTERVAL_MS));
    }

    #[test]
    fn validate_poll_interval_floor() {
        let mut cfg = Config::default();
        cfg.stream.poll_interval_ms = 50;
        assert_eq!(
            cfg.validate().unwrap_err(),
            "stream.poll_interval_ms must be at least 100"
        );
    }

    #[test]
    fn validate_window_fits_budget() {
        let mut cfg = Config::default();
        cfg.view.max_items = 500;
        assert!(cfg.validate().unwrap_err().contains("view.head_items"));
    }

    #[test]
    fn validate_rejects_overflowing_window() {
        let cfg =
            Config::from_yaml("view:\n  head_items: 18446744073709551615\n  tail_items: 1\n")
                .unwrap();
        assert!(cfg.validate().unwrap_err().contains("view.head_items"));
    }

    #[test]
    fn validate_rejects_bad_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn validate_rejects_bad_log_format() {
        let mut cfg = Config::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.validate().unwrap_err().contains("logging.format"));
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let mut cfg = Config::default();
        cfg.source.base_url = "ftp://ci".into();
        assert!(cfg.validate().unwrap_err().contains("source.base_url"));
    }

    #[test]
    fn library_configs_are_derived() {
        let mut cfg = Config::default();
        cfg.stream.poll_interval_ms = 1500;
        cfg.view.head_items = 10;
        assert_eq!(cfg.stream_config().poll_interval, Duration::from_millis(1500));
        assert_eq!(cfg.truncation().head, 10);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "view:\n  color: false\n").unwrap();
        let cfg = Config::from_file(&path).unwrap();
        assert!(!cfg.view.color);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::from_file(Path::new("/nonexistent/joblog.yaml")).unwrap_err();
        assert!(err.starts_with("read config"));
    }

    #[test]
    fn expand_tilde_works() {
        let home = home_dir();
        assert_eq!(expand_tilde("~/x.yaml"), home.join("x.yaml").display().to_string());
        assert_eq!(expand_tilde("/etc/x.yaml"), "/etc/x.yaml");
    }
}
