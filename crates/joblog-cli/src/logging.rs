//! Diagnostic logging to stderr.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
/// Calling this twice reports an error instead of panicking.
pub fn init(level: &str, format: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|err| format!("init logging: {err}"))
}
