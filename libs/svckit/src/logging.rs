use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

const DEFAULT_LEVEL: &str = "info";
const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Install the global subscriber: plain-text lines on stdout, no colours,
/// full timestamps.
///
/// `RUST_LOG`, when set, takes precedence over `level`. An unknown `level`
/// falls back to `info`. Calling this again after a subscriber is installed
/// is a no-op.
pub fn init_logging(level: &str) {
    let (directive, fallback) = resolve_level(level);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .try_init()
        .is_ok();

    if installed && fallback {
        tracing::info!(requested = %level, "using default log level");
    }
}

/// Normalised level directive and whether the default had to be used.
fn resolve_level(level: &str) -> (&'static str, bool) {
    let wanted = level.trim().to_ascii_lowercase();
    let wanted = match wanted.as_str() {
        "warning" => "warn",
        "fatal" | "panic" => "error",
        other => other,
    };
    LEVELS
        .iter()
        .find(|l| **l == wanted)
        .map_or((DEFAULT_LEVEL, true), |l| (*l, false))
}
