//! Tracing subscriber initialization

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`; falls back to `info` for workspace crates and `warn`
/// elsewhere. Safe to call more than once (subsequent calls are no-ops).
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,server={lvl},agent={lvl},graphstore={lvl},sandbox={lvl},sync={lvl},metadata={lvl},okta_client={lvl},llm={lvl}",
            lvl = default_level
        ))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
