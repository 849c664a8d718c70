use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Env var that overrides the log filter (e.g. `WAVCHOP_LOG=wavchop=debug`).
pub const LOG_ENV_VAR: &str = "WAVCHOP_LOG";

/// Initialize structured JSON logging on stderr.
///
/// Defaults to `warn` level unless overridden by `WAVCHOP_LOG`.
pub fn init() {
    init_with_default(LevelFilter::WARN);
}

/// Same as [`init`], with a caller-chosen default level (used by `--verbose`).
pub fn init_with_default(default_level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init();
}
