use snafu::ResultExt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{registry, EnvFilter};

use crate::config::Config;
use crate::error::{ApplicationError, InitializeLoggerSnafu};

const LOG_FILE: &str = "watchtrack.log";
const DEFAULT_DIRECTIVE: &str = "watchtrack=info,warn";

/// Filter from `RUST_LOG`, falling back to info for this crate and warnings for dependencies.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Log pretty events to stderr and JSON events, with their reconcile/session spans, to a daily
/// rolling file in `log_dir`.
///
/// The returned guard flushes the file writer when dropped, keep it alive until exit.
pub fn init(config: &Config) -> Result<WorkerGuard, ApplicationError> {
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.log_dir, LOG_FILE));

    let events = layer()
        .json()
        .with_ansi(false)
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(writer);

    registry()
        .with(env_filter())
        .with(layer().pretty().with_writer(std::io::stderr))
        .with(events)
        .try_init()
        .context(InitializeLoggerSnafu)?;

    Ok(guard)
}
