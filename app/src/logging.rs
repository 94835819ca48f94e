// In app/src/logging.rs

use app_config::types::AppSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber: human-readable output on stdout and a
/// daily rolling file under `log_dir`.
///
/// `RUST_LOG` wins over `app.log_level` when set. The returned guard flushes
/// the file writer on drop, so keep it alive for the whole run.
pub fn init(settings: &AppSettings) -> anyhow::Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))?
        // sqlx logs every statement at INFO.
        .add_directive("sqlx::query=warn".parse()?);

    std::fs::create_dir_all(&settings.log_dir)?;
    let file = tracing_appender::rolling::daily(&settings.log_dir, "tradebot.log");
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    Ok(guard)
}
