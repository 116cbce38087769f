use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::CoreConfig;

/// Install the global tracing subscriber.
///
/// The dashboard owns the terminal, so everything goes to a daily rolling file
/// under `config.log_dir`. `RUST_LOG` wins over `KDASH_LOG_LEVEL` when set.
/// Keep the returned guard alive for the lifetime of the process; dropping it
/// flushes pending lines.
pub fn init_logging(config: &CoreConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create log dir {:?}", config.log_dir))?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, "kdash.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_the_configured_directory() {
        let dir = std::env::temp_dir().join(format!("kdash-logs-{}", uuid::Uuid::new_v4()));
        let config = CoreConfig {
            log_dir: dir.clone(),
            log_level: "debug".into(),
            ..CoreConfig::default()
        };

        let guard = init_logging(&config).unwrap();
        tracing::info!(target: "kdash_core", "hello from the test");
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(&dir).unwrap().flatten().collect();
        assert!(files.iter().any(|f| f.file_name().to_string_lossy().starts_with("kdash.log")));
        let _ = std::fs::remove_dir_all(dir);
    }
}
