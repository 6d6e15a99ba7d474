//! Logging initialization for processes embedding the search engine
//!
//! Supports JSON or human-readable output, optional rolling file output and
//! `RUST_LOG` overrides.

use std::fs;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the non-blocking file writer flushing; must be kept alive for the program duration.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging from `LoggingConfig`.
///
/// Fails if a global subscriber is already installed or the log directory cannot be created.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config)];
    let file_guard = if config.file_enabled {
        let (writer, guard) = create_file_appender(config)?;
        layers.push(file_layer(config, writer));
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter(config))
        .try_init()?;

    tracing::info!(
        level = %config.level,
        json = config.json,
        file = config.file_enabled,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn console_layer(config: &LoggingConfig) -> BoxedLayer {
    if config.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stdout)
            .boxed()
    }
}

fn file_layer(config: &LoggingConfig, writer: NonBlocking) -> BoxedLayer {
    if config.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer().with_ansi(false).with_writer(writer).boxed()
    }
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // sqlx logs every statement at info
        EnvFilter::new(format!("labsearch={},sqlx=warn", config.level))
    })
}

fn create_file_appender(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.file_directory)?;

    let file_appender = match config.file_rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.file_directory, &config.file_prefix),
        "minutely" => {
            tracing_appender::rolling::minutely(&config.file_directory, &config.file_prefix)
        }
        "never" => tracing_appender::rolling::never(
            &config.file_directory,
            format!("{}.log", config.file_prefix),
        ),
        _ => tracing_appender::rolling::daily(&config.file_directory, &config.file_prefix),
    };

    Ok(tracing_appender::non_blocking(file_appender))
}
