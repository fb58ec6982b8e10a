//! Logging configuration for ragchat

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{
    self,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::config::LoggingConfig;
use crate::Result;

const LOG_FILE_PREFIX: &str = "ragchat.log";

/// Initialize logging with configuration
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// flushes the file writer and must be kept alive for the life of the process.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.level)));
    install(env_filter, &config.directory)
}

/// Initialize logging with custom log level
pub fn init_logging_with_level(level: &str, directory: &str) -> Result<WorkerGuard> {
    install(EnvFilter::new(filter_directive(level)), directory)
}

/// Initialize simple console logging for tests; repeated calls are ignored
pub fn init_simple_logging() {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

fn filter_directive(level: &str) -> String {
    format!("{level},ragchat={level}")
}

fn install(env_filter: EnvFilter, directory: &str) -> Result<WorkerGuard> {
    // Create logs directory if it doesn't exist
    let logs_dir = Path::new(directory);
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_ansi(false); // No colors in file

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::RagChatError::Custom(format!("Failed to initialize logging: {e}")))?;

    tracing::info!(
        "Log files will be saved to: {}/{}.YYYY-MM-DD",
        directory,
        LOG_FILE_PREFIX
    );

    Ok(guard)
}
