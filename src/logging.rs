//! # Structured Logging Module
//!
//! Environment-aware structured logging. The level comes from `RUST_LOG` when
//! set, otherwise from the environment name (`SQLKIT_ENV`, then `APP_ENV`).
//! Output is human-readable unless `SQLKIT_LOG_FORMAT=json`.

use crate::constants::env_vars;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var(env_vars::SQLKIT_LOG_FORMAT) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    init_with_format(LogFormat::from_env());
}

/// Initialize logging with an explicit output format. Only the first call in a
/// process has any effect.
pub fn init_with_format(format: LogFormat) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = match format {
            LogFormat::Json => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .boxed(),
        };

        // Another subscriber (e.g. from a host application) may already be installed
        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            format = ?format,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Current environment name, lowercased
pub fn get_environment() -> String {
    std::env::var(env_vars::SQLKIT_ENV)
        .or_else(|_| std::env::var(env_vars::APP_ENV))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

/// Default log level for an environment
pub fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "warn",
        _ => "debug",
    }
}

/// Log structured data for a database operation
pub fn log_query_operation(
    operation: &str,
    connection: &str,
    status: &str,
    rows_affected: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        connection = %connection,
        status = %status,
        rows_affected = rows_affected,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🗄️ QUERY_OPERATION"
    );
}
