//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the StudyGroups application.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::utils::errors::{Result, StudyGroupsError};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false));

    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
            .try_init()
    };

    result.map_err(|e| StudyGroupsError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log organizer actions on a study group
pub fn log_group_action(group_id: Uuid, action: &str, organizer_email: &str, details: Option<&str>) {
    info!(
        group_id = %group_id,
        action = action,
        organizer = organizer_email,
        details = details,
        "Study group action performed"
    );
}

/// Log participants joining or leaving
pub fn log_participant_action(group_id: Uuid, action: &str, email: &str) {
    info!(
        group_id = %group_id,
        action = action,
        email = email,
        "Participant action performed"
    );
}

/// Log login flow events
pub fn log_auth_event(email: &str, event: &str, success: bool) {
    if success {
        info!(email = email, event = event, "Auth event");
    } else {
        warn!(email = email, event = event, "Auth event failed");
    }
}

/// Log API errors with context
pub fn log_api_error(api: &str, error: &str, context: Option<&str>) {
    error!(
        api = api,
        error = error,
        context = context,
        "API error occurred"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
