//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{Result, StudyGroupsError};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_auth_config(&settings.auth)?;
    validate_email_config(&settings.email)?;
    validate_search_config(&settings.search)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(StudyGroupsError::Config("Server port must be greater than 0".to_string()));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(StudyGroupsError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(StudyGroupsError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(StudyGroupsError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(StudyGroupsError::Config("Redis URL is required".to_string()));
    }

    Ok(())
}

/// Validate identity provider configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.provider_url.is_empty() {
        return Err(StudyGroupsError::Config("Identity provider URL is required".to_string()));
    }

    url::Url::parse(&config.provider_url)
        .map_err(|e| StudyGroupsError::Config(format!("Invalid identity provider URL: {}", e)))?;
    url::Url::parse(&config.redirect_url)
        .map_err(|e| StudyGroupsError::Config(format!("Invalid magic link redirect URL: {}", e)))?;

    if config.timeout_seconds == 0 {
        return Err(StudyGroupsError::Config(
            "Identity provider timeout must be greater than 0".to_string(),
        ));
    }

    if config.otp_requests_per_minute == 0 {
        return Err(StudyGroupsError::Config(
            "OTP requests per minute must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate email configuration; credentials are only needed when sending is enabled
fn validate_email_config(config: &super::EmailConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.api_key.is_empty() {
        return Err(StudyGroupsError::Config(
            "Email API key is required when email is enabled".to_string(),
        ));
    }

    if config.from_address.is_empty() {
        return Err(StudyGroupsError::Config("Email from address is required".to_string()));
    }

    Ok(())
}

fn validate_search_config(config: &super::SearchConfig) -> Result<()> {
    if config.debounce_ms == 0 {
        return Err(StudyGroupsError::Config(
            "Search debounce must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(StudyGroupsError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(StudyGroupsError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}
