//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub email: EmailConfig,
    pub campus: CampusConfig,
    pub search: SearchConfig,
    pub cleanup: CleanupConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS; empty means any origin
    pub allowed_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Hosted identity provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Base URL of the provider, e.g. `https://project.supabase.co`
    pub provider_url: String,
    pub anon_key: String,
    /// HS256 secret used to verify access tokens locally; falls back to
    /// asking the provider when absent
    pub jwt_secret: Option<String>,
    /// Where magic links send the browser back to
    pub redirect_url: String,
    pub timeout_seconds: u64,
    pub login_flow_ttl_seconds: u64,
    pub otp_requests_per_minute: u32,
}

/// Transactional email configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
    pub timeout_seconds: u64,
}

/// Campus-specific display settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CampusConfig {
    pub name: String,
    pub app_name: String,
    pub public_url: String,
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    pub debounce_ms: u64,
}

/// Expired group cleanup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    pub interval_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub file_name: String,
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub realtime: bool,
    pub cleanup_job: bool,
    pub magic_link: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("STUDYGROUPS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::StudyGroupsError> {
        super::validation::validate_settings(self)
    }

    /// Socket address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                allowed_origins: vec![],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/study_groups".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "studygroups:".to_string(),
                ttl_seconds: 3600,
            },
            auth: AuthConfig {
                provider_url: "http://localhost:54321".to_string(),
                anon_key: String::new(),
                jwt_secret: None,
                redirect_url: "http://localhost:5173/auth/callback".to_string(),
                timeout_seconds: 10,
                login_flow_ttl_seconds: 900,
                otp_requests_per_minute: 5,
            },
            email: EmailConfig {
                enabled: false,
                api_url: "https://api.resend.com".to_string(),
                api_key: String::new(),
                from_address: "CU Study Groups <noreply@resend.dev>".to_string(),
                timeout_seconds: 10,
            },
            campus: CampusConfig {
                name: "Columbia University".to_string(),
                app_name: "CU Study Groups".to_string(),
                public_url: "http://localhost:5173".to_string(),
            },
            search: SearchConfig { debounce_ms: 300 },
            cleanup: CleanupConfig { interval_seconds: 900 },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                file_name: "study-groups.log".to_string(),
                json: false,
            },
            features: FeaturesConfig {
                realtime: true,
                cleanup_job: true,
                magic_link: true,
            },
        }
    }
}
