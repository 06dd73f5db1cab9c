//! Error handling for StudyGroups
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

/// Main error type for StudyGroups application
#[derive(Error, Debug)]
pub enum StudyGroupsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Email API error: {0}")]
    Email(#[from] EmailError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("You have already joined this study group")]
    AlreadyJoined,

    #[error("This study group is now full")]
    GroupFull,

    /// Server-side rejection without a recognised code, shown verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("Study group not found")]
    GroupNotFound { group_id: Uuid },

    #[error("Group not found or access denied")]
    AccessDenied { group_id: Uuid },

    #[error("You are not a member of this study group")]
    NotAMember { group_id: Uuid },

    #[error("Login flow not found or expired")]
    LoginFlowNotFound,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Transactional email API specific errors
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email API request failed: {0}")]
    RequestFailed(String),

    #[error("Email API rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid email API response: {0}")]
    InvalidResponse(String),
}

/// Identity provider specific errors
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity provider request failed: {0}")]
    RequestFailed(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Invalid identity provider response: {0}")]
    InvalidResponse(String),

    #[error("Invalid or expired access token")]
    InvalidToken,
}

/// Result type alias for StudyGroups operations
pub type Result<T> = std::result::Result<T, StudyGroupsError>;

/// Result type alias for email API operations
pub type EmailResult<T> = std::result::Result<T, EmailError>;

/// Result type alias for identity provider operations
pub type IdentityResult<T> = std::result::Result<T, IdentityError>;

impl StudyGroupsError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            StudyGroupsError::Database(_) => false,
            StudyGroupsError::Migration(_) => false,
            StudyGroupsError::Email(_) => true,
            StudyGroupsError::Identity(_) => true,
            StudyGroupsError::Config(_) => false,
            StudyGroupsError::Validation(_) => false,
            StudyGroupsError::AlreadyJoined => false,
            StudyGroupsError::GroupFull => false,
            StudyGroupsError::Rejected(_) => false,
            StudyGroupsError::GroupNotFound { .. } => false,
            StudyGroupsError::AccessDenied { .. } => false,
            StudyGroupsError::NotAMember { .. } => false,
            StudyGroupsError::LoginFlowNotFound => false,
            StudyGroupsError::InvalidStateTransition { .. } => false,
            StudyGroupsError::Redis(_) => true,
            StudyGroupsError::Http(_) => true,
            StudyGroupsError::Serialization(_) => false,
            StudyGroupsError::Io(_) => true,
            StudyGroupsError::UrlParse(_) => false,
            StudyGroupsError::Authentication(_) => false,
            StudyGroupsError::RateLimitExceeded => true,
            StudyGroupsError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            StudyGroupsError::Database(_) => ErrorSeverity::Critical,
            StudyGroupsError::Migration(_) => ErrorSeverity::Critical,
            StudyGroupsError::Config(_) => ErrorSeverity::Critical,
            StudyGroupsError::AccessDenied { .. } => ErrorSeverity::Warning,
            StudyGroupsError::Authentication(_) => ErrorSeverity::Warning,
            StudyGroupsError::RateLimitExceeded => ErrorSeverity::Warning,
            StudyGroupsError::ServiceUnavailable(_) => ErrorSeverity::Warning,
            StudyGroupsError::Validation(_)
            | StudyGroupsError::AlreadyJoined
            | StudyGroupsError::GroupFull
            | StudyGroupsError::Rejected(_)
            | StudyGroupsError::GroupNotFound { .. }
            | StudyGroupsError::NotAMember { .. }
            | StudyGroupsError::LoginFlowNotFound
            | StudyGroupsError::InvalidStateTransition { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status used when the error reaches a handler boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            StudyGroupsError::Validation(_) => StatusCode::BAD_REQUEST,
            StudyGroupsError::AlreadyJoined | StudyGroupsError::GroupFull => StatusCode::CONFLICT,
            StudyGroupsError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StudyGroupsError::GroupNotFound { .. }
            | StudyGroupsError::AccessDenied { .. }
            | StudyGroupsError::NotAMember { .. }
            | StudyGroupsError::LoginFlowNotFound => StatusCode::NOT_FOUND,
            StudyGroupsError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            StudyGroupsError::Authentication(_) => StatusCode::UNAUTHORIZED,
            StudyGroupsError::Identity(IdentityError::Rejected(_)) => StatusCode::BAD_REQUEST,
            StudyGroupsError::Identity(IdentityError::InvalidToken) => StatusCode::UNAUTHORIZED,
            StudyGroupsError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            StudyGroupsError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StudyGroupsError::Identity(_) | StudyGroupsError::Email(_) | StudyGroupsError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the user
    pub fn user_message(&self) -> String {
        if let StudyGroupsError::Identity(inner) = self {
            return inner.to_string();
        }

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => "Something went wrong. Please try again.".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for StudyGroupsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, severity = %self.severity(), "Request failed");
        }

        let body = Json(serde_json::json!({ "error": self.user_message() }));
        (status, body).into_response()
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
