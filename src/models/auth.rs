//! Identity and session models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::validation::normalize_email;

/// User record as reported by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityUser {
    pub id: String,
    pub email: Option<String>,
}

/// Token response of the identity provider
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
    pub expires_at: Option<i64>,
    pub user: IdentityUser,
}

/// An established organizer session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: IdentityUser,
}

impl AuthSession {
    pub fn from_token_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let expires_at = response
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| response.expires_in.map(|secs| now + Duration::seconds(secs)));

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at,
            user: response.user,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }

    pub fn email(&self) -> Option<String> {
        self.user.email.as_deref().map(normalize_email)
    }
}

/// The authenticated owner of study groups, resolved from an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organizer {
    pub user_id: String,
    /// Normalized email used as the ownership key
    pub email: String,
}

impl Organizer {
    pub fn new(user_id: impl Into<String>, email: &str) -> Self {
        Self {
            user_id: user_id.into(),
            email: normalize_email(email),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_session_expiry_prefers_absolute_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap();
        let response = TokenResponse {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: Some(3600),
            expires_at: Some(now.timestamp() + 60),
            user: IdentityUser {
                id: "user-1".to_string(),
                email: Some("Org@Columbia.edu".to_string()),
            },
        };

        let session = AuthSession::from_token_response(response, now);
        assert_eq!(session.expires_at, Some(now + Duration::seconds(60)));
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::seconds(61)));
        assert_eq!(session.email().as_deref(), Some("org@columbia.edu"));
    }

    #[test]
    fn test_session_expiry_from_relative_lifetime() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap();
        let response = TokenResponse {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: Some(3600),
            expires_at: None,
            user: IdentityUser { id: "user-1".to_string(), email: None },
        };

        let session = AuthSession::from_token_response(response, now);
        assert_eq!(session.expires_at, Some(now + Duration::hours(1)));
        assert_eq!(session.email(), None);
    }
}
