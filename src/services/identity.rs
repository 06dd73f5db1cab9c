//! Hosted identity provider client
//!
//! Thin wrapper over a GoTrue-compatible auth API: passwordless email
//! codes, magic links, token verification, refresh and logout.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::AuthConfig;
use crate::models::auth::{AuthSession, IdentityUser, TokenResponse};
use crate::utils::errors::{IdentityError, IdentityResult, Result, StudyGroupsError};

/// Error payloads vary between provider versions
#[derive(Debug, Deserialize)]
struct ProviderError {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ProviderError {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

#[derive(Clone, Debug)]
pub struct IdentityClient {
    client: Client,
    config: AuthConfig,
}

impl IdentityClient {
    pub fn new(config: AuthConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("StudyGroups/1.0")
            .build()
            .map_err(StudyGroupsError::Http)?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.provider_url.trim_end_matches('/'), path)
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.config.anon_key)
    }

    async fn send(&self, request: RequestBuilder) -> IdentityResult<Response> {
        let response = self
            .with_api_key(request)
            .send()
            .await
            .map_err(|e| IdentityError::RequestFailed(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ProviderError>(&body)
            .ok()
            .and_then(ProviderError::into_message)
            .unwrap_or_else(|| format!("HTTP {}", status));

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            debug!(status = %status, message = %message, "Identity provider refused token");
        }

        Err(IdentityError::Rejected(message))
    }

    /// Email an eight digit login code, creating the account on first use
    pub async fn send_otp(&self, email: &str) -> IdentityResult<()> {
        debug!(email = %email, "Requesting login code");

        let request = self
            .client
            .post(self.endpoint("otp"))
            .json(&serde_json::json!({ "email": email, "create_user": true }));

        self.send(request).await?;
        Ok(())
    }

    /// Email a magic link that returns the browser to the configured redirect URL
    pub async fn send_magic_link(&self, email: &str) -> IdentityResult<()> {
        debug!(email = %email, "Requesting magic link");

        let request = self
            .client
            .post(self.endpoint("otp"))
            .query(&[("redirect_to", self.config.redirect_url.as_str())])
            .json(&serde_json::json!({ "email": email, "create_user": true }));

        self.send(request).await?;
        Ok(())
    }

    /// Exchange an emailed code for a session
    pub async fn verify_otp(&self, email: &str, code: &str) -> IdentityResult<AuthSession> {
        let request = self
            .client
            .post(self.endpoint("verify"))
            .json(&serde_json::json!({ "type": "email", "email": email, "token": code }));

        let tokens: TokenResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

        Ok(AuthSession::from_token_response(tokens, Utc::now()))
    }

    /// Resolve the user behind an access token
    pub async fn get_user(&self, access_token: &str) -> IdentityResult<IdentityUser> {
        let request = self.client.get(self.endpoint("user")).bearer_auth(access_token);

        match self.send(request).await {
            Ok(response) => response
                .json()
                .await
                .map_err(|e| IdentityError::InvalidResponse(e.to_string())),
            Err(IdentityError::Rejected(_)) => Err(IdentityError::InvalidToken),
            Err(e) => Err(e),
        }
    }

    /// Obtain a fresh session from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> IdentityResult<AuthSession> {
        let request = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }));

        let tokens: TokenResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;

        Ok(AuthSession::from_token_response(tokens, Utc::now()))
    }

    pub async fn logout(&self, access_token: &str) -> IdentityResult<()> {
        let request = self.client.post(self.endpoint("logout")).bearer_auth(access_token);

        self.send(request).await?;
        Ok(())
    }
}
