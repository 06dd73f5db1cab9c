//! Passwordless login flows
//!
//! Two variants are supported. The code flow moves
//! `Email -> Code -> Authenticated`; the magic-link flow moves
//! `Email -> AwaitingConfirmation` and completes when the browser comes back
//! through the callback URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::utils::errors::{Result, StudyGroupsError};

pub const CODE_RESENT_AFTER_FAILURE: &str = "Code invalid or expired. We've sent a new code to your email.";
pub const VERIFICATION_FAILED: &str = "Verification failed. Please try again later.";
pub const NEW_CODE_SENT: &str = "New code sent to your email.";
pub const LINK_EXPIRED: &str = "This magic link has expired or has already been used.";
pub const LOGIN_ERROR: &str = "An error occurred during login.";
pub const INVALID_LINK: &str = "Invalid login link. Please request a new magic link.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    Otp,
    MagicLink,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoginStep {
    Email,
    Code,
    AwaitingConfirmation,
    Authenticated,
}

impl LoginStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStep::Email => "email",
            LoginStep::Code => "code",
            LoginStep::AwaitingConfirmation => "awaiting_confirmation",
            LoginStep::Authenticated => "authenticated",
        }
    }
}

/// Progress of a single login attempt, persisted between requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginFlow {
    pub id: Uuid,
    pub method: LoginMethod,
    pub step: LoginStep,
    pub email: Option<String>,
    /// Informational notice for the user, such as a resent code
    pub info: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoginFlow {
    pub fn new(method: LoginMethod) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            method,
            step: LoginStep::Email,
            email: None,
            info: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, to: LoginStep) -> bool {
        use LoginStep::*;

        match (self.method, self.step, to) {
            (_, Email, Email) => true,
            (LoginMethod::Otp, Email, Code) => true,
            (LoginMethod::Otp, Code, Code | Authenticated | Email) => true,
            (LoginMethod::MagicLink, Email, AwaitingConfirmation) => true,
            (LoginMethod::MagicLink, AwaitingConfirmation, AwaitingConfirmation | Email) => true,
            _ => false,
        }
    }

    pub fn transition(&mut self, to: LoginStep) -> Result<()> {
        if !self.can_transition_to(to) {
            return Err(StudyGroupsError::InvalidStateTransition {
                from: self.step.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        self.step = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Return to email entry, keeping the address but dropping any messages
    pub fn back_to_email(&mut self) -> Result<()> {
        self.transition(LoginStep::Email)?;
        self.clear_messages();
        Ok(())
    }

    pub fn clear_messages(&mut self) {
        self.info = None;
        self.error = None;
    }

    pub fn set_info(&mut self, message: &str) {
        self.info = Some(message.to_string());
        self.error = None;
    }

    pub fn set_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.info = None;
    }

    /// The address the flow was started with
    pub fn require_email(&self) -> Result<&str> {
        self.email.as_deref().ok_or_else(|| StudyGroupsError::InvalidStateTransition {
            from: self.step.as_str().to_string(),
            to: LoginStep::Code.as_str().to_string(),
        })
    }
}

/// Parameters the identity provider appends to the magic-link redirect.
///
/// Errors arrive in the query string; tokens arrive in the fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackParams {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

pub fn parse_callback_url(callback_url: &str) -> Result<CallbackParams> {
    let url = Url::parse(callback_url)?;
    let mut params = CallbackParams::default();

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => params.error = Some(value.into_owned()),
            "error_description" => params.error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(fragment) = url.fragment() {
        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            match key.as_ref() {
                "access_token" => params.access_token = Some(value.into_owned()),
                "refresh_token" => params.refresh_token = Some(value.into_owned()),
                _ => {}
            }
        }
    }

    Ok(params)
}

/// How a magic-link callback resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallbackOutcome {
    Success,
    AlreadyLoggedIn,
    Expired { message: String },
    Error { message: String },
}

/// What the callback parameters ask for, before any session is established
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    Resolved(CallbackOutcome),
    EstablishSession { access_token: String, refresh_token: String },
}

/// Decide how to treat a callback.
///
/// An existing session wins over everything; provider errors win over tokens.
/// An empty `error` parameter is not an error.
pub fn classify_callback(params: CallbackParams, already_authenticated: bool) -> CallbackAction {
    if already_authenticated {
        return CallbackAction::Resolved(CallbackOutcome::AlreadyLoggedIn);
    }

    if params.error.as_deref().map_or(false, |error| !error.is_empty()) {
        let description = params.error_description.unwrap_or_default();
        let outcome = if description.contains("expired") || description.contains("invalid") {
            CallbackOutcome::Expired { message: LINK_EXPIRED.to_string() }
        } else if description.is_empty() {
            CallbackOutcome::Error { message: LOGIN_ERROR.to_string() }
        } else {
            CallbackOutcome::Error { message: description }
        };
        return CallbackAction::Resolved(outcome);
    }

    match (params.access_token, params.refresh_token) {
        (Some(access_token), Some(refresh_token)) if !access_token.is_empty() && !refresh_token.is_empty() => {
            CallbackAction::EstablishSession {
                access_token,
                refresh_token,
            }
        }
        _ => CallbackAction::Resolved(CallbackOutcome::Error {
            message: INVALID_LINK.to_string(),
        }),
    }
}
