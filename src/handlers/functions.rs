//! Notification function endpoints
//!
//! Webhook-style endpoints invoked after a participant joins or leaves. They
//! answer browsers directly, so every response carries permissive CORS
//! headers and `OPTIONS` is answered with a plain "ok".

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::study_group::StudyGroup;
use crate::services::notification::{NotificationOutcome, ParticipantNotice};
use crate::state::AppState;
use crate::utils::errors::StudyGroupsError;
use crate::utils::logging::log_api_error;

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

#[derive(Debug, Default, Deserialize)]
pub struct NotificationPayload {
    pub participant_id: Option<String>,
    pub participant_name: Option<String>,
    pub participant_email: Option<String>,
    pub study_group_id: Option<String>,
}

/// Which payload fields an endpoint cannot do without
#[derive(Debug, Clone, Copy)]
struct Required {
    name: bool,
    email: bool,
}

impl NotificationPayload {
    fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn has(&self, required: Required) -> bool {
        Self::field(&self.study_group_id).is_some()
            && (!required.name || Self::field(&self.participant_name).is_some())
            && (!required.email || Self::field(&self.participant_email).is_some())
    }

    fn notice(&self) -> ParticipantNotice {
        ParticipantNotice {
            name: Self::field(&self.participant_name).unwrap_or_default().to_string(),
            email: Self::field(&self.participant_email).unwrap_or_default().to_string(),
        }
    }
}

/// Failure answer of a notification endpoint
#[derive(Debug)]
pub struct FunctionError {
    status: StatusCode,
    body: serde_json::Value,
}

impl FunctionError {
    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    fn missing_fields() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Missing required fields")
    }

    fn group_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Study group not found")
    }
}

impl From<StudyGroupsError> for FunctionError {
    fn from(e: StudyGroupsError) -> Self {
        match e {
            StudyGroupsError::Email(email) => {
                log_api_error("email", &email.to_string(), None);
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: json!({ "error": "Failed to send email", "details": email.to_string() }),
                }
            }
            other => {
                error!(error = %other, "Notification function failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string())
            }
        }
    }
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> Response {
        with_cors((self.status, Json(self.body)).into_response())
    }
}

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

fn respond(outcome: NotificationOutcome) -> Response {
    with_cors((StatusCode::OK, Json(outcome)).into_response())
}

/// OPTIONS on any notification endpoint
pub async fn preflight() -> Response {
    let mut response = with_cors("ok".into_response());
    response.headers_mut().insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("POST, OPTIONS"),
    );
    response
}

/// Parse and check the payload; `None` means email is off and nothing else matters
fn parse(state: &AppState, body: &[u8], required: Required) -> Result<Option<NotificationPayload>, FunctionError> {
    let payload: NotificationPayload = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Unreadable notification payload");
        FunctionError::new(StatusCode::BAD_REQUEST, "Invalid JSON body")
    })?;

    if !payload.has(required) {
        return Err(FunctionError::missing_fields());
    }

    if !state.services.notifications.is_enabled() {
        return Ok(None);
    }

    Ok(Some(payload))
}

async fn load_group(state: &AppState, payload: &NotificationPayload) -> Result<StudyGroup, FunctionError> {
    let group_id = NotificationPayload::field(&payload.study_group_id)
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(FunctionError::group_not_found)?;

    state
        .database
        .groups
        .find_by_id(group_id)
        .await?
        .ok_or_else(FunctionError::group_not_found)
}

/// POST /functions/send-join-confirmation
pub async fn send_join_confirmation(State(state): State<AppState>, body: Bytes) -> Result<Response, FunctionError> {
    let Some(payload) = parse(&state, &body, Required { name: false, email: true })? else {
        return Ok(respond(NotificationOutcome::disabled()));
    };

    let group = load_group(&state, &payload).await?;
    let outcome = state
        .services
        .notifications
        .send_join_confirmation(&group, &payload.notice())
        .await?;
    Ok(respond(outcome))
}

/// POST /functions/send-organizer-notification
pub async fn send_organizer_notification(State(state): State<AppState>, body: Bytes) -> Result<Response, FunctionError> {
    let Some(payload) = parse(&state, &body, Required { name: true, email: false })? else {
        return Ok(respond(NotificationOutcome::disabled()));
    };

    let group = load_group(&state, &payload).await?;
    let count = state.database.groups.participant_count(group.id).await?;
    let outcome = state
        .services
        .notifications
        .send_organizer_notification(&group, &payload.notice().name, count)
        .await?;
    Ok(respond(outcome))
}

/// POST /functions/on-participant-joined
pub async fn on_participant_joined(State(state): State<AppState>, body: Bytes) -> Result<Response, FunctionError> {
    let Some(payload) = parse(&state, &body, Required { name: true, email: true })? else {
        return Ok(respond(NotificationOutcome::disabled()));
    };

    let group = load_group(&state, &payload).await?;
    let count = state.database.groups.participant_count(group.id).await?;
    let outcome = state
        .services
        .notifications
        .on_participant_joined(&group, &payload.notice(), count)
        .await?;
    Ok(respond(outcome))
}

/// POST /functions/on-participant-left
pub async fn on_participant_left(State(state): State<AppState>, body: Bytes) -> Result<Response, FunctionError> {
    let Some(payload) = parse(&state, &body, Required { name: true, email: true })? else {
        return Ok(respond(NotificationOutcome::disabled()));
    };

    let group = load_group(&state, &payload).await?;
    let outcome = state
        .services
        .notifications
        .on_participant_left(&group, &payload.notice())
        .await?;
    Ok(respond(outcome))
}
