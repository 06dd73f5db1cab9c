//! Login endpoints for organizers
//!
//! Flow progress lives server-side; the client only carries the flow id
//! between steps.

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::middleware::auth::{AuthenticatedOrganizer, OptionalBearer};
use crate::models::auth::AuthSession;
use crate::state::login::{CallbackOutcome, LoginFlow};
use crate::state::AppState;
use crate::utils::errors::{Result, StudyGroupsError};

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct FlowRequest {
    pub flow_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub flow_id: Uuid,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// Full redirect URL as the browser saw it, fragment included
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub flow: LoginFlow,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    #[serde(flatten)]
    pub outcome: CallbackOutcome,
    pub session: Option<AuthSession>,
}

/// POST /api/auth/otp/send
pub async fn send_otp(State(state): State<AppState>, Json(request): Json<EmailRequest>) -> Result<impl IntoResponse> {
    Ok(Json(state.services.auth.start_otp(&request.email).await?))
}

/// POST /api/auth/otp/verify
pub async fn verify_otp(State(state): State<AppState>, Json(request): Json<VerifyRequest>) -> Result<impl IntoResponse> {
    let outcome = state.services.auth.verify_otp(request.flow_id, &request.code).await?;
    Ok(Json(VerifyResponse {
        flow: outcome.flow,
        session: outcome.session,
    }))
}

/// POST /api/auth/otp/resend
pub async fn resend_otp(State(state): State<AppState>, Json(request): Json<FlowRequest>) -> Result<impl IntoResponse> {
    Ok(Json(state.services.auth.resend_otp(request.flow_id).await?))
}

/// POST /api/auth/otp/back
pub async fn back_to_email(State(state): State<AppState>, Json(request): Json<FlowRequest>) -> Result<impl IntoResponse> {
    Ok(Json(state.services.auth.back_to_email(request.flow_id).await?))
}

/// POST /api/auth/magic-link
pub async fn send_magic_link(State(state): State<AppState>, Json(request): Json<EmailRequest>) -> Result<impl IntoResponse> {
    if !state.settings.features.magic_link {
        return Err(StudyGroupsError::ServiceUnavailable(
            "Magic link sign-in is disabled".to_string(),
        ));
    }
    Ok(Json(state.services.auth.send_magic_link(&request.email).await?))
}

/// POST /api/auth/callback
pub async fn complete_callback(
    State(state): State<AppState>,
    OptionalBearer(bearer): OptionalBearer,
    Json(request): Json<CallbackRequest>,
) -> Result<impl IntoResponse> {
    let (outcome, session) = state
        .services
        .auth
        .complete_callback(&request.url, bearer.as_deref())
        .await?;
    Ok(Json(CallbackResponse { outcome, session }))
}

/// POST /api/auth/refresh
pub async fn refresh(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> Result<impl IntoResponse> {
    Ok(Json(state.services.auth.refresh(&request.refresh_token).await?))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, OptionalBearer(bearer): OptionalBearer) -> Result<impl IntoResponse> {
    let token = bearer.ok_or_else(|| StudyGroupsError::Authentication("Not signed in".to_string()))?;
    state.services.auth.logout(&token).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/auth/me
pub async fn me(AuthenticatedOrganizer(organizer): AuthenticatedOrganizer) -> impl IntoResponse {
    Json(organizer)
}
