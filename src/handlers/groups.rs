//! Student-facing study group endpoints

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use chrono::Utc;
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use super::visitor::{remember_cookie, visitor_email};
use crate::middleware::auth::OptionalBearer;
use crate::models::participant::{JoinRequest, LeaveRequest};
use crate::models::study_group::StudyGroupWithCounts;
use crate::services::realtime::active_at;
use crate::state::AppState;
use crate::utils::errors::{Result, StudyGroupsError};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /api/groups?q=
pub async fn list_groups(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Result<impl IntoResponse> {
    let groups = state.services.study_groups.list_active(query.q.as_deref()).await?;
    Ok(Json(groups))
}

fn snapshot_event(groups: &[StudyGroupWithCounts]) -> Option<Event> {
    match Event::default().event("groups").json_data(groups) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "Failed to encode group snapshot");
            None
        }
    }
}

/// GET /api/groups/stream
///
/// Sends the current listing, then a fresh one after every change.
pub async fn stream_groups(State(state): State<AppState>) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let feed = state.services.feed.clone();
    let mut updates = feed.subscribe();

    let stream = async_stream::stream! {
        match feed.snapshot().await {
            Ok(snapshot) => {
                if let Some(event) = snapshot_event(&snapshot) {
                    yield Ok::<Event, Infallible>(event);
                }
            }
            Err(e) => warn!(error = %e, "Failed to load initial snapshot for stream"),
        }

        loop {
            match updates.recv().await {
                Ok(snapshot) => {
                    if let Some(event) = snapshot_event(&active_at(snapshot, Utc::now())) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Stream subscriber lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// The organizer's email when signed in, else the remembered visitor email
async fn viewer_email(state: &AppState, headers: &HeaderMap, bearer: Option<String>) -> Option<String> {
    if let Some(token) = bearer {
        if let Ok(organizer) = state.services.auth.authenticate(&token).await {
            return Some(organizer.email);
        }
    }
    visitor_email(headers)
}

/// GET /api/groups/:id
pub async fn group_detail(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    OptionalBearer(bearer): OptionalBearer,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let viewer = viewer_email(&state, &headers, bearer).await;
    let detail = state.services.study_groups.group_detail(group_id, viewer.as_deref()).await?;
    Ok(Json(detail))
}

/// GET /api/groups/:id/participants
pub async fn group_participants(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    OptionalBearer(bearer): OptionalBearer,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let participants = match viewer_email(&state, &headers, bearer).await {
        Some(email) => state.services.study_groups.participants(group_id, &email).await?,
        None => Vec::new(),
    };
    Ok(Json(participants))
}

/// POST /api/groups/:id/join
pub async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<JoinRequest>,
) -> Result<impl IntoResponse> {
    let participant = state.services.study_groups.join(group_id, request).await?;
    let cookie = remember_cookie(&participant.email);

    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(participant)))
}

/// POST /api/groups/:id/leave
pub async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<LeaveRequest>,
) -> Result<impl IntoResponse> {
    let email = request
        .email
        .filter(|email| !email.trim().is_empty())
        .or_else(|| visitor_email(&headers))
        .ok_or_else(|| StudyGroupsError::Validation("Please enter your email".to_string()))?;

    state.services.study_groups.leave(group_id, &email, request.confirm).await?;
    Ok(Json(json!({ "success": true })))
}
