//! Organizer dashboard endpoints
//!
//! All routes require a bearer token; every mutation answers with the
//! organizer's refreshed group list.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::auth::AuthenticatedOrganizer;
use crate::models::study_group::{GroupForm, StudyGroup, StudyGroupWithCounts};
use crate::state::AppState;
use crate::utils::errors::Result;

#[derive(Debug, Serialize)]
pub struct GroupMutation {
    pub group: StudyGroup,
    pub groups: Vec<StudyGroupWithCounts>,
}

/// GET /api/organizer/groups
pub async fn list_groups(
    State(state): State<AppState>,
    AuthenticatedOrganizer(organizer): AuthenticatedOrganizer,
) -> Result<impl IntoResponse> {
    Ok(Json(state.services.organizer.list_groups(&organizer).await?))
}

/// POST /api/organizer/groups
pub async fn create_group(
    State(state): State<AppState>,
    AuthenticatedOrganizer(organizer): AuthenticatedOrganizer,
    Json(form): Json<GroupForm>,
) -> Result<impl IntoResponse> {
    let (group, groups) = state.services.organizer.create_group(&organizer, form).await?;
    Ok((StatusCode::CREATED, Json(GroupMutation { group, groups })))
}

/// PUT /api/organizer/groups/:id
pub async fn update_group(
    State(state): State<AppState>,
    AuthenticatedOrganizer(organizer): AuthenticatedOrganizer,
    Path(group_id): Path<Uuid>,
    Json(form): Json<GroupForm>,
) -> Result<impl IntoResponse> {
    let (group, groups) = state.services.organizer.update_group(&organizer, group_id, form).await?;
    Ok(Json(GroupMutation { group, groups }))
}

/// DELETE /api/organizer/groups/:id
pub async fn delete_group(
    State(state): State<AppState>,
    AuthenticatedOrganizer(organizer): AuthenticatedOrganizer,
    Path(group_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let groups = state.services.organizer.delete_group(&organizer, group_id).await?;
    Ok(Json(groups))
}

/// GET /api/organizer/groups/:id/participants
pub async fn group_participants(
    State(state): State<AppState>,
    AuthenticatedOrganizer(organizer): AuthenticatedOrganizer,
    Path(group_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.services.organizer.participants(&organizer, group_id).await?))
}
