//! Authentication middleware
//!
//! Resolves the `Authorization: Bearer` header to an organizer before an
//! organizer-only handler runs.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::{debug, warn};

use crate::models::auth::Organizer;
use crate::state::AppState;
use crate::utils::errors::StudyGroupsError;
use crate::utils::helpers::bearer_token;

/// Extractor for handlers that require a signed-in organizer
#[derive(Debug, Clone)]
pub struct AuthenticatedOrganizer(pub Organizer);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedOrganizer {
    type Rejection = StudyGroupsError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| StudyGroupsError::Authentication("Sign in to manage your study groups".to_string()))?;

        match state.services.auth.authenticate(&token).await {
            Ok(organizer) => {
                debug!(email = %organizer.email, "Organizer authenticated");
                Ok(Self(organizer))
            }
            Err(e) => {
                warn!(error = %e, path = %parts.uri.path(), "Rejected organizer request");
                Err(e)
            }
        }
    }
}

/// Bearer token when present, for handlers where signing in is optional
#[derive(Debug, Clone)]
pub struct OptionalBearer(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OptionalBearer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(bearer_token(&parts.headers)))
    }
}
