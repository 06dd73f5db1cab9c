//! HTTP handlers module
//!
//! This module contains the JSON API and the router that ties it together

pub mod auth;
pub mod functions;
pub mod groups;
pub mod health;
pub mod organizer;
pub mod visitor;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerConfig;
use crate::middleware::log_requests;
use crate::state::AppState;

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/groups", get(groups::list_groups))
        .route("/api/groups/stream", get(groups::stream_groups))
        .route("/api/groups/:id", get(groups::group_detail))
        .route("/api/groups/:id/join", post(groups::join_group))
        .route("/api/groups/:id/leave", post(groups::leave_group))
        .route("/api/groups/:id/participants", get(groups::group_participants))
        .route("/api/visitor", get(visitor::get_visitor).delete(visitor::forget_visitor))
        .route("/api/auth/otp/send", post(auth::send_otp))
        .route("/api/auth/otp/verify", post(auth::verify_otp))
        .route("/api/auth/otp/resend", post(auth::resend_otp))
        .route("/api/auth/otp/back", post(auth::back_to_email))
        .route("/api/auth/magic-link", post(auth::send_magic_link))
        .route("/api/auth/callback", post(auth::complete_callback))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/organizer/groups",
            get(organizer::list_groups).post(organizer::create_group),
        )
        .route(
            "/api/organizer/groups/:id",
            put(organizer::update_group).delete(organizer::delete_group),
        )
        .route("/api/organizer/groups/:id/participants", get(organizer::group_participants))
}

fn function_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/functions/on-participant-joined",
            post(functions::on_participant_joined).options(functions::preflight),
        )
        .route(
            "/functions/on-participant-left",
            post(functions::on_participant_left).options(functions::preflight),
        )
        .route(
            "/functions/send-join-confirmation",
            post(functions::send_join_confirmation).options(functions::preflight),
        )
        .route(
            "/functions/send-organizer-notification",
            post(functions::send_organizer_notification).options(functions::preflight),
        )
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server);

    Router::new()
        .route("/health", get(health::health))
        .merge(api_routes().layer(cors))
        .merge(function_routes())
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
