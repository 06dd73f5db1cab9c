//! Remembered visitor email
//!
//! After joining a group the student's email is kept in a cookie so later
//! visits can show rosters and prefill the leave form.

use axum::{
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::utils::helpers::cookie_value;
use crate::utils::validation::{is_campus_email, normalize_email};

pub const VISITOR_COOKIE: &str = "cu_study_groups_user_email";

const COOKIE_MAX_AGE_SECONDS: u64 = 60 * 60 * 24 * 365;

/// The remembered email, if it is still a valid campus address
pub fn visitor_email(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, VISITOR_COOKIE)
        .map(|email| normalize_email(&email))
        .filter(|email| is_campus_email(email))
}

pub fn remember_cookie(email: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        VISITOR_COOKIE,
        urlencoding::encode(&normalize_email(email)),
        COOKIE_MAX_AGE_SECONDS
    )
}

pub fn forget_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; SameSite=Lax", VISITOR_COOKIE)
}

/// GET /api/visitor
pub async fn get_visitor(headers: HeaderMap) -> impl IntoResponse {
    Json(json!({ "email": visitor_email(&headers) }))
}

/// DELETE /api/visitor
pub async fn forget_visitor() -> impl IntoResponse {
    ([(header::SET_COOKIE, forget_cookie())], Json(json!({ "email": null })))
}
