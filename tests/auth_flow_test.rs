//! Organizer login flows over HTTP against a mock identity provider

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::*;
use serde_json::json;
use serial_test::serial;

async fn start_flow(ctx: &TestContext) -> String {
    let response = ctx
        .post_json("/api/auth/otp/send", json!({ "email": " Organizer@Columbia.edu " }))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.json["step"], "code");
    assert_eq!(response.json["email"], TEST_ORGANIZER_EMAIL);
    response.json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
#[serial]
async fn test_otp_login_success() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_send_otp().await;
    ctx.identity.mock_verify("12345678").await;

    let flow_id = start_flow(&ctx).await;

    let response = ctx
        .post_json("/api/auth/otp/verify", json!({ "flow_id": flow_id, "code": "12345678" }))
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    assert_eq!(response.json["flow"]["step"], "authenticated");
    assert_eq!(response.json["session"]["access_token"], TEST_ACCESS_TOKEN);
    assert_eq!(response.json["session"]["user"]["email"], TEST_ORGANIZER_EMAIL);

    // a finished flow cannot be reused
    let again = ctx
        .post_json("/api/auth/otp/verify", json!({ "flow_id": flow_id, "code": "12345678" }))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_wrong_code_sends_a_new_one() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_send_otp().await;
    ctx.identity.mock_verify("12345678").await;

    let flow_id = start_flow(&ctx).await;
    assert_eq!(ctx.identity.otp_requests().await, 1);

    let response = ctx
        .post_json("/api/auth/otp/verify", json!({ "flow_id": flow_id, "code": "87654321" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["flow"]["step"], "code");
    assert_eq!(
        response.json["flow"]["info"],
        "Code invalid or expired. We've sent a new code to your email."
    );
    assert!(response.json["session"].is_null());
    assert_eq!(ctx.identity.otp_requests().await, 2);
}

#[tokio::test]
#[serial]
async fn test_failed_resend_after_wrong_code() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_send_otp().await;
    ctx.identity.mock_verify("12345678").await;
    let flow_id = start_flow(&ctx).await;

    ctx.identity.server.reset().await;
    ctx.identity.mock_send_otp_failure("Email rate limit exceeded").await;
    ctx.identity.mock_verify("12345678").await;

    let response = ctx
        .post_json("/api/auth/otp/verify", json!({ "flow_id": flow_id, "code": "00000000" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["flow"]["error"], "Verification failed. Please try again later.");
    assert!(response.json["flow"]["info"].is_null());
}

#[tokio::test]
#[serial]
async fn test_code_format_is_checked_before_the_provider() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_send_otp().await;
    let flow_id = start_flow(&ctx).await;

    for code in ["1234567", "123456789", "1234abcd"] {
        let response = ctx
            .post_json("/api/auth/otp/verify", json!({ "flow_id": flow_id, "code": code }))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "code {}", code);
    }
}

#[tokio::test]
#[serial]
async fn test_resend_and_back_to_email() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_send_otp().await;
    let flow_id = start_flow(&ctx).await;

    let resent = ctx.post_json("/api/auth/otp/resend", json!({ "flow_id": flow_id })).await;
    assert_eq!(resent.status, StatusCode::OK);
    assert_eq!(resent.json["info"], "New code sent to your email.");

    let back = ctx.post_json("/api/auth/otp/back", json!({ "flow_id": flow_id })).await;
    assert_eq!(back.status, StatusCode::OK);
    assert_eq!(back.json["step"], "email");
    assert!(back.json["info"].is_null());
}

#[tokio::test]
#[serial]
async fn test_non_campus_email_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_send_otp().await;

    let response = ctx.post_json("/api/auth/otp/send", json!({ "email": "someone@gmail.com" })).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Please use your @columbia.edu or @barnard.edu email");
    assert_eq!(ctx.identity.otp_requests().await, 0);
}

#[tokio::test]
#[serial]
async fn test_code_requests_are_rate_limited() {
    let ctx = TestContext::new_with_config(
        TestConfig {
            otp_requests_per_minute: 1,
            ..Default::default()
        },
        None,
    )
    .await;
    ctx.identity.mock_send_otp().await;

    start_flow(&ctx).await;
    let response = ctx
        .post_json("/api/auth/otp/send", json!({ "email": TEST_ORGANIZER_EMAIL }))
        .await;

    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(ctx.identity.otp_requests().await, 1);
}

#[tokio::test]
#[serial]
async fn test_provider_error_is_surfaced() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_send_otp_failure("Email rate limit exceeded").await;

    let response = ctx
        .post_json("/api/auth/otp/send", json!({ "email": TEST_ORGANIZER_EMAIL }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Email rate limit exceeded");
}

#[tokio::test]
#[serial]
async fn test_magic_link_flow() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_send_otp().await;
    ctx.identity.mock_user().await;

    let sent = ctx.post_json("/api/auth/magic-link", json!({ "email": TEST_ORGANIZER_EMAIL })).await;
    assert_eq!(sent.status, StatusCode::OK);
    assert_eq!(sent.json["step"], "awaiting_confirmation");
    assert_eq!(sent.json["method"], "magic_link");

    let url = format!(
        "http://localhost:5173/auth/callback#access_token={}&refresh_token={}&type=magiclink",
        TEST_ACCESS_TOKEN, TEST_REFRESH_TOKEN
    );
    let callback = ctx.post_json("/api/auth/callback", json!({ "url": url })).await;

    assert_eq!(callback.status, StatusCode::OK, "{}", callback.text);
    assert_eq!(callback.json["status"], "success");
    assert_eq!(callback.json["session"]["refresh_token"], TEST_REFRESH_TOKEN);
}

#[tokio::test]
#[serial]
async fn test_magic_link_callback_outcomes() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_user().await;

    let expired = ctx
        .post_json(
            "/api/auth/callback",
            json!({ "url": "http://localhost:5173/auth/callback?error=access_denied&error_description=Email+link+is+invalid+or+has+expired" }),
        )
        .await;
    assert_eq!(expired.json["status"], "expired");
    assert_eq!(expired.json["message"], "This magic link has expired or has already been used.");

    let missing = ctx
        .post_json("/api/auth/callback", json!({ "url": "http://localhost:5173/auth/callback" }))
        .await;
    assert_eq!(missing.json["status"], "error");
    assert_eq!(missing.json["message"], "Invalid login link. Please request a new magic link.");

    let request = with_bearer(
        json_request(
            Method::POST,
            "/api/auth/callback",
            json!({ "url": "http://localhost:5173/auth/callback" }),
        ),
        TEST_ACCESS_TOKEN,
    );
    let already = ctx.send(request).await;
    assert_eq!(already.json["status"], "already_logged_in");
}

#[tokio::test]
#[serial]
async fn test_magic_link_can_be_disabled() {
    let ctx = TestContext::new_with_config(
        TestConfig {
            magic_link: false,
            ..Default::default()
        },
        None,
    )
    .await;
    ctx.identity.mock_send_otp().await;

    let response = ctx.post_json("/api/auth/magic-link", json!({ "email": TEST_ORGANIZER_EMAIL })).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ctx.identity.otp_requests().await, 0);
}

#[tokio::test]
#[serial]
async fn test_me_and_logout() {
    let ctx = TestContext::new().await;
    ctx.identity.mock_user().await;
    ctx.identity.mock_logout().await;

    let anonymous = ctx.get("/api/auth/me").await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let request = with_bearer(
        axum::http::Request::builder().uri("/api/auth/me").body(axum::body::Body::empty()).unwrap(),
        "not-a-real-token",
    );
    assert_eq!(ctx.send(request).await.status, StatusCode::UNAUTHORIZED);

    let request = with_bearer(
        axum::http::Request::builder().uri("/api/auth/me").body(axum::body::Body::empty()).unwrap(),
        TEST_ACCESS_TOKEN,
    );
    let me = ctx.send(request).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json["email"], TEST_ORGANIZER_EMAIL);

    let logout = ctx
        .send(with_bearer(json_request(Method::POST, "/api/auth/logout", json!({})), TEST_ACCESS_TOKEN))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.json["success"], true);
}
