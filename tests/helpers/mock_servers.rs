//! Mock identity provider and email API for testing
//!
//! Both are wiremock servers configured with the responses a
//! GoTrue-compatible provider and a Resend-compatible email API give.

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_ANON_KEY: &str = "test-anon-key";
pub const TEST_ACCESS_TOKEN: &str = "access-token-123";
pub const TEST_REFRESH_TOKEN: &str = "refresh-token-456";
pub const TEST_ORGANIZER_EMAIL: &str = "organizer@columbia.edu";

/// Mock identity provider server
pub struct IdentityMockServer {
    pub server: MockServer,
}

impl IdentityMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn token_body() -> Value {
        json!({
            "access_token": TEST_ACCESS_TOKEN,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": TEST_REFRESH_TOKEN,
            "user": { "id": "user-1", "email": TEST_ORGANIZER_EMAIL }
        })
    }

    /// Code and magic-link requests succeed
    pub async fn mock_send_otp(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/otp"))
            .and(header("apikey", TEST_ANON_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&self.server)
            .await;
    }

    /// Code and magic-link requests fail with a provider message
    pub async fn mock_send_otp_failure(&self, message: &str) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/otp"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "msg": message })))
            .mount(&self.server)
            .await;
    }

    /// Only `code` is accepted
    pub async fn mock_verify(&self, code: &str) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/verify"))
            .and(body_partial_json(json!({ "token": code })))
            .respond_with(ResponseTemplate::new(200).set_body_json(Self::token_body()))
            .with_priority(1)
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/verify"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({ "msg": "Token has expired or is invalid" })),
            )
            .with_priority(2)
            .mount(&self.server)
            .await;
    }

    /// `GET /user` accepts only the test access token
    pub async fn mock_user(&self) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", format!("Bearer {}", TEST_ACCESS_TOKEN).as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "user-1", "email": TEST_ORGANIZER_EMAIL })),
            )
            .with_priority(1)
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
            .with_priority(2)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_logout(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.server)
            .await;
    }

    /// Number of code or link emails requested so far
    pub async fn otp_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == "/auth/v1/otp")
            .count()
    }
}

/// Mock transactional email API
pub struct EmailMockServer {
    pub server: MockServer,
}

impl EmailMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub async fn mock_send(&self) {
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email-1" })))
            .mount(&self.server)
            .await;
    }

    pub async fn sent(&self) -> usize {
        self.server.received_requests().await.unwrap_or_default().len()
    }
}
