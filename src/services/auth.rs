//! Authentication service implementation
//!
//! Drives the passwordless login flows against the identity provider and
//! resolves bearer tokens to organizers.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::models::auth::{AuthSession, Organizer};
use crate::services::identity::IdentityClient;
use crate::services::redis::RedisService;
use crate::state::login::{
    classify_callback, parse_callback_url, CallbackAction, CallbackOutcome, LoginFlow, LoginMethod,
    LoginStep, CODE_RESENT_AFTER_FAILURE, NEW_CODE_SENT, VERIFICATION_FAILED,
};
use crate::state::storage::LoginFlowStorage;
use crate::utils::errors::{IdentityError, Result, StudyGroupsError};
use crate::utils::logging::log_auth_event;
use crate::utils::validation::{is_valid_otp_code, validate_campus_email, OTP_CODE_LENGTH};

/// Audience the identity provider stamps on user access tokens
const TOKEN_AUDIENCE: &str = "authenticated";

/// How long a provider-verified token is trusted without asking again
const TOKEN_CACHE_SECONDS: u64 = 300;

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    email: Option<String>,
    exp: usize,
}

/// Result of a code verification attempt
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub flow: LoginFlow,
    pub session: Option<AuthSession>,
}

#[derive(Clone, Debug)]
pub struct AuthService {
    identity: IdentityClient,
    flows: LoginFlowStorage,
    token_cache: Option<RedisService>,
    rate_limit: RateLimitMiddleware,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        identity: IdentityClient,
        flows: LoginFlowStorage,
        token_cache: Option<RedisService>,
        config: AuthConfig,
    ) -> Self {
        let rate_limit = RateLimitMiddleware::per_minute(config.otp_requests_per_minute);

        Self {
            identity,
            flows,
            token_cache,
            rate_limit,
            config,
        }
    }

    /// Send a login code and start a code flow at the `Code` step
    pub async fn start_otp(&self, email: &str) -> Result<LoginFlow> {
        let email = validate_campus_email(email)?;
        self.rate_limit.check_email(&email)?;

        if let Err(e) = self.identity.send_otp(&email).await {
            log_auth_event(&email, "otp_send", false);
            return Err(e.into());
        }

        let mut flow = LoginFlow::new(LoginMethod::Otp);
        flow.email = Some(email.clone());
        flow.transition(LoginStep::Code)?;
        self.flows.save(&flow).await?;

        log_auth_event(&email, "otp_send", true);
        Ok(flow)
    }

    /// Verify a code. A rejected code triggers one automatic resend.
    pub async fn verify_otp(&self, flow_id: Uuid, code: &str) -> Result<VerifyOutcome> {
        let mut flow = self.flows.require(flow_id).await?;
        if flow.step != LoginStep::Code {
            return Err(StudyGroupsError::InvalidStateTransition {
                from: flow.step.as_str().to_string(),
                to: LoginStep::Authenticated.as_str().to_string(),
            });
        }

        let code = code.trim();
        if !is_valid_otp_code(code) {
            return Err(StudyGroupsError::Validation(format!(
                "Please enter the {}-digit code from your email",
                OTP_CODE_LENGTH
            )));
        }

        let email = flow.require_email()?.to_string();

        match self.identity.verify_otp(&email, code).await {
            Ok(session) => {
                flow.transition(LoginStep::Authenticated)?;
                flow.clear_messages();
                self.flows.delete(flow.id).await?;
                log_auth_event(&email, "otp_verify", true);

                Ok(VerifyOutcome {
                    flow,
                    session: Some(session),
                })
            }
            Err(e) => {
                debug!(email = %email, error = %e, "Code rejected, sending a new one");
                log_auth_event(&email, "otp_verify", false);

                match self.identity.send_otp(&email).await {
                    Ok(()) => flow.set_info(CODE_RESENT_AFTER_FAILURE),
                    Err(_) => flow.set_error(VERIFICATION_FAILED),
                }
                flow.transition(LoginStep::Code)?;
                self.flows.save(&flow).await?;

                Ok(VerifyOutcome { flow, session: None })
            }
        }
    }

    /// Explicitly request a fresh code
    pub async fn resend_otp(&self, flow_id: Uuid) -> Result<LoginFlow> {
        let mut flow = self.flows.require(flow_id).await?;
        flow.transition(LoginStep::Code)?;

        let email = flow.require_email()?.to_string();
        self.rate_limit.check_email(&email)?;

        match self.identity.send_otp(&email).await {
            Ok(()) => flow.set_info(NEW_CODE_SENT),
            Err(e) => flow.set_error(&e.to_string()),
        }
        self.flows.save(&flow).await?;

        log_auth_event(&email, "otp_resend", flow.error.is_none());
        Ok(flow)
    }

    pub async fn back_to_email(&self, flow_id: Uuid) -> Result<LoginFlow> {
        let mut flow = self.flows.require(flow_id).await?;
        flow.back_to_email()?;
        self.flows.save(&flow).await?;
        Ok(flow)
    }

    /// Email a magic link; the flow waits for the callback
    pub async fn send_magic_link(&self, email: &str) -> Result<LoginFlow> {
        let email = validate_campus_email(email)?;
        self.rate_limit.check_email(&email)?;

        if let Err(e) = self.identity.send_magic_link(&email).await {
            log_auth_event(&email, "magic_link_send", false);
            return Err(e.into());
        }

        let mut flow = LoginFlow::new(LoginMethod::MagicLink);
        flow.email = Some(email.clone());
        flow.transition(LoginStep::AwaitingConfirmation)?;
        self.flows.save(&flow).await?;

        log_auth_event(&email, "magic_link_send", true);
        Ok(flow)
    }

    /// Resolve the URL the magic link redirected to
    pub async fn complete_callback(
        &self,
        callback_url: &str,
        current_token: Option<&str>,
    ) -> Result<(CallbackOutcome, Option<AuthSession>)> {
        let already_authenticated = match current_token {
            Some(token) => self.authenticate(token).await.is_ok(),
            None => false,
        };

        let params = parse_callback_url(callback_url)
            .map_err(|_| StudyGroupsError::Validation("Invalid callback URL".to_string()))?;

        match classify_callback(params, already_authenticated) {
            CallbackAction::Resolved(outcome) => Ok((outcome, None)),
            CallbackAction::EstablishSession {
                access_token,
                refresh_token,
            } => match self.identity.get_user(&access_token).await {
                Ok(user) => {
                    if let Some(email) = user.email.as_deref() {
                        log_auth_event(email, "magic_link_callback", true);
                    }
                    let session = AuthSession {
                        access_token,
                        refresh_token,
                        expires_at: None,
                        user,
                    };
                    Ok((CallbackOutcome::Success, Some(session)))
                }
                Err(e) => {
                    let message = match e {
                        IdentityError::InvalidToken => "Failed to complete login".to_string(),
                        other => other.to_string(),
                    };
                    Ok((CallbackOutcome::Error { message }, None))
                }
            },
        }
    }

    /// Resolve a bearer token to the organizer it belongs to
    pub async fn authenticate(&self, token: &str) -> Result<Organizer> {
        if let Some(secret) = self.config.jwt_secret.as_deref() {
            return Self::decode_token(token, secret);
        }

        let cache_key = format!("auth_token:{}", token);
        if let Some(cache) = &self.token_cache {
            match cache.get::<Organizer>(&cache_key).await {
                Ok(Some(organizer)) => return Ok(organizer),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Token cache unavailable"),
            }
        }

        let user = self.identity.get_user(token).await?;
        let email = user
            .email
            .as_deref()
            .ok_or_else(|| StudyGroupsError::Authentication("Account has no email address".to_string()))?;
        let organizer = Organizer::new(user.id.clone(), email);

        if let Some(cache) = &self.token_cache {
            if let Err(e) = cache.set(&cache_key, &organizer, Some(TOKEN_CACHE_SECONDS)).await {
                warn!(error = %e, "Failed to cache verified token");
            }
        }

        Ok(organizer)
    }

    fn decode_token(token: &str, secret: &str) -> Result<Organizer> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map_err(|e| {
                debug!(error = %e, "Rejected access token");
                StudyGroupsError::Identity(IdentityError::InvalidToken)
            })?;

        let email = data
            .claims
            .email
            .as_deref()
            .filter(|email| !email.is_empty())
            .ok_or_else(|| StudyGroupsError::Authentication("Account has no email address".to_string()))?;

        Ok(Organizer::new(data.claims.sub.clone(), email))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        Ok(self.identity.refresh(refresh_token).await?)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        if let Some(cache) = &self.token_cache {
            if let Err(e) = cache.delete(&format!("auth_token:{}", token)).await {
                warn!(error = %e, "Failed to evict cached token");
            }
        }

        self.identity.logout(token).await?;
        Ok(())
    }

    /// Drop abandoned login flows and idle rate limit entries
    pub async fn prune_idle_state(&self) {
        let flows = self.flows.prune_expired().await;
        let tracked = self.rate_limit.retain_recent();
        debug!(expired_flows = flows, rate_limited_emails = tracked, "Pruned idle login state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use assert_matches::assert_matches;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn service_with_secret(secret: &str) -> AuthService {
        let mut config = Settings::default().auth;
        config.jwt_secret = Some(secret.to_string());
        let identity = IdentityClient::new(config.clone()).unwrap();
        AuthService::new(identity, LoginFlowStorage::in_memory(60), None, config)
    }

    fn token(secret: &str, email: Option<&str>, exp_offset: i64) -> String {
        let claims = serde_json::json!({
            "sub": "user-1",
            "email": email,
            "aud": "authenticated",
            "exp": chrono::Utc::now().timestamp() + exp_offset,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[tokio::test]
    async fn test_local_token_verification() {
        let service = service_with_secret("super-secret");
        let organizer = service
            .authenticate(&token("super-secret", Some("Org@Columbia.edu"), 3600))
            .await
            .unwrap();

        assert_eq!(organizer.user_id, "user-1");
        assert_eq!(organizer.email, "org@columbia.edu");
    }

    #[tokio::test]
    async fn test_rejects_wrong_secret_and_expired_tokens() {
        let service = service_with_secret("super-secret");

        assert_matches!(
            service.authenticate(&token("other-secret", Some("org@columbia.edu"), 3600)).await,
            Err(StudyGroupsError::Identity(IdentityError::InvalidToken))
        );
        assert_matches!(
            service.authenticate(&token("super-secret", Some("org@columbia.edu"), -3600)).await,
            Err(StudyGroupsError::Identity(IdentityError::InvalidToken))
        );
    }

    #[tokio::test]
    async fn test_token_without_email_is_refused() {
        let service = service_with_secret("super-secret");
        assert_matches!(
            service.authenticate(&token("super-secret", None, 3600)).await,
            Err(StudyGroupsError::Authentication(_))
        );
    }

    #[tokio::test]
    async fn test_prune_idle_state_drops_expired_flows() {
        let mut config = Settings::default().auth;
        config.jwt_secret = Some("super-secret".to_string());
        let identity = IdentityClient::new(config.clone()).unwrap();
        let flows = LoginFlowStorage::in_memory(0);
        let service = AuthService::new(identity, flows.clone(), None, config);

        let flow = LoginFlow::new(LoginMethod::Otp);
        flows.save(&flow).await.unwrap();

        service.prune_idle_state().await;
        assert_eq!(flows.prune_expired().await, 0);
    }

    #[tokio::test]
    async fn test_otp_start_requires_campus_email() {
        let service = service_with_secret("super-secret");
        assert_matches!(
            service.start_otp("someone@gmail.com").await,
            Err(StudyGroupsError::Validation(m)) if m == "Please use your @columbia.edu or @barnard.edu email"
        );
    }
}
