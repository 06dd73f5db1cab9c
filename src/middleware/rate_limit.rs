//! Rate limiting for login code requests
//!
//! Each email address may only ask the identity provider for a limited
//! number of codes or links per minute.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};

use crate::utils::errors::{Result, StudyGroupsError};
use crate::utils::validation::normalize_email;

/// Keyed limiter on normalized email addresses
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    per_minute: u32,
}

impl std::fmt::Debug for RateLimitMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitMiddleware")
            .field("per_minute", &self.per_minute)
            .finish()
    }
}

impl RateLimitMiddleware {
    pub fn per_minute(requests: u32) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(burst))),
            per_minute: burst.get(),
        }
    }

    /// Check if this email may request another code
    pub fn check_email(&self, email: &str) -> Result<()> {
        let key = normalize_email(email);

        match self.limiter.check_key(&key) {
            Ok(()) => {
                debug!(email = %key, "Rate limit check passed");
                Ok(())
            }
            Err(_) => {
                warn!(email = %key, "Rate limit exceeded");
                Err(StudyGroupsError::RateLimitExceeded)
            }
        }
    }

    /// Forget addresses whose quota has fully replenished; returns how many remain tracked
    pub fn retain_recent(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_limit_is_per_email() {
        let limiter = RateLimitMiddleware::per_minute(2);

        assert!(limiter.check_email("a@columbia.edu").is_ok());
        assert!(limiter.check_email(" A@Columbia.edu ").is_ok());
        assert_matches!(
            limiter.check_email("a@columbia.edu"),
            Err(StudyGroupsError::RateLimitExceeded)
        );

        assert!(limiter.check_email("b@columbia.edu").is_ok());
    }

    #[test]
    fn test_retain_recent_keeps_limited_addresses() {
        let limiter = RateLimitMiddleware::per_minute(1);
        assert_eq!(limiter.retain_recent(), 0);

        assert!(limiter.check_email("a@columbia.edu").is_ok());
        assert!(limiter.check_email("b@columbia.edu").is_ok());
        assert_eq!(limiter.retain_recent(), 2);

        assert_matches!(
            limiter.check_email("a@columbia.edu"),
            Err(StudyGroupsError::RateLimitExceeded)
        );
    }
}
