//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod identity;
pub mod notification;
pub mod organizer;
pub mod realtime;
pub mod redis;
pub mod roster;
pub mod search;
pub mod study_groups;

// Re-export commonly used services
pub use auth::{AuthService, VerifyOutcome};
pub use identity::IdentityClient;
pub use notification::{NotificationOutcome, NotificationService, NotificationStats, ParticipantNotice};
pub use organizer::OrganizerService;
pub use realtime::{ChangeEvent, GroupFeed, Snapshot};
pub use redis::RedisService;
pub use roster::RosterCache;
pub use search::{filter_groups, Debouncer};
pub use study_groups::{GroupDetail, StudyGroupService};

use serde::Serialize;

use crate::config::settings::Settings;
use crate::database::{self, DatabaseService};
use crate::state::storage::LoginFlowStorage;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone, Debug)]
pub struct ServiceFactory {
    pub study_groups: StudyGroupService,
    pub organizer: OrganizerService,
    pub auth: AuthService,
    pub notifications: NotificationService,
    pub feed: GroupFeed,
    pub roster: RosterCache,
    pub redis: Option<RedisService>,
}

impl ServiceFactory {
    /// Wire every service on top of one database handle.
    ///
    /// Without Redis, provider-verified tokens are not cached.
    pub fn new(
        settings: &Settings,
        database: DatabaseService,
        flows: LoginFlowStorage,
        redis: Option<RedisService>,
    ) -> Result<Self> {
        let roster = RosterCache::new(database.participants.clone());
        let feed = GroupFeed::new(database.groups.clone(), roster.clone(), settings.features.realtime);
        let notifications = NotificationService::new(settings.email.clone(), settings.campus.clone())?;

        let identity = IdentityClient::new(settings.auth.clone())?;
        let auth = AuthService::new(identity, flows, redis.clone(), settings.auth.clone());

        let study_groups = StudyGroupService::new(database.clone(), feed.clone(), roster.clone(), notifications.clone());
        let organizer = OrganizerService::new(database);

        Ok(Self {
            study_groups,
            organizer,
            auth,
            notifications,
            feed,
            roster,
            redis,
        })
    }

    /// Health check for all services
    pub async fn health_check(&self, database: &DatabaseService) -> ServiceHealthStatus {
        let database_healthy = database::health_check(database.pool()).await.is_ok();
        let redis_healthy = match &self.redis {
            Some(redis) => Some(redis.health_check().await.unwrap_or(false)),
            None => None,
        };

        ServiceHealthStatus {
            database_healthy,
            redis_healthy,
            email_enabled: self.notifications.is_enabled(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    /// `None` when no Redis is configured
    pub redis_healthy: Option<bool>,
    pub email_enabled: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy && self.redis_healthy.unwrap_or(true)
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if self.redis_healthy == Some(false) {
            issues.push("Redis connection failed".to_string());
        }

        issues
    }
}
