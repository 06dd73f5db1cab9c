//! Login flow storage
//!
//! Persists in-progress login flows between requests. Redis is used in
//! deployments; the in-memory backend serves single-process setups and tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::login::LoginFlow;
use crate::services::redis::RedisService;
use crate::utils::errors::{Result, StudyGroupsError};

#[derive(Clone)]
enum Backend {
    Redis(RedisService),
    Memory(Arc<Mutex<HashMap<Uuid, (LoginFlow, DateTime<Utc>)>>>),
}

/// Login flow storage with a fixed time-to-live per flow
#[derive(Clone)]
pub struct LoginFlowStorage {
    backend: Backend,
    ttl_seconds: u64,
}

impl std::fmt::Debug for LoginFlowStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Redis(_) => "redis",
            Backend::Memory(_) => "memory",
        };
        f.debug_struct("LoginFlowStorage")
            .field("backend", &backend)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl LoginFlowStorage {
    pub fn redis(redis: RedisService, ttl_seconds: u64) -> Self {
        Self {
            backend: Backend::Redis(redis),
            ttl_seconds,
        }
    }

    pub fn in_memory(ttl_seconds: u64) -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(HashMap::new()))),
            ttl_seconds,
        }
    }

    fn key(id: Uuid) -> String {
        format!("login_flow:{}", id)
    }

    /// Save a flow, restarting its TTL
    pub async fn save(&self, flow: &LoginFlow) -> Result<()> {
        debug!(flow_id = %flow.id, step = flow.step.as_str(), "Saving login flow");

        match &self.backend {
            Backend::Redis(redis) => redis.set(&Self::key(flow.id), flow, Some(self.ttl_seconds)).await,
            Backend::Memory(flows) => {
                let expires_at = Utc::now() + Duration::seconds(self.ttl_seconds as i64);
                flows.lock().await.insert(flow.id, (flow.clone(), expires_at));
                Ok(())
            }
        }
    }

    pub async fn load(&self, id: Uuid) -> Result<Option<LoginFlow>> {
        match &self.backend {
            Backend::Redis(redis) => redis.get(&Self::key(id)).await,
            Backend::Memory(flows) => {
                let mut flows = flows.lock().await;
                let expired = flows.get(&id).map(|(_, expires_at)| *expires_at <= Utc::now());
                if expired == Some(true) {
                    flows.remove(&id);
                    return Ok(None);
                }
                Ok(flows.get(&id).map(|(flow, _)| flow.clone()))
            }
        }
    }

    /// Load a flow that must exist
    pub async fn require(&self, id: Uuid) -> Result<LoginFlow> {
        self.load(id).await?.ok_or(StudyGroupsError::LoginFlowNotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        match &self.backend {
            Backend::Redis(redis) => {
                redis.delete(&Self::key(id)).await?;
            }
            Backend::Memory(flows) => {
                flows.lock().await.remove(&id);
            }
        }
        Ok(())
    }

    /// Drop expired in-memory flows nobody came back for.
    ///
    /// Redis expires keys by itself, so this is a no-op there.
    pub async fn prune_expired(&self) -> usize {
        match &self.backend {
            Backend::Redis(_) => 0,
            Backend::Memory(flows) => {
                let now = Utc::now();
                let mut flows = flows.lock().await;
                let before = flows.len();
                flows.retain(|_, (_, expires_at)| *expires_at > now);
                before - flows.len()
            }
        }
    }
}
