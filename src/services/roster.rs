//! Membership-gated roster lookups
//!
//! A requester only sees who else joined a group when they are a participant
//! or its organizer. Lookups are lazy and memoised per (group, requester)
//! until a change notification for the group invalidates them.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::database::ParticipantRepository;
use crate::models::participant::ParticipantSummary;
use crate::utils::errors::Result;
use crate::utils::validation::normalize_email;

/// Most rosters kept at once; the oldest entry is evicted first
pub const DEFAULT_ROSTER_CAPACITY: usize = 1024;

type RosterKey = (Uuid, String);

/// Generation of a group's cached data at lookup time.
///
/// A lookup may only be stored if nothing invalidated the group meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    epoch: u64,
    generation: u64,
}

#[derive(Debug, Default)]
struct RosterEntries {
    rosters: HashMap<RosterKey, Vec<ParticipantSummary>>,
    order: VecDeque<RosterKey>,
    generations: HashMap<Uuid, u64>,
    epoch: u64,
}

impl RosterEntries {
    fn stamp(&self, group_id: Uuid) -> Stamp {
        Stamp {
            epoch: self.epoch,
            generation: self.generations.get(&group_id).copied().unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RosterCache {
    participants: ParticipantRepository,
    entries: Arc<RwLock<RosterEntries>>,
    capacity: usize,
}

impl RosterCache {
    pub fn new(participants: ParticipantRepository) -> Self {
        Self::with_capacity(participants, DEFAULT_ROSTER_CAPACITY)
    }

    pub fn with_capacity(participants: ParticipantRepository, capacity: usize) -> Self {
        Self {
            participants,
            entries: Arc::new(RwLock::new(RosterEntries::default())),
            capacity: capacity.max(1),
        }
    }

    /// Roster of `group_id` as seen by `requester_email`; empty for non-members
    pub async fn roster(&self, group_id: Uuid, requester_email: &str) -> Result<Vec<ParticipantSummary>> {
        let key = (group_id, normalize_email(requester_email));

        let stamp = {
            let entries = self.entries.read().await;
            if let Some(cached) = entries.rosters.get(&key) {
                debug!(group_id = %group_id, "Roster served from cache");
                return Ok(cached.clone());
            }
            entries.stamp(group_id)
        };

        let roster = self.participants.roster_if_member(group_id, &key.1).await?;
        self.store(key, roster.clone(), stamp).await;
        Ok(roster)
    }

    async fn store(&self, key: RosterKey, roster: Vec<ParticipantSummary>, stamp: Stamp) -> bool {
        let mut entries = self.entries.write().await;

        if entries.stamp(key.0) != stamp {
            debug!(group_id = %key.0, "Group changed during roster lookup, not caching");
            return false;
        }

        if entries.rosters.insert(key.clone(), roster).is_none() {
            entries.order.push_back(key);
        }

        while entries.rosters.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.rosters.remove(&oldest);
                }
                None => break,
            }
        }
        true
    }

    /// Drop every cached roster of `group_id`, including lookups still in flight
    pub async fn invalidate(&self, group_id: Uuid) {
        let mut entries = self.entries.write().await;
        *entries.generations.entry(group_id).or_default() += 1;
        entries.rosters.retain(|(id, _), _| *id != group_id);
        entries.order.retain(|(id, _)| *id != group_id);
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.epoch += 1;
        entries.generations.clear();
        entries.rosters.clear();
        entries.order.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.rosters.len()
    }

    #[cfg(test)]
    pub(crate) async fn prime(&self, group_id: Uuid, email: &str, roster: Vec<ParticipantSummary>) {
        let stamp = self.entries.read().await.stamp(group_id);
        self.store((group_id, normalize_email(email)), roster, stamp).await;
    }

    #[cfg(test)]
    pub(crate) async fn is_cached(&self, group_id: Uuid, email: &str) -> bool {
        self.entries
            .read()
            .await
            .rosters
            .contains_key(&(group_id, normalize_email(email)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::{create_lazy_pool, DatabasePool};
    use chrono::Utc;

    /// Never queried; connecting would stall until the acquire timeout
    pub(crate) fn unreachable_pool() -> DatabasePool {
        create_lazy_pool(&DatabaseConfig {
            url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
            max_connections: 1,
            min_connections: 0,
        })
        .unwrap()
    }

    fn unreachable_participants() -> ParticipantRepository {
        ParticipantRepository::new(unreachable_pool())
    }

    fn cache() -> RosterCache {
        RosterCache::new(unreachable_participants())
    }

    pub(crate) fn entry(name: &str) -> ParticipantSummary {
        ParticipantSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@columbia.edu", name.to_lowercase()),
            joined_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cached_roster_is_keyed_by_normalized_email() {
        let cache = cache();
        let group_id = Uuid::new_v4();
        cache.prime(group_id, "ab1234@columbia.edu", vec![entry("Ann")]).await;

        let roster = cache.roster(group_id, "  AB1234@Columbia.edu ").await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, "Ann");
    }

    #[tokio::test]
    async fn test_invalidate_only_touches_one_group() {
        let cache = cache();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        cache.prime(first, "a@columbia.edu", vec![entry("Ann")]).await;
        cache.prime(first, "b@columbia.edu", vec![entry("Ann")]).await;
        cache.prime(second, "a@columbia.edu", vec![]).await;

        cache.invalidate(first).await;
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_lookup_overtaken_by_invalidation_is_not_cached() {
        let cache = cache();
        let group_id = Uuid::new_v4();
        let key = (group_id, "new@columbia.edu".to_string());

        // a lookup starts, then a join invalidates the group before it finishes
        let stamp = cache.entries.read().await.stamp(group_id);
        cache.invalidate(group_id).await;
        assert!(!cache.store(key.clone(), vec![], stamp).await);
        assert!(!cache.is_cached(group_id, "new@columbia.edu").await);

        let stamp = cache.entries.read().await.stamp(group_id);
        cache.clear().await;
        assert!(!cache.store(key.clone(), vec![], stamp).await);

        let stamp = cache.entries.read().await.stamp(group_id);
        assert!(cache.store(key, vec![entry("New")], stamp).await);
        assert!(cache.is_cached(group_id, "new@columbia.edu").await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_entries() {
        let cache = RosterCache::with_capacity(unreachable_participants(), 2);
        let group_id = Uuid::new_v4();

        cache.prime(group_id, "a@columbia.edu", vec![]).await;
        cache.prime(group_id, "b@columbia.edu", vec![]).await;
        cache.prime(group_id, "c@columbia.edu", vec![]).await;
        cache.prime(group_id, "c@columbia.edu", vec![entry("Cy")]).await;

        assert_eq!(cache.len().await, 2);
        assert!(!cache.is_cached(group_id, "a@columbia.edu").await);
        assert!(cache.is_cached(group_id, "b@columbia.edu").await);
        assert!(cache.is_cached(group_id, "c@columbia.edu").await);
    }
}
