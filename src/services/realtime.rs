//! Realtime feed of active study groups
//!
//! Database triggers publish every change to `study_group_changes`. Each
//! notification invalidates cached rosters of the affected group; bursts are
//! coalesced and followed by a full refetch of the active listing, which is
//! stored as the current snapshot and broadcast to subscribers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::postgres::PgListener;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::{DatabasePool, StudyGroupRepository};
use crate::models::study_group::StudyGroupWithCounts;
use crate::services::roster::RosterCache;
use crate::services::search::Debouncer;
use crate::utils::errors::Result;

pub const CHANGE_CHANNEL: &str = "study_group_changes";

const BROADCAST_CAPACITY: usize = 16;

/// Floor for the wait until the next group ends, in case clocks disagree
const MIN_EXPIRY_WAIT: Duration = Duration::from_secs(1);

pub type Snapshot = Arc<Vec<StudyGroupWithCounts>>;

/// Payload of a change notification
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub operation: String,
    pub study_group_id: Option<Uuid>,
}

impl ChangeEvent {
    pub fn parse(payload: &str) -> Option<Self> {
        match serde_json::from_str(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(payload = payload, error = %e, "Ignoring malformed change notification");
                None
            }
        }
    }
}

/// Groups of `snapshot` that have not ended at `now`
pub fn active_at(snapshot: Snapshot, now: DateTime<Utc>) -> Snapshot {
    if snapshot.iter().all(|group| group.end_time > now) {
        return snapshot;
    }

    Arc::new(snapshot.iter().filter(|group| group.end_time > now).cloned().collect())
}

/// When the first group in the listing ends
fn next_end(groups: &[StudyGroupWithCounts]) -> Option<DateTime<Utc>> {
    groups.iter().map(|group| group.end_time).min()
}

#[derive(Clone)]
pub struct GroupFeed {
    groups: StudyGroupRepository,
    roster: RosterCache,
    snapshot: Arc<RwLock<Option<Snapshot>>>,
    sender: broadcast::Sender<Snapshot>,
    live: bool,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for GroupFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupFeed")
            .field("live", &self.live)
            .field("connected", &self.is_connected())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl GroupFeed {
    /// A `live` feed trusts its snapshot between notifications, but only while
    /// its listener is connected. Otherwise every read refetches.
    pub fn new(groups: StudyGroupRepository, roster: RosterCache, live: bool) -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            groups,
            roster,
            snapshot: Arc::new(RwLock::new(None)),
            sender,
            live,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.sender.subscribe()
    }

    /// Whether a change listener is currently connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn trusts_snapshot(&self) -> bool {
        self.live && self.is_connected()
    }

    /// Current active listing. Groups that ended since the last refetch are left out.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        if self.trusts_snapshot() {
            let current = self.snapshot.read().await.clone();
            if let Some(current) = current {
                return Ok(active_at(current, Utc::now()));
            }
        }

        self.refresh().await
    }

    /// Refetch the active listing, replace the snapshot and notify subscribers
    pub async fn refresh(&self) -> Result<Snapshot> {
        let groups = self.groups.list_active_with_counts().await?;
        Ok(self.publish(groups).await)
    }

    async fn publish(&self, groups: Vec<StudyGroupWithCounts>) -> Snapshot {
        let groups = Arc::new(groups);
        *self.snapshot.write().await = Some(groups.clone());

        // no subscribers is fine
        let _ = self.sender.send(groups.clone());
        debug!(count = groups.len(), "Active group snapshot refreshed");
        groups
    }

    /// Apply the cache side effects of a single notification
    pub async fn handle_change(&self, event: &ChangeEvent) {
        debug!(table = %event.table, operation = %event.operation, group_id = ?event.study_group_id, "Study group change");

        match event.study_group_id {
            Some(group_id) => self.roster.invalidate(group_id).await,
            None => self.roster.clear().await,
        }
    }

    /// Listen for change notifications until the connection fails.
    ///
    /// While disconnected the feed falls back to refetching on every read.
    pub async fn run_listener(self, pool: DatabasePool, debounce: Duration) -> Result<()> {
        let result = self.listen(pool, debounce).await;

        if self.connected.swap(false, Ordering::AcqRel) {
            warn!(channel = CHANGE_CHANNEL, "Change listener disconnected");
        }
        result
    }

    async fn listen(&self, pool: DatabasePool, debounce: Duration) -> Result<()> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        // changes made while nobody was listening were never delivered
        self.refresh().await?;
        self.roster.clear().await;
        self.connected.store(true, Ordering::Release);
        info!(channel = CHANGE_CHANNEL, "Listening for study group changes");

        let feed = self.clone();
        let refetch = Debouncer::new(debounce, move |()| {
            let feed = feed.clone();
            tokio::spawn(async move {
                if let Err(e) = feed.refresh().await {
                    error!(error = %e, "Failed to refresh active groups");
                }
            });
        });

        loop {
            let wait = self.until_next_end().await;

            tokio::select! {
                notification = listener.recv() => {
                    let notification = notification?;
                    if let Some(event) = ChangeEvent::parse(notification.payload()) {
                        self.handle_change(&event).await;
                    }
                    refetch.push(());
                }
                _ = sleep_or_wait_forever(wait) => {
                    debug!("A study group ended, refreshing the listing");
                    if let Err(e) = self.refresh().await {
                        error!(error = %e, "Failed to refresh active groups");
                    }
                }
            }
        }
    }

    async fn until_next_end(&self) -> Option<Duration> {
        let snapshot = self.snapshot.read().await;
        let end = next_end(snapshot.as_deref()?)?;
        let wait = (end - Utc::now()).to_std().unwrap_or_default();
        Some(wait.max(MIN_EXPIRY_WAIT))
    }
}

async fn sleep_or_wait_forever(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending().await,
    }
}
