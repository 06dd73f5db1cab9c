//! Student-facing study group operations: browse, search, join and leave

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::DatabaseService;
use crate::models::participant::{JoinRequest, Participant, ParticipantSummary};
use crate::models::study_group::{StudyGroup, StudyGroupWithCounts};
use crate::services::notification::{NotificationService, ParticipantNotice};
use crate::services::realtime::GroupFeed;
use crate::services::roster::RosterCache;
use crate::services::search::filter_groups;
use crate::utils::errors::{Result, StudyGroupsError};
use crate::utils::logging::log_participant_action;
use crate::utils::validation::validate_campus_email;

/// A group page: the group itself plus its roster when the viewer may see it
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    pub group: StudyGroupWithCounts,
    pub is_member: bool,
    pub participants: Vec<ParticipantSummary>,
}

#[derive(Clone, Debug)]
pub struct StudyGroupService {
    database: DatabaseService,
    feed: GroupFeed,
    roster: RosterCache,
    notifications: NotificationService,
}

impl StudyGroupService {
    pub fn new(
        database: DatabaseService,
        feed: GroupFeed,
        roster: RosterCache,
        notifications: NotificationService,
    ) -> Self {
        Self {
            database,
            feed,
            roster,
            notifications,
        }
    }

    /// Active groups, soonest first, filtered by `query` over the current snapshot
    pub async fn list_active(&self, query: Option<&str>) -> Result<Vec<StudyGroupWithCounts>> {
        let snapshot = self.feed.snapshot().await?;
        Ok(filter_groups(&snapshot, query.unwrap_or_default()))
    }

    pub async fn group_detail(&self, group_id: Uuid, viewer_email: Option<&str>) -> Result<GroupDetail> {
        let group = self
            .database
            .groups
            .find_with_counts(group_id)
            .await?
            .ok_or(StudyGroupsError::GroupNotFound { group_id })?;

        let participants = match viewer_email {
            Some(email) => self.roster.roster(group_id, email).await?,
            None => Vec::new(),
        };

        let is_member = match viewer_email {
            Some(_) if !participants.is_empty() => true,
            Some(email) => self.database.participants.is_member(group_id, email).await?,
            None => false,
        };

        Ok(GroupDetail {
            group,
            is_member,
            participants,
        })
    }

    /// Gated roster for a visitor identified by their remembered email
    pub async fn participants(&self, group_id: Uuid, viewer_email: &str) -> Result<Vec<ParticipantSummary>> {
        self.roster.roster(group_id, viewer_email).await
    }

    /// Validate and insert a participant, then fire off the join emails
    pub async fn join(&self, group_id: Uuid, request: JoinRequest) -> Result<Participant> {
        let (name, email) = request.validate()?;

        let group = self.find_group(group_id).await?;

        let participant = self.database.participants.join(group_id, &name, &email).await?;
        self.roster.invalidate(group_id).await;
        log_participant_action(group_id, "joined", &participant.email);

        if self.notifications.is_enabled() {
            let groups = self.database.groups.clone();
            let notifications = self.notifications.clone();
            let notice = ParticipantNotice {
                name: participant.name.clone(),
                email: participant.email.clone(),
            };
            tokio::spawn(async move {
                let count = match groups.participant_count(group.id).await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(group_id = %group.id, error = %e, "Could not count participants for join notifications");
                        return;
                    }
                };
                if let Err(e) = notifications.on_participant_joined(&group, &notice, count).await {
                    warn!(group_id = %group.id, error = %e, "Join notifications failed");
                }
            });
        }

        Ok(participant)
    }

    /// Remove a participant. Requires explicit confirmation and cannot be undone.
    pub async fn leave(&self, group_id: Uuid, email: &str, confirm: bool) -> Result<()> {
        if !confirm {
            return Err(StudyGroupsError::Validation(
                "Please confirm that you want to leave this study group".to_string(),
            ));
        }

        let email = validate_campus_email(email)?;
        let group = self.find_group(group_id).await?;
        let participant = self.database.participants.find_by_email(group_id, &email).await?;

        if !self.database.participants.leave(group_id, &email).await? {
            return Err(StudyGroupsError::NotAMember { group_id });
        }

        self.roster.invalidate(group_id).await;
        log_participant_action(group_id, "left", &email);

        if let (true, Some(participant)) = (self.notifications.is_enabled(), participant) {
            let notifications = self.notifications.clone();
            tokio::spawn(async move {
                let notice = ParticipantNotice {
                    name: participant.name,
                    email: participant.email,
                };
                if let Err(e) = notifications.on_participant_left(&group, &notice).await {
                    warn!(group_id = %group.id, error = %e, "Leave notifications failed");
                }
            });
        }

        info!(group_id = %group_id, "Participant left study group");
        Ok(())
    }

    async fn find_group(&self, group_id: Uuid) -> Result<StudyGroup> {
        self.database
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(StudyGroupsError::GroupNotFound { group_id })
    }
}
