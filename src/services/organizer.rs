//! Organizer dashboard operations
//!
//! Every query is scoped to the authenticated organizer's email and every
//! mutation is followed by a full refetch of their groups.

use uuid::Uuid;

use crate::database::DatabaseService;
use crate::models::auth::Organizer;
use crate::models::participant::Participant;
use crate::models::study_group::{GroupForm, StudyGroup, StudyGroupWithCounts};
use crate::utils::errors::{Result, StudyGroupsError};
use crate::utils::logging::log_group_action;

#[derive(Clone, Debug)]
pub struct OrganizerService {
    database: DatabaseService,
}

impl OrganizerService {
    pub fn new(database: DatabaseService) -> Self {
        Self { database }
    }

    /// All of the organizer's groups, past ones included, by start time
    pub async fn list_groups(&self, organizer: &Organizer) -> Result<Vec<StudyGroupWithCounts>> {
        self.database.groups.list_by_organizer(&organizer.email).await
    }

    /// Create a group and return it with the refreshed list
    pub async fn create_group(&self, organizer: &Organizer, form: GroupForm) -> Result<(StudyGroup, Vec<StudyGroupWithCounts>)> {
        let draft = form.into_draft(&organizer.email)?;
        let group = self.database.groups.create(draft).await?;
        log_group_action(group.id, "created", &organizer.email, Some(&group.subject));

        let groups = self.list_groups(organizer).await?;
        Ok((group, groups))
    }

    pub async fn update_group(
        &self,
        organizer: &Organizer,
        group_id: Uuid,
        form: GroupForm,
    ) -> Result<(StudyGroup, Vec<StudyGroupWithCounts>)> {
        let draft = form.into_draft(&organizer.email)?;
        let group = self
            .database
            .groups
            .update_owned(group_id, draft)
            .await?
            .ok_or(StudyGroupsError::AccessDenied { group_id })?;
        log_group_action(group_id, "updated", &organizer.email, None);

        let groups = self.list_groups(organizer).await?;
        Ok((group, groups))
    }

    /// Delete an owned group; its participants go with it
    pub async fn delete_group(&self, organizer: &Organizer, group_id: Uuid) -> Result<Vec<StudyGroupWithCounts>> {
        if !self.database.groups.delete_owned(group_id, &organizer.email).await? {
            return Err(StudyGroupsError::AccessDenied { group_id });
        }
        log_group_action(group_id, "deleted", &organizer.email, None);

        self.list_groups(organizer).await
    }

    /// Participants of a group the organizer owns
    pub async fn participants(&self, organizer: &Organizer, group_id: Uuid) -> Result<Vec<Participant>> {
        let group = self
            .database
            .groups
            .find_by_id(group_id)
            .await?
            .filter(|group| group.is_owned_by(&organizer.email))
            .ok_or(StudyGroupsError::AccessDenied { group_id })?;

        self.database.participants.list_for_group(group.id).await
    }
}
