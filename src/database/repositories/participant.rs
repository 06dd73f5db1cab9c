//! Participant repository implementation

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::participant::{Participant, ParticipantSummary};
use crate::utils::errors::StudyGroupsError;

#[derive(Debug, Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a participant.
    ///
    /// Duplicate and capacity rejections come back as `AlreadyJoined` and
    /// `GroupFull`; any other database refusal is passed through as `Rejected`.
    pub async fn join(&self, study_group_id: Uuid, name: &str, email: &str) -> Result<Participant, StudyGroupsError> {
        sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants (study_group_id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id, study_group_id, name, email, joined_at
            "#,
        )
        .bind(study_group_id)
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(StudyGroupsError::from_join_failure)
    }

    /// Remove the participant matching `email`; returns whether a row was deleted
    pub async fn leave(&self, study_group_id: Uuid, email: &str) -> Result<bool, StudyGroupsError> {
        let result = sqlx::query(
            "DELETE FROM participants WHERE study_group_id = $1 AND LOWER(email) = LOWER($2)",
        )
        .bind(study_group_id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Roster of a group, empty unless `requester_email` is a participant or the organizer
    pub async fn roster_if_member(&self, study_group_id: Uuid, requester_email: &str) -> Result<Vec<ParticipantSummary>, StudyGroupsError> {
        let roster = sqlx::query_as::<_, ParticipantSummary>(
            "SELECT id, name, email, joined_at FROM get_group_participants_if_member($1, $2)",
        )
        .bind(study_group_id)
        .bind(requester_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(roster)
    }

    pub async fn is_member(&self, study_group_id: Uuid, email: &str) -> Result<bool, StudyGroupsError> {
        let member: bool = sqlx::query_scalar("SELECT is_group_member($1, $2)")
            .bind(study_group_id)
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(member)
    }

    /// Full roster without membership gating, for organizer and notification use
    pub async fn list_for_group(&self, study_group_id: Uuid) -> Result<Vec<Participant>, StudyGroupsError> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT id, study_group_id, name, email, joined_at FROM participants WHERE study_group_id = $1 ORDER BY joined_at ASC",
        )
        .bind(study_group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    pub async fn find_by_email(&self, study_group_id: Uuid, email: &str) -> Result<Option<Participant>, StudyGroupsError> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, study_group_id, name, email, joined_at FROM participants WHERE study_group_id = $1 AND LOWER(email) = LOWER($2)",
        )
        .bind(study_group_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }
}
