//! Study group repository implementation

use std::time::Instant;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::study_group::{StudyGroup, StudyGroupCountRow, StudyGroupDraft, StudyGroupWithCounts};
use crate::utils::errors::StudyGroupsError;
use crate::utils::logging::log_database_operation;
use crate::utils::timezone::default_expiry;

const GROUP_COLUMNS: &str = "g.id, g.subject, g.description, g.professor_name, g.location, g.start_time, g.end_time, \
     g.student_limit, g.organizer_name, g.organizer_email, g.created_at, g.expires_at";

#[derive(Debug, Clone)]
pub struct StudyGroupRepository {
    pool: PgPool,
}

impl StudyGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Groups that have not ended yet, soonest first, with participant counts
    pub async fn list_active_with_counts(&self) -> Result<Vec<StudyGroupWithCounts>, StudyGroupsError> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, StudyGroupCountRow>(&format!(
            "SELECT {GROUP_COLUMNS}, get_participant_count(g.id) AS participant_count \
             FROM study_groups g WHERE g.end_time > NOW() ORDER BY g.start_time ASC"
        ))
        .fetch_all(&self.pool)
        .await;

        log_database_operation(
            "list_active",
            "study_groups",
            started.elapsed().as_millis() as u64,
            rows.is_ok(),
        );

        Ok(rows?.into_iter().map(StudyGroupWithCounts::from).collect())
    }

    /// Every group owned by `organizer_email`, past ones included
    pub async fn list_by_organizer(&self, organizer_email: &str) -> Result<Vec<StudyGroupWithCounts>, StudyGroupsError> {
        let rows = sqlx::query_as::<_, StudyGroupCountRow>(&format!(
            "SELECT {GROUP_COLUMNS}, get_participant_count(g.id) AS participant_count \
             FROM study_groups g WHERE LOWER(g.organizer_email) = LOWER($1) ORDER BY g.start_time ASC"
        ))
        .bind(organizer_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StudyGroupWithCounts::from).collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<StudyGroup>, StudyGroupsError> {
        let group = sqlx::query_as::<_, StudyGroup>(&format!(
            "SELECT {GROUP_COLUMNS} FROM study_groups g WHERE g.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    pub async fn find_with_counts(&self, id: Uuid) -> Result<Option<StudyGroupWithCounts>, StudyGroupsError> {
        let row = sqlx::query_as::<_, StudyGroupCountRow>(&format!(
            "SELECT {GROUP_COLUMNS}, get_participant_count(g.id) AS participant_count \
             FROM study_groups g WHERE g.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StudyGroupWithCounts::from))
    }

    /// Insert a new group owned by `draft.organizer_email`
    pub async fn create(&self, draft: StudyGroupDraft) -> Result<StudyGroup, StudyGroupsError> {
        let created_at = Utc::now();
        let group = sqlx::query_as::<_, StudyGroup>(
            r#"
            INSERT INTO study_groups (subject, description, professor_name, location, start_time, end_time,
                                      student_limit, organizer_name, organizer_email, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, subject, description, professor_name, location, start_time, end_time,
                      student_limit, organizer_name, organizer_email, created_at, expires_at
            "#,
        )
        .bind(draft.subject)
        .bind(draft.description)
        .bind(draft.professor_name)
        .bind(draft.location)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.student_limit)
        .bind(draft.organizer_name)
        .bind(draft.organizer_email)
        .bind(created_at)
        .bind(default_expiry(created_at, draft.end_time))
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    /// Update a group if it belongs to `draft.organizer_email`; `None` when not found or not owned.
    ///
    /// `expires_at` follows the new end time the same way it does on insert.
    pub async fn update_owned(&self, id: Uuid, draft: StudyGroupDraft) -> Result<Option<StudyGroup>, StudyGroupsError> {
        let group = sqlx::query_as::<_, StudyGroup>(
            r#"
            UPDATE study_groups
            SET subject = $3,
                description = $4,
                professor_name = $5,
                location = $6,
                start_time = $7,
                end_time = $8,
                student_limit = $9,
                organizer_name = $10,
                expires_at = LEAST(created_at + INTERVAL '24 hours', $8)
            WHERE id = $1 AND LOWER(organizer_email) = LOWER($2)
            RETURNING id, subject, description, professor_name, location, start_time, end_time,
                      student_limit, organizer_name, organizer_email, created_at, expires_at
            "#,
        )
        .bind(id)
        .bind(draft.organizer_email)
        .bind(draft.subject)
        .bind(draft.description)
        .bind(draft.professor_name)
        .bind(draft.location)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.student_limit)
        .bind(draft.organizer_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    /// Delete a group owned by `organizer_email`; participants cascade
    pub async fn delete_owned(&self, id: Uuid, organizer_email: &str) -> Result<bool, StudyGroupsError> {
        let result = sqlx::query(
            "DELETE FROM study_groups WHERE id = $1 AND LOWER(organizer_email) = LOWER($2)",
        )
        .bind(id)
        .bind(organizer_email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn participant_count(&self, id: Uuid) -> Result<i64, StudyGroupsError> {
        let count: i64 = sqlx::query_scalar("SELECT get_participant_count($1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn is_full(&self, id: Uuid) -> Result<bool, StudyGroupsError> {
        let full: bool = sqlx::query_scalar("SELECT is_study_group_full($1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(full)
    }

    /// Delete expired and finished groups, returning how many were removed
    pub async fn cleanup_expired(&self) -> Result<i64, StudyGroupsError> {
        let started = Instant::now();
        let deleted = sqlx::query_scalar::<_, i64>("SELECT cleanup_expired_groups()")
            .fetch_one(&self.pool)
            .await;

        log_database_operation(
            "cleanup_expired",
            "study_groups",
            started.elapsed().as_millis() as u64,
            deleted.is_ok(),
        );

        Ok(deleted?)
    }
}
