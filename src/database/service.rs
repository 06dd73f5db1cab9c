//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{DatabasePool, ParticipantRepository, StudyGroupRepository};
use crate::utils::errors::StudyGroupsError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub groups: StudyGroupRepository,
    pub participants: ParticipantRepository,
    pool: DatabasePool,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            groups: StudyGroupRepository::new(pool.clone()),
            participants: ParticipantRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Clean up expired data
    pub async fn cleanup_expired_data(&self) -> Result<serde_json::Value, StudyGroupsError> {
        let expired_groups = self.groups.cleanup_expired().await?;

        let cleanup_result = serde_json::json!({
            "expired_groups_cleaned": expired_groups
        });

        Ok(cleanup_result)
    }

    /// Get system statistics
    pub async fn get_system_stats(&self) -> Result<serde_json::Value, StudyGroupsError> {
        let (active_groups, participants): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM study_groups WHERE end_time > NOW()),
                (SELECT COUNT(*) FROM participants p
                 JOIN study_groups g ON g.id = p.study_group_id
                 WHERE g.end_time > NOW())
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(serde_json::json!({
            "active_groups": active_groups,
            "active_participants": participants
        }))
    }
}
