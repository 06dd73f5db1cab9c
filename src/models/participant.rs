//! Participant model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::{Result, StudyGroupsError};
use crate::utils::validation::{validate_campus_email, validate_name};

/// SQLSTATE for unique constraint violations
pub const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE raised by the capacity trigger when a group is full
pub const GROUP_FULL: &str = "SGF01";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Participant {
    pub id: Uuid,
    pub study_group_id: Uuid,
    pub name: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

/// Roster entry visible to members of a group
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ParticipantSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantSummary {
    fn from(participant: Participant) -> Self {
        Self {
            id: participant.id,
            name: participant.name,
            email: participant.email,
            joined_at: participant.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub name: String,
    pub email: String,
}

impl JoinRequest {
    /// Validate the form, returning the trimmed name and normalized email
    pub fn validate(&self) -> Result<(String, String)> {
        let name = validate_name(&self.name)?;
        let email = validate_campus_email(&self.email)?;
        Ok((name, email))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// Falls back to the remembered visitor email when absent
    pub email: Option<String>,
    #[serde(default)]
    pub confirm: bool,
}

/// Map a failed participant insert to the error shown to the student.
///
/// Recognised SQLSTATEs win; message matching only applies when the
/// database reported no known code.
pub fn join_rejection(code: Option<&str>, message: &str) -> StudyGroupsError {
    match code {
        Some(UNIQUE_VIOLATION) => StudyGroupsError::AlreadyJoined,
        Some(GROUP_FULL) => StudyGroupsError::GroupFull,
        _ if message.contains("unique") => StudyGroupsError::AlreadyJoined,
        _ if message.contains("full") => StudyGroupsError::GroupFull,
        _ => StudyGroupsError::Rejected(message.to_string()),
    }
}

impl StudyGroupsError {
    /// Reinterpret a database error raised while inserting a participant
    pub fn from_join_failure(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db_error) => {
                join_rejection(db_error.code().as_deref(), db_error.message())
            }
            _ => StudyGroupsError::Database(error),
        }
    }
}
