//! Study group model

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::{Result, StudyGroupsError};
use crate::utils::timezone::campus_datetime;
use crate::utils::validation::{normalize_email, optional_text};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct StudyGroup {
    pub id: Uuid,
    pub subject: String,
    pub description: Option<String>,
    pub professor_name: Option<String>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub student_limit: Option<i32>,
    pub organizer_name: Option<String>,
    pub organizer_email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StudyGroup {
    /// Ownership is a case-insensitive match on the organizer email
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.organizer_email.eq_ignore_ascii_case(email.trim())
    }
}

/// Row shape returned by listing queries that join in the participant count
#[derive(Debug, Clone, FromRow)]
pub struct StudyGroupCountRow {
    #[sqlx(flatten)]
    pub group: StudyGroup,
    pub participant_count: i64,
}

/// Public view of a study group with its live participant count.
///
/// Omits the organizer email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyGroupWithCounts {
    pub id: Uuid,
    pub subject: String,
    pub description: Option<String>,
    pub professor_name: Option<String>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub student_limit: Option<i32>,
    pub organizer_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub participant_count: i64,
    pub is_full: bool,
}

impl StudyGroupWithCounts {
    pub fn from_group(group: StudyGroup, participant_count: i64) -> Self {
        Self {
            is_full: is_full(group.student_limit, participant_count),
            id: group.id,
            subject: group.subject,
            description: group.description,
            professor_name: group.professor_name,
            location: group.location,
            start_time: group.start_time,
            end_time: group.end_time,
            student_limit: group.student_limit,
            organizer_name: group.organizer_name,
            created_at: group.created_at,
            expires_at: group.expires_at,
            participant_count,
        }
    }

    /// Seats left, or `None` for groups without a limit
    pub fn spots_remaining(&self) -> Option<i64> {
        self.student_limit
            .map(|limit| (i64::from(limit) - self.participant_count).max(0))
    }
}

impl From<StudyGroupCountRow> for StudyGroupWithCounts {
    fn from(row: StudyGroupCountRow) -> Self {
        Self::from_group(row.group, row.participant_count)
    }
}

/// A group is full once its participant count reaches the limit; unlimited groups never fill
pub fn is_full(student_limit: Option<i32>, participant_count: i64) -> bool {
    student_limit.map_or(false, |limit| participant_count >= i64::from(limit))
}

/// Organizer input for creating or updating a group.
///
/// Date and clock times are wall-clock values on campus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupForm {
    pub subject: String,
    pub description: Option<String>,
    pub professor_name: Option<String>,
    pub location: String,
    pub date: NaiveDate,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    pub student_limit: Option<i32>,
    pub organizer_name: Option<String>,
}

/// Validated values ready for insertion or update
#[derive(Debug, Clone, PartialEq)]
pub struct StudyGroupDraft {
    pub subject: String,
    pub description: Option<String>,
    pub professor_name: Option<String>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub student_limit: Option<i32>,
    pub organizer_name: Option<String>,
    pub organizer_email: String,
}

impl GroupForm {
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() {
            return Err(StudyGroupsError::Validation(
                "Please select or enter a subject".to_string(),
            ));
        }

        if self.location.trim().is_empty() {
            return Err(StudyGroupsError::Validation("Please enter a location".to_string()));
        }

        if self.start_time >= self.end_time {
            return Err(StudyGroupsError::Validation(
                "End time must be after start time".to_string(),
            ));
        }

        if matches!(self.student_limit, Some(limit) if limit <= 0) {
            return Err(StudyGroupsError::Validation(
                "Student limit must be a positive number".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate and resolve the form into absolute timestamps for `organizer_email`
    pub fn into_draft(self, organizer_email: &str) -> Result<StudyGroupDraft> {
        self.validate()?;

        let start_time = campus_datetime(self.date, self.start_time)?;
        let end_time = campus_datetime(self.date, self.end_time)?;

        Ok(StudyGroupDraft {
            subject: self.subject.trim().to_string(),
            description: optional_text(self.description),
            professor_name: optional_text(self.professor_name),
            location: self.location.trim().to_string(),
            start_time,
            end_time,
            student_limit: self.student_limit,
            organizer_name: optional_text(self.organizer_name),
            organizer_email: normalize_email(organizer_email),
        })
    }
}

/// `HH:MM` clock times as submitted by time pickers; seconds are accepted too
mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let value = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
