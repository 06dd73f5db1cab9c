//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod auth;
pub mod participant;
pub mod study_group;

// Re-export commonly used models
pub use auth::{AuthSession, IdentityUser, Organizer, TokenResponse};
pub use participant::{JoinRequest, LeaveRequest, Participant, ParticipantSummary};
pub use study_group::{GroupForm, StudyGroup, StudyGroupDraft, StudyGroupWithCounts};
