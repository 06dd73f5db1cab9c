//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod participant;
pub mod study_group;

// Re-export repositories
pub use participant::ParticipantRepository;
pub use study_group::StudyGroupRepository;
