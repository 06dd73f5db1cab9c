//! Utility modules
//!
//! This module contains common utilities used throughout the application,
//! including error handling, logging setup, validation and time formatting.

pub mod errors;
pub mod helpers;
pub mod logging;
pub mod timezone;
pub mod validation;

pub use errors::{Result, StudyGroupsError};
