//! Input validation for campus emails, participant names and group forms

use std::sync::OnceLock;

use regex::Regex;

use crate::utils::errors::{Result, StudyGroupsError};

/// Maximum participant name length after trimming
pub const MAX_NAME_LENGTH: usize = 100;

/// Length of the one-time login code sent by the identity provider
pub const OTP_CODE_LENGTH: usize = 8;

fn campus_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)^[a-z0-9._%+-]+@columbia\.edu$").expect("valid columbia pattern"),
            Regex::new(r"(?i)^[a-z0-9._%+-]+@barnard\.edu$").expect("valid barnard pattern"),
        ]
    })
}

/// Trim and lowercase an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accepts Columbia and Barnard addresses, ignoring case and surrounding whitespace
pub fn is_campus_email(email: &str) -> bool {
    let normalized = normalize_email(email);
    campus_patterns().iter().any(|pattern| pattern.is_match(&normalized))
}

/// Returns the most relevant problem with an email address, if any
pub fn email_error(email: &str) -> Option<&'static str> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Some("Email is required");
    }

    if !trimmed.contains('@') {
        return Some("Please enter a valid email address");
    }

    if !is_campus_email(trimmed) {
        return Some("Please use your @columbia.edu or @barnard.edu email");
    }

    None
}

/// Validate a campus email, returning its normalized form
pub fn validate_campus_email(email: &str) -> Result<String> {
    match email_error(email) {
        Some(message) => Err(StudyGroupsError::Validation(message.to_string())),
        None => Ok(normalize_email(email)),
    }
}

pub fn is_valid_name(name: &str) -> bool {
    name_error(name).is_none()
}

pub fn name_error(name: &str) -> Option<&'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Some("Name is required");
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Some("Name must be 100 characters or less");
    }

    None
}

/// Validate a participant name, returning it trimmed
pub fn validate_name(name: &str) -> Result<String> {
    match name_error(name) {
        Some(message) => Err(StudyGroupsError::Validation(message.to_string())),
        None => Ok(name.trim().to_string()),
    }
}

/// A login code is exactly eight ASCII digits
pub fn is_valid_otp_code(code: &str) -> bool {
    code.len() == OTP_CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// Trim an optional free-text field, mapping blank input to `None`
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
