//! Credential validation for authentication flows.
//!
//! Rules run in a fixed order and report the first violation, so the caller
//! always surfaces a single actionable message at a time.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::FlowKind;
use crate::models::CredentialInput;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern compiles")
});

/// Which credential field a validation failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    Username,
    Email,
    Password,
    ConfirmPassword,
}

/// A single credential rule violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: CredentialField,
    pub message: String,
}

impl ValidationError {
    fn new(field: CredentialField, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// Validate credential input for the given flow.
///
/// Login flows only check the username and password; registration flows
/// additionally require a well-formed email and a matching confirmation.
pub fn validate_credentials(input: &CredentialInput, kind: FlowKind) -> Result<(), ValidationError> {
    validate_username(&input.username)?;

    if kind == FlowKind::Registration {
        validate_email(input.email.as_deref())?;
    }

    validate_password(&input.password)?;

    if kind == FlowKind::Registration {
        let confirmation = input.confirm_password.as_deref().unwrap_or("");
        if confirmation != input.password {
            return Err(ValidationError::new(
                CredentialField::ConfirmPassword,
                "Passwords do not match",
            ));
        }
    }

    Ok(())
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().count() < 3 {
        return Err(ValidationError::new(
            CredentialField::Username,
            "Username must be at least 3 characters",
        ));
    }
    if username.chars().count() > 20 {
        return Err(ValidationError::new(
            CredentialField::Username,
            "Username must be at most 20 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::new(
            CredentialField::Username,
            "Username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(())
}

fn validate_email(email: Option<&str>) -> Result<(), ValidationError> {
    let email = email.unwrap_or("").trim();
    if email.is_empty() {
        return Err(ValidationError::new(
            CredentialField::Email,
            "Email is required",
        ));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::new(
            CredentialField::Email,
            "Please enter a valid email address",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    // Composition rules (case, digits) are the service's call; the client
    // only refuses input that is too short to ever be accepted.
    if password.chars().count() < 8 {
        return Err(ValidationError::new(
            CredentialField::Password,
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}
