use crate::error::{DispatchError, Result};

/// Coarse syntactic email check: one `@`, no whitespace, and a dot inside
/// the domain with characters on both sides of it.
///
/// No DNS or mailbox verification is attempted.
pub fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(DispatchError::InvalidEmail("Email is empty".to_string()));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(DispatchError::InvalidEmail(format!(
            "Email must not contain whitespace: {}",
            email
        )));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(DispatchError::InvalidEmail(format!(
            "Email must contain exactly one @: {}",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(DispatchError::InvalidEmail(format!(
            "Email parts cannot be empty: {}",
            email
        )));
    }

    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !has_inner_dot {
        return Err(DispatchError::InvalidEmail(format!(
            "Domain must contain a dot: {}",
            email
        )));
    }

    Ok(())
}

/// Boolean form of [`validate_email`], used by the delivery gate.
pub fn is_valid_email(email: &str) -> bool {
    validate_email(email).is_ok()
}
