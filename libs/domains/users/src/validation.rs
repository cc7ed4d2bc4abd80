//! Field validation for user payloads.
//!
//! Unlike a fail-fast validator, every failing field is collected with all
//! of its reasons so a single 400 response can report the complete
//! picture. The uniqueness lookup is NOT done here: it needs the
//! repository and only runs when the email's syntax passed (see
//! `UserService`).

use validator::ValidateEmail;

use crate::error::FieldErrors;
use crate::models::{UserChanges, UserPayload};

pub const NAME_MAX_LEN: usize = 255;
pub const EMAIL_MAX_LEN: usize = 254;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_INVALID_EMAIL: &str = "Enter a valid email address.";
pub const MSG_DUPLICATE_EMAIL: &str = "A user with this email already exists.";

pub fn max_length_message(limit: usize) -> String {
    format!("Ensure this field has no more than {} characters.", limit)
}

/// Outcome of checking a payload: the fields that validated, normalized,
/// plus every failure encountered.
#[derive(Debug, Default)]
pub struct Checked {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub errors: FieldErrors,
}

impl Checked {
    pub fn into_changes(self) -> UserChanges {
        UserChanges {
            name: self.name,
            email: self.email,
            is_active: self.is_active,
        }
    }
}

/// Validate a create payload: name and email are required, is_active is
/// optional (the caller defaults it to true).
pub fn check_create(payload: &UserPayload) -> Checked {
    let mut out = Checked::default();

    match payload.name.as_deref() {
        Some(raw) => out.name = check_name(raw, &mut out.errors),
        None => out.errors.add("name", MSG_REQUIRED),
    }

    match payload.email.as_deref() {
        Some(raw) => out.email = check_email(raw, &mut out.errors),
        None => out.errors.add("email", MSG_REQUIRED),
    }

    out.is_active = payload.is_active;
    out
}

/// Validate an update payload.
///
/// A full update (PUT) requires every field; a partial update (PATCH) only
/// looks at what was supplied.
pub fn check_update(payload: &UserPayload, partial: bool) -> Checked {
    let mut out = Checked::default();

    match payload.name.as_deref() {
        Some(raw) => out.name = check_name(raw, &mut out.errors),
        None if !partial => out.errors.add("name", MSG_REQUIRED),
        None => {}
    }

    match payload.email.as_deref() {
        Some(raw) => out.email = check_email(raw, &mut out.errors),
        None if !partial => out.errors.add("email", MSG_REQUIRED),
        None => {}
    }

    match payload.is_active {
        Some(flag) => out.is_active = Some(flag),
        None if !partial => out.errors.add("is_active", MSG_REQUIRED),
        None => {}
    }

    out
}

/// Trim first, then reject blank or overlong names.
fn check_name(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        errors.add("name", MSG_BLANK);
        return None;
    }
    if trimmed.chars().count() > NAME_MAX_LEN {
        errors.add("name", max_length_message(NAME_MAX_LEN));
        return None;
    }

    Some(trimmed.to_string())
}

/// Trim and lowercase, then check syntax and length. Both failures are
/// reported together when both apply.
fn check_email(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let normalized = raw.trim().to_lowercase();

    if normalized.is_empty() {
        errors.add("email", MSG_BLANK);
        return None;
    }

    let mut valid = true;
    if !normalized.validate_email() {
        errors.add("email", MSG_INVALID_EMAIL);
        valid = false;
    }
    if normalized.chars().count() > EMAIL_MAX_LEN {
        errors.add("email", max_length_message(EMAIL_MAX_LEN));
        valid = false;
    }

    valid.then_some(normalized)
}
