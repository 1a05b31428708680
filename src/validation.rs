// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Input validation applied before anything reaches the database

use crate::constants::messages::{
    ACTIVITY_TYPE_REQUIRED, MAX_DURATION_MINUTES, MAX_USERNAME_LEN, MIN_PASSWORD_LEN,
};
use crate::errors::ApiError;
use crate::models::{ActivityInput, ActivityKind};

/// Validate client-supplied activity fields
///
/// Rules are checked in order (kind, duration, distance) and the first
/// failure is returned. Calories need no check: the field is unsigned.
pub fn validate_activity(input: &ActivityInput) -> Result<ActivityKind, ApiError> {
    let kind = validate_activity_kind(&input.activity_type)?;

    if input.duration <= 0 || input.duration > MAX_DURATION_MINUTES {
        return Err(ApiError::InvalidDuration);
    }

    if input.distance < 0.0 || input.distance.is_nan() {
        return Err(ApiError::InvalidDistance);
    }

    Ok(kind)
}

/// Parse an activity kind, rejecting empty and unrecognized values
pub fn validate_activity_kind(value: &str) -> Result<ActivityKind, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidActivityKind(ACTIVITY_TYPE_REQUIRED.to_string()));
    }
    value
        .parse::<ActivityKind>()
        .map_err(|e| ApiError::InvalidActivityKind(e.to_string()))
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::validation("username", "This field may not be blank."));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::validation(
            "username",
            format!("Ensure this field has no more than {MAX_USERNAME_LEN} characters."),
        ));
    }
    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::validation("email", "Enter a valid email address."))
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(ApiError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long."),
        ))
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.len() <= 5 || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
