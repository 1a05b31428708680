// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Route Handlers
//!
//! Framework-independent request handlers. Each handler takes the resolved
//! caller plus a typed request and returns either a serializable response or
//! an [`ApiError`]; the warp wiring in [`crate::server`] only moves data in
//! and out of HTTP.
//!
//! Every record-level handler scopes its reads and writes to the caller.
//! A record that does not exist yields `NotFound`; a record owned by another
//! user yields `Forbidden`.

pub mod activities;
pub mod auth;
pub mod metrics;
pub mod notifications;

pub use activities::{ActivityListQuery, ActivityPatch, ActivityResponse, ActivityRoutes};
pub use auth::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest, UpdateUserRequest,
    UserResponse, UserRoutes, AuthRoutes,
};
pub use metrics::{MetricsQuery, MetricsResponse, MetricsRoutes};
pub use notifications::{NotificationInput, NotificationListQuery, NotificationPatch, NotificationRoutes};

use crate::auth::AuthenticatedCaller;
use crate::constants::service::WELCOME_MESSAGE;
use crate::errors::ApiError;
use crate::logging::AppLogger;
use serde::Serialize;
use uuid::Uuid;

/// Body of the public welcome endpoint
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: String,
}

/// Public, unauthenticated welcome message
pub fn home() -> HomeResponse {
    HomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    }
}

/// Fail with `Forbidden` unless the caller owns the record
fn ensure_owner(
    caller: &AuthenticatedCaller,
    owner_id: Uuid,
    resource: &str,
    record_id: Uuid,
) -> Result<(), ApiError> {
    if owner_id == caller.user_id {
        return Ok(());
    }

    AppLogger::log_security_event(
        "cross_user_access",
        &format!("{resource} {record_id} belongs to another user"),
        Some(&caller.user_id.to_string()),
    );
    Err(ApiError::Forbidden)
}

/// Whether a storage error is a UNIQUE constraint violation
fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

/// Map a failed user write, reporting a lost uniqueness race as a field error
fn user_write_error(err: anyhow::Error) -> ApiError {
    if is_unique_violation(&err) {
        return ApiError::validation(
            "username",
            "A user with that username or email already exists.",
        );
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::models::User;

    #[test]
    fn test_home_message() {
        assert_eq!(home().message, "Welcome to the Fitness Tracker API!");
    }

    #[test]
    fn test_ensure_owner() {
        let caller = AuthenticatedCaller {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
        };

        assert!(ensure_owner(&caller, caller.user_id, "activity", Uuid::new_v4()).is_ok());
        assert!(matches!(
            ensure_owner(&caller, Uuid::new_v4(), "activity", Uuid::new_v4()),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&anyhow::anyhow!("boom")));
        assert!(matches!(
            user_write_error(anyhow::anyhow!("boom")),
            ApiError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_profile_update_collision_is_validation_error() {
        let database = Database::new("sqlite::memory:").await.unwrap();
        let alice = User::new("alice".to_string(), "alice@example.com".to_string(), "hash".to_string());
        let bob = User::new("bob".to_string(), "bob@example.com".to_string(), "hash".to_string());
        database.create_user(&alice).await.unwrap();
        database.create_user(&bob).await.unwrap();

        // bypasses the availability pre-check, as a concurrent writer would
        let err = database
            .update_user_profile(bob.id, "alice", "bob@example.com")
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(matches!(
            user_write_error(err),
            ApiError::Validation { ref field, .. } if field == "username"
        ));
    }
}
