// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Registration, login, token refresh and the caller's own profile

use super::user_write_error;
use crate::auth::{AuthManager, AuthenticatedCaller};
use crate::database::Database;
use crate::errors::ApiError;
use crate::logging::AppLogger;
use crate::models::User;
use crate::validation::{validate_email, validate_password, validate_username};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Profile fields a user may change on their own account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Public view of a user; never carries the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub expires_at: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
    pub expires_at: String,
}

/// Account creation and token issuance
#[derive(Clone)]
pub struct AuthRoutes {
    database: Database,
    auth_manager: AuthManager,
    bcrypt_cost: u32,
}

impl AuthRoutes {
    pub fn new(database: Database, auth_manager: AuthManager, bcrypt_cost: u32) -> Self {
        Self {
            database,
            auth_manager,
            bcrypt_cost,
        }
    }

    /// Handle user registration
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, ApiError> {
        info!("User registration attempt for username: {}", request.username);

        validate_username(&request.username)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;
        ensure_available(&self.database, &request.username, &request.email, None).await?;

        let password_hash = bcrypt::hash(&request.password, self.bcrypt_cost)
            .context("Failed to hash password")?;
        let user = User::new(request.username, request.email, password_hash);

        // Lost race against a concurrent registration
        self.database
            .create_user(&user)
            .await
            .map_err(user_write_error)?;

        AppLogger::log_database_operation("insert", "users", &user.id.to_string(), true);
        info!("User registered successfully: {} ({})", user.username, user.id);

        Ok(UserResponse::from(&user))
    }

    /// Handle user login
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        let Some(user) = self.database.get_user_by_username(&request.username).await? else {
            AppLogger::log_auth_event(&request.username, "login", false, Some("unknown username"));
            return Err(ApiError::Unauthenticated);
        };

        let password_ok = bcrypt::verify(&request.password, &user.password_hash)
            .context("Failed to verify password hash")?;
        if !password_ok {
            AppLogger::log_auth_event(&request.username, "login", false, Some("wrong password"));
            return Err(ApiError::Unauthenticated);
        }

        self.database.update_last_active(user.id).await?;
        let tokens = self.auth_manager.issue_tokens(&user)?;

        AppLogger::log_auth_event(&user.username, "login", true, None);

        Ok(LoginResponse {
            access: tokens.access,
            refresh: tokens.refresh,
            expires_at: tokens.access_expires_at.to_rfc3339(),
            user: UserResponse::from(&user),
        })
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, request: RefreshRequest) -> Result<RefreshResponse, ApiError> {
        let claims = self
            .auth_manager
            .validate_refresh_token(&request.refresh)
            .map_err(|e| {
                warn!("Refresh token rejected: {}", e);
                ApiError::Unauthenticated
            })?;

        // Deleted accounts keep no sessions
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthenticated)?;
        if self.database.get_user(user_id).await?.is_none() {
            return Err(ApiError::Unauthenticated);
        }

        let (access, expires_at) = self
            .auth_manager
            .refresh_access_token(&request.refresh)
            .map_err(|_| ApiError::Unauthenticated)?;

        AppLogger::log_auth_event(&claims.username, "token_refresh", true, None);

        Ok(RefreshResponse {
            access,
            expires_at: expires_at.to_rfc3339(),
        })
    }
}

/// The caller's own account
#[derive(Clone)]
pub struct UserRoutes {
    database: Database,
}

impl UserRoutes {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn me(&self, caller: &AuthenticatedCaller) -> Result<UserResponse, ApiError> {
        let user = self
            .database
            .get_user(caller.user_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        Ok(UserResponse::from(&user))
    }

    /// Change username and/or email; omitted fields keep their value
    pub async fn update_me(
        &self,
        caller: &AuthenticatedCaller,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ApiError> {
        let mut user = self
            .database
            .get_user(caller.user_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        if let Some(username) = request.username {
            validate_username(&username)?;
            user.username = username;
        }
        if let Some(email) = request.email {
            validate_email(&email)?;
            user.email = email;
        }

        ensure_available(&self.database, &user.username, &user.email, Some(user.id)).await?;

        // Same race as registration, against a concurrent profile edit
        if !self
            .database
            .update_user_profile(user.id, &user.username, &user.email)
            .await
            .map_err(user_write_error)?
        {
            return Err(ApiError::NotFound);
        }

        AppLogger::log_database_operation("update", "users", &user.id.to_string(), true);
        Ok(UserResponse::from(&user))
    }

    /// Delete the caller's account and everything it owns
    pub async fn delete_me(&self, caller: &AuthenticatedCaller) -> Result<(), ApiError> {
        if !self.database.delete_user(caller.user_id).await? {
            return Err(ApiError::NotFound);
        }

        AppLogger::log_database_operation("delete", "users", &caller.user_id.to_string(), true);
        AppLogger::log_auth_event(&caller.username, "account_deleted", true, None);
        Ok(())
    }
}

/// Reject a username or email already held by a different user
async fn ensure_available(
    database: &Database,
    username: &str,
    email: &str,
    current_user: Option<Uuid>,
) -> Result<(), ApiError> {
    let taken_by_other = |user: Option<User>| user.is_some_and(|u| Some(u.id) != current_user);

    if taken_by_other(database.get_user_by_username(username).await?) {
        return Err(ApiError::validation(
            "username",
            "A user with that username already exists.",
        ));
    }
    if taken_by_other(database.get_user_by_email(email).await?) {
        return Err(ApiError::validation(
            "email",
            "A user with that email already exists.",
        ));
    }
    Ok(())
}
