// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-user notifications

use super::ensure_owner;
use crate::auth::AuthenticatedCaller;
use crate::database::Database;
use crate::errors::ApiError;
use crate::logging::AppLogger;
use crate::models::{Notification, NotificationKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationListQuery {
    pub is_read: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationInput {
    pub message: String,
    #[serde(default)]
    pub notification_type: NotificationKind,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPatch {
    pub message: Option<String>,
    pub notification_type: Option<NotificationKind>,
    pub is_read: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

#[derive(Clone)]
pub struct NotificationRoutes {
    database: Database,
}

impl NotificationRoutes {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// The caller's notifications, newest first
    pub async fn list(
        &self,
        caller: &AuthenticatedCaller,
        query: NotificationListQuery,
    ) -> Result<Vec<Notification>, ApiError> {
        Ok(self
            .database
            .list_notifications(caller.user_id, query.is_read)
            .await?)
    }

    pub async fn create(
        &self,
        caller: &AuthenticatedCaller,
        input: NotificationInput,
    ) -> Result<Notification, ApiError> {
        validate_message(&input.message)?;

        let notification = Notification::new(caller.user_id, input.message, input.notification_type);
        self.database.create_notification(&notification).await?;
        AppLogger::log_database_operation("insert", "notifications", &caller.user_id.to_string(), true);

        Ok(notification)
    }

    pub async fn get(&self, caller: &AuthenticatedCaller, notification_id: Uuid) -> Result<Notification, ApiError> {
        self.load_owned(caller, notification_id).await
    }

    /// Update the supplied fields; typically used to flip `is_read`
    pub async fn update(
        &self,
        caller: &AuthenticatedCaller,
        notification_id: Uuid,
        patch: NotificationPatch,
    ) -> Result<Notification, ApiError> {
        let mut notification = self.load_owned(caller, notification_id).await?;

        if let Some(message) = patch.message {
            validate_message(&message)?;
            notification.message = message;
        }
        if let Some(kind) = patch.notification_type {
            notification.notification_type = kind;
        }
        if let Some(is_read) = patch.is_read {
            notification.is_read = is_read;
        }

        if !self.database.update_notification(&notification).await? {
            return Err(ApiError::NotFound);
        }
        AppLogger::log_database_operation("update", "notifications", &caller.user_id.to_string(), true);

        Ok(notification)
    }

    pub async fn mark_all_read(&self, caller: &AuthenticatedCaller) -> Result<MarkAllReadResponse, ApiError> {
        let updated = self.database.mark_all_notifications_read(caller.user_id).await?;
        Ok(MarkAllReadResponse { updated })
    }

    pub async fn delete(&self, caller: &AuthenticatedCaller, notification_id: Uuid) -> Result<(), ApiError> {
        self.load_owned(caller, notification_id).await?;

        if !self
            .database
            .delete_notification(caller.user_id, notification_id)
            .await?
        {
            return Err(ApiError::NotFound);
        }
        AppLogger::log_database_operation("delete", "notifications", &caller.user_id.to_string(), true);
        Ok(())
    }

    async fn load_owned(
        &self,
        caller: &AuthenticatedCaller,
        notification_id: Uuid,
    ) -> Result<Notification, ApiError> {
        let notification = self
            .database
            .get_notification(notification_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        ensure_owner(caller, notification.owner_id, "notification", notification_id)?;
        Ok(notification)
    }
}

fn validate_message(message: &str) -> Result<(), ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::validation("message", "This field may not be blank."));
    }
    Ok(())
}
