// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Database Management
//!
//! SQLite storage for users, activities and notifications. Every activity and
//! notification query takes the owning user id and applies it as the first
//! predicate, so callers cannot read across users by forgetting a filter.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text, which keeps
//! lexical comparison in SQL equal to chronological comparison.

use crate::metrics::ActivityStore;
use crate::models::{Activity, ActivityKind, Notification, NotificationKind, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use uuid::Uuid;

/// Sort order for activity listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Optional filters applied after the owner predicate
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub activity_type: Option<ActivityKind>,
    /// Inclusive lower and exclusive upper bound on `created_at`
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub order: SortOrder,
}

/// Database manager for users, activities and notifications
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to open database")?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_active TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activities (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                activity_type TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
                distance REAL NOT NULL CHECK (distance >= 0),
                calories_burned INTEGER NOT NULL CHECK (calories_burned >= 0),
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                message TEXT NOT NULL,
                notification_type TEXT NOT NULL DEFAULT 'general',
                is_read BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_activities_user_created ON activities(user_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_notifications_user_created ON notifications(user_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Cheap connectivity check
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ---- users ----

    /// Create a new user
    pub async fn create_user(&self, user: &User) -> Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, last_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(to_db_timestamp(user.created_at))
        .bind(to_db_timestamp(user.last_active))
        .execute(&self.pool)
        .await?;

        Ok(user.id)
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_user).transpose()
    }

    /// Get user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_user).transpose()
    }

    /// Get user by username
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_user).transpose()
    }

    /// Update username and email of an existing user
    pub async fn update_user_profile(&self, user_id: Uuid, username: &str, email: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET username = ?1, email = ?2 WHERE id = ?3")
            .bind(username)
            .bind(email)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update user's last active timestamp
    pub async fn update_last_active(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_active = ?1 WHERE id = ?2")
            .bind(to_db_timestamp(Utc::now()))
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a user together with everything they own
    pub async fn delete_user(&self, user_id: Uuid) -> Result<bool> {
        let id = user_id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM activities WHERE user_id = ?1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM notifications WHERE user_id = ?1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- activities ----

    /// Insert an activity
    pub async fn create_activity(&self, activity: &Activity) -> Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, user_id, activity_type, duration_minutes, distance, calories_burned, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(activity.id.to_string())
        .bind(activity.owner_id.to_string())
        .bind(activity.activity_type.as_str())
        .bind(activity.duration_minutes)
        .bind(activity.distance)
        .bind(i64::from(activity.calories_burned))
        .bind(to_db_timestamp(activity.created_at))
        .execute(&self.pool)
        .await?;

        Ok(activity.id)
    }

    /// Get an activity by id regardless of owner
    ///
    /// Callers compare `owner_id` themselves so they can tell a missing
    /// record apart from a foreign one.
    pub async fn get_activity(&self, activity_id: Uuid) -> Result<Option<Activity>> {
        let row = sqlx::query("SELECT * FROM activities WHERE id = ?1")
            .bind(activity_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_activity).transpose()
    }

    /// List a user's activities
    pub async fn list_activities(&self, owner_id: Uuid, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM activities WHERE user_id = ");
        query.push_bind(owner_id.to_string());

        if let Some(kind) = filter.activity_type {
            query.push(" AND activity_type = ").push_bind(kind.as_str());
        }

        if let Some((start, end)) = filter.date_range {
            query
                .push(" AND created_at >= ")
                .push_bind(to_db_timestamp(start))
                .push(" AND created_at < ")
                .push_bind(to_db_timestamp(end));
        }

        query.push(match filter.order {
            SortOrder::Ascending => " ORDER BY created_at ASC",
            SortOrder::Descending => " ORDER BY created_at DESC",
        });

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_activity).collect()
    }

    /// Activities of `owner_id` created at or after `since`
    pub async fn find_activities_since(&self, owner_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Activity>> {
        let rows = sqlx::query(
            "SELECT * FROM activities WHERE user_id = ?1 AND created_at >= ?2 ORDER BY created_at ASC",
        )
        .bind(owner_id.to_string())
        .bind(to_db_timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_activity).collect()
    }

    /// Overwrite the client-writable fields of an activity
    ///
    /// `owner_id` and `created_at` are never touched.
    pub async fn update_activity(&self, activity: &Activity) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE activities
            SET activity_type = ?1, duration_minutes = ?2, distance = ?3, calories_burned = ?4
            WHERE id = ?5 AND user_id = ?6
            "#,
        )
        .bind(activity.activity_type.as_str())
        .bind(activity.duration_minutes)
        .bind(activity.distance)
        .bind(i64::from(activity.calories_burned))
        .bind(activity.id.to_string())
        .bind(activity.owner_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete one of `owner_id`'s activities
    pub async fn delete_activity(&self, owner_id: Uuid, activity_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM activities WHERE id = ?1 AND user_id = ?2")
            .bind(activity_id.to_string())
            .bind(owner_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ---- notifications ----

    /// Insert a notification
    pub async fn create_notification(&self, notification: &Notification) -> Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, message, notification_type, is_read, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(notification.id.to_string())
        .bind(notification.owner_id.to_string())
        .bind(&notification.message)
        .bind(notification.notification_type.as_str())
        .bind(notification.is_read)
        .bind(to_db_timestamp(notification.created_at))
        .execute(&self.pool)
        .await?;

        Ok(notification.id)
    }

    /// Get a notification by id regardless of owner
    pub async fn get_notification(&self, notification_id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = ?1")
            .bind(notification_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_notification).transpose()
    }

    /// List a user's notifications, newest first
    pub async fn list_notifications(&self, owner_id: Uuid, is_read: Option<bool>) -> Result<Vec<Notification>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM notifications WHERE user_id = ");
        query.push_bind(owner_id.to_string());

        if let Some(is_read) = is_read {
            query.push(" AND is_read = ").push_bind(is_read);
        }
        query.push(" ORDER BY created_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_notification).collect()
    }

    /// Overwrite message, type and read flag of a notification
    pub async fn update_notification(&self, notification: &Notification) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET message = ?1, notification_type = ?2, is_read = ?3
            WHERE id = ?4 AND user_id = ?5
            "#,
        )
        .bind(&notification.message)
        .bind(notification.notification_type.as_str())
        .bind(notification.is_read)
        .bind(notification.id.to_string())
        .bind(notification.owner_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark every unread notification of `owner_id` as read
    pub async fn mark_all_notifications_read(&self, owner_id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0")
            .bind(owner_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete one of `owner_id`'s notifications
    pub async fn delete_notification(&self, owner_id: Uuid, notification_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1 AND user_id = ?2")
            .bind(notification_id.to_string())
            .bind(owner_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ActivityStore for Database {
    async fn owner_exists(&self, owner_id: Uuid) -> Result<bool> {
        Ok(self.get_user(owner_id).await?.is_some())
    }

    async fn find_by_owner_since(&self, owner_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Activity>> {
        self.find_activities_since(owner_id, since).await
    }
}

/// Fixed-width timestamp representation used in every table
pub fn to_db_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_db_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let value: String = row.try_get(column)?;
    Uuid::parse_str(&value).with_context(|| format!("Invalid UUID in column {column}"))
}

/// Convert database row to User model
fn row_to_user(row: SqliteRow) -> Result<User> {
    let created_at: String = row.try_get("created_at")?;
    let last_active: String = row.try_get("last_active")?;

    Ok(User {
        id: parse_uuid(&row, "id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: parse_db_timestamp(&created_at)?,
        last_active: parse_db_timestamp(&last_active)?,
    })
}

fn row_to_activity(row: SqliteRow) -> Result<Activity> {
    let activity_type: String = row.try_get("activity_type")?;
    let calories: i64 = row.try_get("calories_burned")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Activity {
        id: parse_uuid(&row, "id")?,
        owner_id: parse_uuid(&row, "user_id")?,
        activity_type: activity_type.parse()?,
        duration_minutes: row.try_get("duration_minutes")?,
        distance: row.try_get("distance")?,
        calories_burned: u32::try_from(calories).context("calories_burned out of range")?,
        created_at: parse_db_timestamp(&created_at)?,
    })
}

fn row_to_notification(row: SqliteRow) -> Result<Notification> {
    let notification_type: String = row.try_get("notification_type")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Notification {
        id: parse_uuid(&row, "id")?,
        owner_id: parse_uuid(&row, "user_id")?,
        message: row.try_get("message")?,
        notification_type: notification_type.parse::<NotificationKind>()?,
        is_read: row.try_get("is_read")?,
        created_at: parse_db_timestamp(&created_at)?,
    })
}
