// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Core data structures of the fitness tracker.
//!
//! ## Core Models
//!
//! - [`User`]: A registered account; owns activities and notifications
//! - [`Activity`]: A single logged workout
//! - [`Notification`]: A message addressed to one user
//! - [`MetricsReport`]: Derived totals over a [`Period`], never persisted

use crate::constants::metrics::{MONTHLY_WINDOW_DAYS, WEEKLY_WINDOW_DAYS};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A registered user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique display name
    pub username: String,
    /// Unique email address
    pub email: String,
    /// bcrypt hash of the password
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Create a new user with a fresh id
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            created_at: now,
            last_active: now,
        }
    }
}

/// Recognized activity kinds
///
/// The wire representation is the capitalized variant name, e.g. `"Running"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    Running,
    Cycling,
    Swimming,
    Walking,
    Weightlifting,
}

impl ActivityKind {
    /// All kinds, in display order
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::Running,
        ActivityKind::Cycling,
        ActivityKind::Swimming,
        ActivityKind::Walking,
        ActivityKind::Weightlifting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Running => "Running",
            ActivityKind::Cycling => "Cycling",
            ActivityKind::Swimming => "Swimming",
            ActivityKind::Walking => "Walking",
            ActivityKind::Weightlifting => "Weightlifting",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name an [`ActivityKind`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid activity type")]
pub struct UnknownActivityKind(pub String);

impl FromStr for ActivityKind {
    type Err = UnknownActivityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownActivityKind(s.to_string()))
    }
}

/// A single logged workout, owned by exactly one user
///
/// Invariants: `duration_minutes > 0`, `distance >= 0`. `calories_burned` is
/// non-negative by type. `created_at` is assigned when the activity is first
/// written and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    /// Owning user
    pub owner_id: Uuid,
    pub activity_type: ActivityKind,
    /// Duration in minutes
    pub duration_minutes: i64,
    /// Distance in the user's unit (km or miles)
    pub distance: f64,
    pub calories_burned: u32,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Build a new activity for `owner_id`, stamped with the current time
    pub fn new(
        owner_id: Uuid,
        activity_type: ActivityKind,
        duration_minutes: i64,
        distance: f64,
        calories_burned: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            activity_type,
            duration_minutes,
            distance,
            calories_burned,
            created_at: Utc::now(),
        }
    }
}

/// Client-writable activity fields
///
/// Kept loosely typed so that validation can report which rule failed
/// instead of a generic deserialization error. Any `owner`, `user` or `date`
/// supplied by the client is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityInput {
    #[serde(default)]
    pub activity_type: String,
    pub duration: i64,
    pub distance: f64,
    pub calories_burned: u32,
}

/// Notification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    General,
    Reminder,
    GoalAchieved,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::General => "general",
            NotificationKind::Reminder => "reminder",
            NotificationKind::GoalAchieved => "goal_achieved",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(NotificationKind::General),
            "reminder" => Ok(NotificationKind::Reminder),
            "goal_achieved" => Ok(NotificationKind::GoalAchieved),
            other => Err(anyhow::anyhow!("Unknown notification type: {other}")),
        }
    }
}

/// A message addressed to one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub message: String,
    pub notification_type: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build an unread notification for `owner_id`
    pub fn new(owner_id: Uuid, message: String, notification_type: NotificationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            message,
            notification_type,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Reporting window for activity metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Weekly,
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }

    /// Length of the window
    pub fn window(&self) -> Duration {
        match self {
            Period::Weekly => Duration::days(WEEKLY_WINDOW_DAYS),
            Period::Monthly => Duration::days(MONTHLY_WINDOW_DAYS),
        }
    }

    /// Inclusive lower bound of the window ending at `now`
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totals over one user's activities in a window
///
/// Computed on demand and never stored. Empty windows yield zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub period: Period,
    pub total_duration_minutes: i64,
    pub total_distance: f64,
    pub total_calories: i64,
}

impl MetricsReport {
    /// A report with all totals at zero
    pub fn empty(period: Period) -> Self {
        Self {
            period,
            total_duration_minutes: 0,
            total_distance: 0.0,
            total_calories: 0,
        }
    }
}
