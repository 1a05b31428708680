// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Activity CRUD scoped to the authenticated caller

use super::ensure_owner;
use crate::auth::AuthenticatedCaller;
use crate::database::{ActivityFilter, Database, SortOrder};
use crate::errors::ApiError;
use crate::logging::AppLogger;
use crate::models::{Activity, ActivityInput, ActivityKind};
use crate::validation::{validate_activity, validate_activity_kind};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters accepted by the activity listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityListQuery {
    pub activity_type: Option<String>,
    /// Date (`YYYY-MM-DD`) or RFC 3339 timestamp
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `date` for oldest first, `-date` for newest first
    pub ordering: Option<String>,
}

/// Partial update; omitted fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPatch {
    pub activity_type: Option<String>,
    pub duration: Option<i64>,
    pub distance: Option<f64>,
    pub calories_burned: Option<u32>,
}

/// An activity as returned to its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub owner: Uuid,
    pub activity_type: ActivityKind,
    /// Minutes
    pub duration: i64,
    pub distance: f64,
    pub calories_burned: u32,
    pub date: DateTime<Utc>,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            owner: activity.owner_id,
            activity_type: activity.activity_type,
            duration: activity.duration_minutes,
            distance: activity.distance,
            calories_burned: activity.calories_burned,
            date: activity.created_at,
        }
    }
}

#[derive(Clone)]
pub struct ActivityRoutes {
    database: Database,
}

impl ActivityRoutes {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// List the caller's activities
    pub async fn list(
        &self,
        caller: &AuthenticatedCaller,
        query: ActivityListQuery,
    ) -> Result<Vec<ActivityResponse>, ApiError> {
        let filter = build_filter(&query)?;
        let activities = self.database.list_activities(caller.user_id, &filter).await?;
        Ok(activities.into_iter().map(ActivityResponse::from).collect())
    }

    /// Record a new activity owned by the caller
    ///
    /// The owner and timestamp are assigned here; the client cannot set them.
    pub async fn create(
        &self,
        caller: &AuthenticatedCaller,
        input: ActivityInput,
    ) -> Result<ActivityResponse, ApiError> {
        let kind = validate_activity(&input)?;
        let activity = Activity::new(
            caller.user_id,
            kind,
            input.duration,
            input.distance,
            input.calories_burned,
        );

        self.database.create_activity(&activity).await?;
        AppLogger::log_database_operation("insert", "activities", &caller.user_id.to_string(), true);

        Ok(ActivityResponse::from(activity))
    }

    pub async fn get(&self, caller: &AuthenticatedCaller, activity_id: Uuid) -> Result<ActivityResponse, ApiError> {
        self.load_owned(caller, activity_id).await.map(ActivityResponse::from)
    }

    /// Replace all client-writable fields
    pub async fn replace(
        &self,
        caller: &AuthenticatedCaller,
        activity_id: Uuid,
        input: ActivityInput,
    ) -> Result<ActivityResponse, ApiError> {
        let patch = ActivityPatch {
            activity_type: Some(input.activity_type),
            duration: Some(input.duration),
            distance: Some(input.distance),
            calories_burned: Some(input.calories_burned),
        };
        self.patch(caller, activity_id, patch).await
    }

    /// Update only the supplied fields, then validate the merged record
    pub async fn patch(
        &self,
        caller: &AuthenticatedCaller,
        activity_id: Uuid,
        patch: ActivityPatch,
    ) -> Result<ActivityResponse, ApiError> {
        let mut activity = self.load_owned(caller, activity_id).await?;

        let merged = ActivityInput {
            activity_type: patch
                .activity_type
                .unwrap_or_else(|| activity.activity_type.as_str().to_string()),
            duration: patch.duration.unwrap_or(activity.duration_minutes),
            distance: patch.distance.unwrap_or(activity.distance),
            calories_burned: patch.calories_burned.unwrap_or(activity.calories_burned),
        };
        activity.activity_type = validate_activity(&merged)?;
        activity.duration_minutes = merged.duration;
        activity.distance = merged.distance;
        activity.calories_burned = merged.calories_burned;

        if !self.database.update_activity(&activity).await? {
            return Err(ApiError::NotFound);
        }
        AppLogger::log_database_operation("update", "activities", &caller.user_id.to_string(), true);

        Ok(ActivityResponse::from(activity))
    }

    pub async fn delete(&self, caller: &AuthenticatedCaller, activity_id: Uuid) -> Result<(), ApiError> {
        self.load_owned(caller, activity_id).await?;

        if !self.database.delete_activity(caller.user_id, activity_id).await? {
            return Err(ApiError::NotFound);
        }
        AppLogger::log_database_operation("delete", "activities", &caller.user_id.to_string(), true);
        Ok(())
    }

    async fn load_owned(&self, caller: &AuthenticatedCaller, activity_id: Uuid) -> Result<Activity, ApiError> {
        let activity = self
            .database
            .get_activity(activity_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        ensure_owner(caller, activity.owner_id, "activity", activity_id)?;
        Ok(activity)
    }
}

/// Translate listing query parameters into a storage filter
///
/// A date range applies only when both ends are given. A bare date as
/// `end_date` covers that whole day.
fn build_filter(query: &ActivityListQuery) -> Result<ActivityFilter, ApiError> {
    let activity_type = query
        .activity_type
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(validate_activity_kind)
        .transpose()?;

    let date_range = match (&query.start_date, &query.end_date) {
        (Some(start), Some(end)) => Some((
            parse_date_bound("start_date", start, false)?,
            parse_date_bound("end_date", end, true)?,
        )),
        _ => None,
    };

    let order = match query.ordering.as_deref() {
        Some("-date") | Some("-created_at") => SortOrder::Descending,
        _ => SortOrder::Ascending,
    };

    Ok(ActivityFilter {
        activity_type,
        date_range,
        order,
    })
}

/// Parse a range bound; the returned upper bound is exclusive
fn parse_date_bound(field: &str, value: &str, upper: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        let timestamp = timestamp.with_timezone(&Utc);
        if !upper {
            return Ok(timestamp);
        }
        return timestamp
            .checked_add_signed(Duration::microseconds(1))
            .ok_or_else(|| ApiError::validation(field, "Date out of range."));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::validation(field, "Enter a valid date (YYYY-MM-DD) or RFC 3339 timestamp.")
    })?;
    let day = if upper {
        date.checked_add_signed(Duration::days(1))
    } else {
        Some(date)
    };
    let midnight = day
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ApiError::validation(field, "Date out of range."))?;
    Ok(midnight.and_utc())
}
