// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Activity Metrics
//!
//! Computes weekly and monthly totals (duration, distance, calories) over a
//! single user's activities. The aggregator only reads: it asks an
//! [`ActivityStore`] for the user's activities created on or after the start
//! of the window and sums them.
//!
//! Windows are fixed offsets from "now": 7 days for [`Period::Weekly`] and
//! 30 days for [`Period::Monthly`]. Monthly windows are not calendar aware.

use crate::models::{Activity, MetricsReport, Period};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Read access to activity records needed by the aggregator
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Whether a user with this id exists
    async fn owner_exists(&self, owner_id: Uuid) -> Result<bool>;

    /// All activities owned by `owner_id` with `created_at >= since`
    async fn find_by_owner_since(&self, owner_id: Uuid, since: DateTime<Utc>)
        -> Result<Vec<Activity>>;
}

/// Errors produced while computing metrics
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Unknown user: {0}")]
    UnknownUser(Uuid),

    #[error("Totals overflowed for {0} window")]
    Overflow(Period),

    #[error("Record store failure: {0}")]
    Store(#[from] anyhow::Error),
}

impl FromStr for Period {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            other => Err(MetricsError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Computes [`MetricsReport`]s from an [`ActivityStore`]
#[derive(Clone)]
pub struct MetricsAggregator<S> {
    store: S,
}

impl<S: ActivityStore> MetricsAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Compute totals for the window ending now
    pub async fn compute_metrics(
        &self,
        user_id: Uuid,
        period: Period,
    ) -> Result<MetricsReport, MetricsError> {
        self.compute_metrics_at(user_id, period, Utc::now()).await
    }

    /// Compute totals for the window ending at `now`
    pub async fn compute_metrics_at(
        &self,
        user_id: Uuid,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<MetricsReport, MetricsError> {
        if !self.store.owner_exists(user_id).await? {
            return Err(MetricsError::UnknownUser(user_id));
        }

        let since = period.window_start(now);
        let activities = self.store.find_by_owner_since(user_id, since).await?;

        debug!(
            user.id = %user_id,
            metrics.period = %period,
            metrics.window_start = %since,
            metrics.records = activities.len(),
            "Aggregating activity metrics"
        );

        summarize(period, &activities)
    }

    /// Parse a raw period token, then compute totals for the window ending now
    ///
    /// An unrecognized token fails before the store is queried.
    pub async fn compute_metrics_for_token(
        &self,
        user_id: Uuid,
        period: &str,
    ) -> Result<MetricsReport, MetricsError> {
        let period = period.parse::<Period>()?;
        self.compute_metrics(user_id, period).await
    }
}

/// Sum duration, distance and calories over `activities`
///
/// Integer totals that do not fit in an `i64` yield [`MetricsError::Overflow`].
pub fn summarize(period: Period, activities: &[Activity]) -> Result<MetricsReport, MetricsError> {
    activities
        .iter()
        .try_fold(MetricsReport::empty(period), |mut report, activity| {
            report.total_duration_minutes = report
                .total_duration_minutes
                .checked_add(activity.duration_minutes)
                .ok_or(MetricsError::Overflow(period))?;
            report.total_calories = report
                .total_calories
                .checked_add(i64::from(activity.calories_burned))
                .ok_or(MetricsError::Overflow(period))?;
            report.total_distance += activity.distance;
            Ok(report)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityKind;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory store that counts queries
    #[derive(Clone, Default)]
    struct MemoryStore {
        users: Arc<Mutex<HashSet<Uuid>>>,
        activities: Arc<Mutex<Vec<Activity>>>,
        queries: Arc<AtomicUsize>,
    }

    impl MemoryStore {
        fn add_user(&self) -> Uuid {
            let id = Uuid::new_v4();
            self.users.lock().unwrap().insert(id);
            id
        }

        fn add_activity(
            &self,
            owner: Uuid,
            duration: i64,
            distance: f64,
            calories: u32,
            created_at: DateTime<Utc>,
        ) {
            let mut activity =
                Activity::new(owner, ActivityKind::Running, duration, distance, calories);
            activity.created_at = created_at;
            self.activities.lock().unwrap().push(activity);
        }

        fn query_count(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ActivityStore for MemoryStore {
        async fn owner_exists(&self, owner_id: Uuid) -> Result<bool> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.users.lock().unwrap().contains(&owner_id))
        }

        async fn find_by_owner_since(
            &self,
            owner_id: Uuid,
            since: DateTime<Utc>,
        ) -> Result<Vec<Activity>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .activities
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.owner_id == owner_id && a.created_at >= since)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn test_empty_window_reports_zeros() {
        let store = MemoryStore::default();
        let user = store.add_user();
        let aggregator = MetricsAggregator::new(store);

        let report = aggregator.compute_metrics(user, Period::Weekly).await.unwrap();
        assert_eq!(report, MetricsReport::empty(Period::Weekly));
    }

    #[tokio::test]
    async fn test_sums_activities_in_window() {
        let store = MemoryStore::default();
        let user = store.add_user();
        let now = Utc::now();
        store.add_activity(user, 30, 5.0, 300, now - Duration::days(1));
        store.add_activity(user, 20, 3.0, 150, now - Duration::days(6));
        // outside the weekly window
        store.add_activity(user, 60, 10.0, 700, now - Duration::days(9));
        let aggregator = MetricsAggregator::new(store);

        let report = aggregator
            .compute_metrics_at(user, Period::Weekly, now)
            .await
            .unwrap();
        assert_eq!(report.period, Period::Weekly);
        assert_eq!(report.total_duration_minutes, 50);
        assert_eq!(report.total_distance, 8.0);
        assert_eq!(report.total_calories, 450);
    }

    #[tokio::test]
    async fn test_only_owner_records_counted() {
        let store = MemoryStore::default();
        let alice = store.add_user();
        let bob = store.add_user();
        let now = Utc::now();
        store.add_activity(alice, 30, 5.0, 300, now - Duration::hours(2));
        store.add_activity(bob, 90, 40.0, 1200, now - Duration::hours(2));
        let aggregator = MetricsAggregator::new(store);

        let report = aggregator
            .compute_metrics_at(alice, Period::Weekly, now)
            .await
            .unwrap();
        assert_eq!(report.total_duration_minutes, 30);
        assert_eq!(report.total_calories, 300);
    }

    #[tokio::test]
    async fn test_weekly_window_boundaries() {
        let store = MemoryStore::default();
        let user = store.add_user();
        let created = Utc::now() - Duration::days(30);
        store.add_activity(user, 30, 5.0, 300, created);
        let aggregator = MetricsAggregator::new(store);

        let included = aggregator
            .compute_metrics_at(user, Period::Weekly, created + Duration::days(3))
            .await
            .unwrap();
        assert_eq!(included.total_duration_minutes, 30);
        assert_eq!(included.total_distance, 5.0);
        assert_eq!(included.total_calories, 300);

        let excluded = aggregator
            .compute_metrics_at(user, Period::Weekly, created + Duration::days(8))
            .await
            .unwrap();
        assert_eq!(excluded, MetricsReport::empty(Period::Weekly));
    }

    #[tokio::test]
    async fn test_window_lower_bound_is_inclusive() {
        let store = MemoryStore::default();
        let user = store.add_user();
        let now = Utc::now();
        store.add_activity(user, 15, 1.0, 100, now - Duration::days(7));
        let aggregator = MetricsAggregator::new(store);

        let report = aggregator
            .compute_metrics_at(user, Period::Weekly, now)
            .await
            .unwrap();
        assert_eq!(report.total_duration_minutes, 15);
    }

    #[tokio::test]
    async fn test_monthly_window_is_thirty_days() {
        let store = MemoryStore::default();
        let user = store.add_user();
        let now = Utc::now();
        store.add_activity(user, 10, 1.0, 50, now - Duration::days(29));
        store.add_activity(user, 20, 2.0, 100, now - Duration::days(30));
        store.add_activity(user, 40, 4.0, 200, now - Duration::days(31));
        let aggregator = MetricsAggregator::new(store);

        let report = aggregator
            .compute_metrics_at(user, Period::Monthly, now)
            .await
            .unwrap();
        assert_eq!(report.period, Period::Monthly);
        assert_eq!(report.total_duration_minutes, 30);
        assert_eq!(report.total_distance, 3.0);
        assert_eq!(report.total_calories, 150);
    }

    #[tokio::test]
    async fn test_invalid_period_issues_no_query() {
        let store = MemoryStore::default();
        let user = store.add_user();
        let aggregator = MetricsAggregator::new(store.clone());

        for token in ["biweekly", "", "Weekly", "daily"] {
            let err = aggregator
                .compute_metrics_for_token(user, token)
                .await
                .unwrap_err();
            assert!(matches!(err, MetricsError::InvalidPeriod(_)));
        }
        assert_eq!(store.query_count(), 0);

        let report = aggregator
            .compute_metrics_for_token(user, "monthly")
            .await
            .unwrap();
        assert_eq!(report.period, Period::Monthly);
        assert!(store.query_count() > 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_reported() {
        let store = MemoryStore::default();
        let aggregator = MetricsAggregator::new(store);
        let ghost = Uuid::new_v4();

        let err = aggregator
            .compute_metrics(ghost, Period::Weekly)
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::UnknownUser(id) if id == ghost));
    }

    #[test]
    fn test_summarize_matches_arithmetic_sum() {
        let owner = Uuid::new_v4();
        let activities: Vec<Activity> = (1..=10)
            .map(|i| Activity::new(owner, ActivityKind::Cycling, i, i as f64 * 0.5, (i * 10) as u32))
            .collect();

        let report = summarize(Period::Monthly, &activities).unwrap();
        assert_eq!(report.total_duration_minutes, 55);
        assert_eq!(report.total_distance, 27.5);
        assert_eq!(report.total_calories, 550);
        assert_eq!(
            summarize(Period::Weekly, &[]).unwrap(),
            MetricsReport::empty(Period::Weekly)
        );
    }

    #[test]
    fn test_summarize_reports_overflow() {
        let owner = Uuid::new_v4();
        let activities = vec![
            Activity::new(owner, ActivityKind::Running, i64::MAX, 1.0, 1),
            Activity::new(owner, ActivityKind::Running, i64::MAX, 1.0, 1),
        ];

        let err = summarize(Period::Weekly, &activities).unwrap_err();
        assert!(matches!(err, MetricsError::Overflow(Period::Weekly)));
    }
}
