// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Weekly and monthly activity totals for the caller

use crate::auth::AuthenticatedCaller;
use crate::database::Database;
use crate::errors::ApiError;
use crate::logging::AppLogger;
use crate::metrics::MetricsAggregator;
use crate::models::{MetricsReport, Period};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsQuery {
    /// `weekly` (default) or `monthly`
    pub period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub period: Period,
    /// Minutes
    pub total_duration: i64,
    /// `HH:MM:SS`, prefixed with whole days once past 24 hours
    pub total_duration_display: String,
    pub total_distance: f64,
    pub total_calories: i64,
}

impl From<MetricsReport> for MetricsResponse {
    fn from(report: MetricsReport) -> Self {
        Self {
            period: report.period,
            total_duration: report.total_duration_minutes,
            total_duration_display: format_duration(report.total_duration_minutes),
            total_distance: report.total_distance,
            total_calories: report.total_calories,
        }
    }
}

#[derive(Clone)]
pub struct MetricsRoutes {
    aggregator: MetricsAggregator<Database>,
}

impl MetricsRoutes {
    pub fn new(database: Database) -> Self {
        Self {
            aggregator: MetricsAggregator::new(database),
        }
    }

    /// Totals over the requested window ending now
    ///
    /// A missing period means weekly. Any other unrecognized token is
    /// rejected before the store is queried.
    pub async fn activity_metrics(
        &self,
        caller: &AuthenticatedCaller,
        query: MetricsQuery,
    ) -> Result<MetricsResponse, ApiError> {
        let report = match query.period {
            Some(token) => {
                self.aggregator
                    .compute_metrics_for_token(caller.user_id, &token)
                    .await?
            }
            None => {
                self.aggregator
                    .compute_metrics(caller.user_id, Period::default())
                    .await?
            }
        };

        AppLogger::log_metrics_computed(
            &caller.user_id.to_string(),
            report.period.as_str(),
            report.total_duration_minutes,
            report.total_calories,
        );

        Ok(MetricsResponse::from(report))
    }
}

/// Render minutes as `HH:MM:SS`, or `D HH:MM:SS` once a day is exceeded
pub fn format_duration(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let minutes = minutes.unsigned_abs();
    let (days, rest) = (minutes / (24 * 60), minutes % (24 * 60));
    let (hours, mins) = (rest / 60, rest % 60);

    if days > 0 {
        format!("{sign}{days} {hours:02}:{mins:02}:00")
    } else {
        format!("{sign}{hours:02}:{mins:02}:00")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, ActivityKind, User};

    async fn setup() -> (MetricsRoutes, Database, AuthenticatedCaller) {
        let database = Database::new("sqlite::memory:").await.unwrap();
        let user = User::new("alice".to_string(), "alice@example.com".to_string(), "hash".to_string());
        database.create_user(&user).await.unwrap();
        let caller = AuthenticatedCaller {
            user_id: user.id,
            username: user.username,
        };
        (MetricsRoutes::new(database.clone()), database, caller)
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(50), "00:50:00");
        assert_eq!(format_duration(125), "02:05:00");
        assert_eq!(format_duration(24 * 60 + 90), "1 01:30:00");
    }

    #[tokio::test]
    async fn test_default_period_is_weekly() {
        let (routes, database, caller) = setup().await;
        for (kind, duration, distance, calories) in [
            (ActivityKind::Running, 30, 5.0, 300),
            (ActivityKind::Cycling, 20, 3.0, 150),
        ] {
            let activity = Activity::new(caller.user_id, kind, duration, distance, calories);
            database.create_activity(&activity).await.unwrap();
        }

        let response = routes
            .activity_metrics(&caller, MetricsQuery::default())
            .await
            .unwrap();
        assert_eq!(response.period, Period::Weekly);
        assert_eq!(response.total_duration, 50);
        assert_eq!(response.total_duration_display, "00:50:00");
        assert!((response.total_distance - 8.0).abs() < 1e-9);
        assert_eq!(response.total_calories, 450);
    }

    #[tokio::test]
    async fn test_invalid_period_rejected() {
        let (routes, _, caller) = setup().await;
        for token in ["daily", "Weekly", ""] {
            let result = routes
                .activity_metrics(
                    &caller,
                    MetricsQuery {
                        period: Some(token.to_string()),
                    },
                )
                .await;
            assert!(matches!(result, Err(ApiError::InvalidPeriod)));
        }
    }

    #[tokio::test]
    async fn test_monthly_with_no_activities() {
        let (routes, _, caller) = setup().await;
        let response = routes
            .activity_metrics(
                &caller,
                MetricsQuery {
                    period: Some("monthly".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(response.period, Period::Monthly);
        assert_eq!(response.total_duration, 0);
        assert_eq!(response.total_calories, 0);
        assert_eq!(response.total_distance, 0.0);
    }
}
