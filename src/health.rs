// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Health checks for load balancers and operators

use crate::constants::service::{SERVICE_NAME, SERVICE_VERSION};
use crate::database::Database;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: ServiceInfo,
    pub checks: Vec<ComponentHealth>,
    /// Unix timestamp of the check
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub duration_ms: u64,
}

/// Health checker with a short-lived result cache
pub struct HealthChecker {
    start_time: Instant,
    database: Database,
    cached_status: RwLock<Option<(HealthResponse, Instant)>>,
    cache_ttl: Duration,
}

impl HealthChecker {
    pub fn new(database: Database) -> Self {
        Self {
            start_time: Instant::now(),
            database,
            cached_status: RwLock::new(None),
            cache_ttl: Duration::from_secs(10),
        }
    }

    /// Service and database status; cached for a few seconds
    pub async fn check(&self) -> HealthResponse {
        {
            let cached = self.cached_status.read().await;
            if let Some((response, cached_at)) = cached.as_ref() {
                if cached_at.elapsed() < self.cache_ttl {
                    return response.clone();
                }
            }
        }

        info!("Performing health check");

        let checks = vec![
            ComponentHealth {
                name: "service".to_string(),
                status: HealthStatus::Healthy,
                message: "Service is running".to_string(),
                duration_ms: 0,
            },
            self.check_database().await,
        ];

        let status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        let response = HealthResponse {
            status,
            service: self.service_info(),
            checks,
            timestamp: chrono::Utc::now().timestamp(),
        };

        *self.cached_status.write().await = Some((response.clone(), Instant::now()));
        response
    }

    fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            name: SERVICE_NAME.to_string(),
            version: SERVICE_VERSION.to_string(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn check_database(&self) -> ComponentHealth {
        let start = Instant::now();

        let (status, message) = match self.database.ping().await {
            Ok(()) => (HealthStatus::Healthy, "Database is accessible".to_string()),
            Err(e) => {
                error!("Database health check failed: {}", e);
                (HealthStatus::Unhealthy, format!("Database check failed: {e}"))
            }
        };

        ComponentHealth {
            name: "database".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let database = Database::new("sqlite::memory:").await.unwrap();
        let health_checker = HealthChecker::new(database);

        let response = health_checker.check().await;

        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.service.name, "fitness-tracker-api");
        assert!(response.checks.iter().any(|c| c.name == "database"));
    }

    #[tokio::test]
    async fn test_health_check_is_cached() {
        let database = Database::new("sqlite::memory:").await.unwrap();
        let health_checker = HealthChecker::new(database);

        let first = health_checker.check().await;
        let second = health_checker.check().await;
        assert_eq!(first.timestamp, second.timestamp);
    }
}
