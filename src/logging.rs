// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structured logging setup and domain-specific log events

use crate::constants::service::{SERVICE_NAME, SERVICE_VERSION};
use anyhow::Result;
use serde_json::json;
use std::env;
use std::io;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level or filter directive (e.g. `info`, `fitness_tracker_api=debug`)
    pub level: String,
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Emit span open/close events
    pub include_spans: bool,
    pub service_name: String,
    pub service_version: String,
    /// Deployment environment (development, staging, production)
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-field human readable output
    Pretty,
    Compact,
}

impl LogFormat {
    fn from_name(name: &str) -> Self {
        match name {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
            include_spans: false,
            service_name: SERVICE_NAME.to_string(),
            service_version: SERVICE_VERSION.to_string(),
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::from_name(env::var("LOG_FORMAT").as_deref().unwrap_or("pretty")),
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: is_production || env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.to_string()),
            service_version: SERVICE_VERSION.to_string(),
            environment,
        }
    }

    /// Install the global tracing subscriber
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init(&self) -> Result<()> {
        let env_filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);

        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_writer(io::stdout)
            .with_span_events(span_events);

        match self.format {
            LogFormat::Json => registry.with(layer.json()).try_init()?,
            LogFormat::Pretty => registry.with(layer).try_init()?,
            LogFormat::Compact => registry.with(layer.compact().with_target(false)).try_init()?,
        }

        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Fitness tracker API starting up"
        );

        Ok(())
    }

    /// Configuration snapshot for startup logs
    pub fn summary(&self) -> serde_json::Value {
        json!({
            "service": self.service_name,
            "version": self.service_version,
            "environment": self.environment,
            "level": self.level,
            "format": format!("{:?}", self.format),
        })
    }
}

/// Initialize logging from environment
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Application-specific logging utilities
pub struct AppLogger;

impl AppLogger {
    /// Log user authentication events
    pub fn log_auth_event(user: &str, event: &str, success: bool, details: Option<&str>) {
        info!(
            user.name = %user,
            auth.event = %event,
            auth.success = %success,
            auth.details = details.unwrap_or(""),
            "Authentication event"
        );
    }

    /// Log API requests
    pub fn log_api_request(method: &str, path: &str, status: u16, duration_ms: u64) {
        info!(
            http.method = %method,
            http.path = %path,
            http.status = %status,
            http.duration_ms = %duration_ms,
            "HTTP request"
        );
    }

    /// Log database writes
    pub fn log_database_operation(operation: &str, table: &str, user_id: &str, success: bool) {
        info!(
            db.operation = %operation,
            db.table = %table,
            db.success = %success,
            user.id = %user_id,
            "Database operation"
        );
    }

    /// Log security events such as cross-user access attempts
    pub fn log_security_event(event_type: &str, details: &str, user_id: Option<&str>) {
        warn!(
            security.event = %event_type,
            security.details = %details,
            user.id = user_id.unwrap_or("unknown"),
            "Security event"
        );
    }

    /// Log a computed metrics report
    pub fn log_metrics_computed(user_id: &str, period: &str, total_duration: i64, total_calories: i64) {
        info!(
            user.id = %user_id,
            metrics.period = %period,
            metrics.total_duration = %total_duration,
            metrics.total_calories = %total_calories,
            "Activity metrics computed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_logging_config_from_env() {
        env::set_var("RUST_LOG", "debug");
        env::set_var("LOG_FORMAT", "json");
        env::set_var("ENVIRONMENT", "production");
        env::set_var("SERVICE_NAME", "test-service");

        let config = LoggingConfig::from_env();

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.environment, "production");
        assert_eq!(config.service_name, "test-service");
        assert!(config.include_location); // production turns on locations

        env::remove_var("RUST_LOG");
        env::remove_var("LOG_FORMAT");
        env::remove_var("ENVIRONMENT");
        env::remove_var("SERVICE_NAME");
    }

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();

        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.environment, "development");
        assert_eq!(config.service_name, "fitness-tracker-api");
        assert!(!config.include_location);
        assert_eq!(config.summary()["service"], "fitness-tracker-api");
    }

    #[test]
    fn test_unknown_format_falls_back_to_pretty() {
        assert_eq!(LogFormat::from_name("xml"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_name("compact"), LogFormat::Compact);
    }
}
