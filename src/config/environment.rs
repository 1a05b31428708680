// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration management for deployment

use crate::constants::defaults;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub http_host: String,
    pub http_port: u16,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    /// CORS allowed origins (`*` for any)
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT secret key path; generated on first start
    pub jwt_secret_path: PathBuf,
    /// Access token lifetime in hours
    pub jwt_expiry_hours: i64,
    /// Refresh token lifetime in days
    pub refresh_expiry_days: i64,
    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: defaults::HTTP_HOST.to_string(),
            http_port: defaults::HTTP_PORT,
            database: DatabaseConfig {
                url: defaults::DATABASE_URL.to_string(),
            },
            auth: AuthConfig {
                jwt_secret_path: PathBuf::from(defaults::JWT_SECRET_PATH),
                jwt_expiry_hours: defaults::JWT_EXPIRY_HOURS,
                refresh_expiry_days: defaults::REFRESH_EXPIRY_DAYS,
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenv::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let fallback = ServerConfig::default();

        let config = ServerConfig {
            http_host: env_var_or("HTTP_HOST", &fallback.http_host),
            http_port: env_var_or("HTTP_PORT", &fallback.http_port.to_string())
                .parse()
                .context("Invalid HTTP_PORT value")?,
            database: DatabaseConfig {
                url: env_var_or("DATABASE_URL", &fallback.database.url),
            },
            auth: AuthConfig {
                jwt_secret_path: env::var("JWT_SECRET_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(fallback.auth.jwt_secret_path),
                jwt_expiry_hours: env_var_or(
                    "JWT_EXPIRY_HOURS",
                    &fallback.auth.jwt_expiry_hours.to_string(),
                )
                .parse()
                .context("Invalid JWT_EXPIRY_HOURS value")?,
                refresh_expiry_days: env_var_or(
                    "REFRESH_EXPIRY_DAYS",
                    &fallback.auth.refresh_expiry_days.to_string(),
                )
                .parse()
                .context("Invalid REFRESH_EXPIRY_DAYS value")?,
                bcrypt_cost: env_var_or("BCRYPT_COST", &fallback.auth.bcrypt_cost.to_string())
                    .parse()
                    .context("Invalid BCRYPT_COST value")?,
            },
            cors_origins: parse_origins(&env_var_or("CORS_ORIGINS", "*")),
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(anyhow::anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.auth.jwt_expiry_hours <= 0 {
            return Err(anyhow::anyhow!("JWT_EXPIRY_HOURS must be positive"));
        }

        if self.auth.refresh_expiry_days <= 0 {
            return Err(anyhow::anyhow!("REFRESH_EXPIRY_DAYS must be positive"));
        }

        // bcrypt accepts costs 4..=31
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(anyhow::anyhow!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            ));
        }

        if self.cors_origins.is_empty() {
            warn!("CORS_ORIGINS is empty; browsers will be unable to call the API");
        }

        if let Some(origin) = self.cors_origins.iter().find(|o| {
            o.as_str() != "*" && !o.starts_with("http://") && !o.starts_with("https://")
        }) {
            return Err(anyhow::anyhow!("Invalid CORS origin: {}", origin));
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    pub fn summary(&self) -> String {
        format!(
            "Fitness Tracker API Configuration:\n\
             - Listen: {}:{}\n\
             - Database: {}\n\
             - Access token expiry: {}h\n\
             - Refresh token expiry: {}d\n\
             - CORS origins: {}",
            self.http_host,
            self.http_port,
            if self.database.url.contains(":memory:") { "SQLite (in-memory)" } else { "SQLite (file)" },
            self.auth.jwt_expiry_hours,
            self.auth.refresh_expiry_days,
            self.cors_origins.join(", ")
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_string()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert_eq!(
            parse_origins("http://localhost:3000, https://app.example.com"),
            vec!["http://localhost:3000", "https://app.example.com"]
        );
        assert_eq!(parse_origins(""), Vec::<String>::new());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_port, 8000);
        assert!(config.summary().contains("SQLite (file)"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig::default();

        config.database.url = String::new();
        assert!(config.validate().is_err());
        config.database.url = "sqlite::memory:".to_string();
        assert!(config.validate().is_ok());

        config.auth.bcrypt_cost = 2;
        assert!(config.validate().is_err());
        config.auth.bcrypt_cost = 4;

        config.auth.jwt_expiry_hours = 0;
        assert!(config.validate().is_err());
        config.auth.jwt_expiry_hours = 24;

        config.cors_origins = vec!["localhost:3000".to_string()];
        assert!(config.validate().is_err());
    }
}
