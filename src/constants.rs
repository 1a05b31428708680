// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Application constants shared by the HTTP layer, the metrics aggregator
//! and the configuration defaults.

/// Service identity
pub mod service {
    /// Service name used in logs and health responses
    pub const SERVICE_NAME: &str = "fitness-tracker-api";

    /// Service version from Cargo.toml
    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Body of the public welcome endpoint
    pub const WELCOME_MESSAGE: &str = "Welcome to the Fitness Tracker API!";
}

/// Metrics window sizes
pub mod metrics {
    /// Days covered by a weekly report
    pub const WEEKLY_WINDOW_DAYS: i64 = 7;

    /// Days covered by a monthly report (fixed offset, not calendar months)
    pub const MONTHLY_WINDOW_DAYS: i64 = 30;
}

/// Defaults used when the environment does not override them
pub mod defaults {
    pub const HTTP_HOST: &str = "127.0.0.1";
    pub const HTTP_PORT: u16 = 8000;
    pub const DATABASE_URL: &str = "sqlite:./data/fitness.db";
    pub const JWT_SECRET_PATH: &str = "./data/jwt.secret";
    pub const JWT_EXPIRY_HOURS: i64 = 24;
    pub const REFRESH_EXPIRY_DAYS: i64 = 7;

    /// Length of generated JWT secrets in bytes
    pub const JWT_SECRET_LEN: usize = 64;
}

/// Validation limits and user-facing messages
pub mod messages {
    pub const MIN_PASSWORD_LEN: usize = 8;
    pub const MAX_USERNAME_LEN: usize = 150;

    /// Longest single activity accepted, in minutes (one week)
    pub const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;

    pub const INVALID_PERIOD: &str = "Invalid period specified. Use 'weekly' or 'monthly'.";
    pub const ACTIVITY_TYPE_REQUIRED: &str = "Activity Type is required.";
    pub const DURATION_NOT_POSITIVE: &str = "Duration must be a positive value in minutes.";
    pub const DISTANCE_NEGATIVE: &str = "Distance cannot be negative.";
    pub const AUTH_REQUIRED: &str = "Authentication credentials were not provided or are invalid.";
    pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";
    pub const NOT_FOUND: &str = "Not found.";
    pub const INTERNAL_ERROR: &str = "Internal server error";
}
