// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Fitness Tracker API
//!
//! An HTTP API where users log workouts, receive notifications and read
//! weekly or monthly totals of their own activity.
//!
//! ## Features
//!
//! - **Accounts**: registration, JWT login with refresh tokens, profile updates
//! - **Activities**: per-user CRUD with type, date-range and ordering filters
//! - **Notifications**: per-user messages with read tracking
//! - **Metrics**: total duration, distance and calories over the last 7 or 30 days
//!
//! Every record belongs to exactly one user and is only reachable through
//! that user's token.
//!
//! ## Architecture
//!
//! - **Models**: users, activities, notifications and metrics reports
//! - **Metrics**: the aggregator, behind an [`metrics::ActivityStore`] seam
//! - **Database**: SQLite storage implementing that seam
//! - **Routes**: framework-independent handlers
//! - **Server**: warp filters, authentication and error mapping
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fitness_tracker_api::{
//!     auth::AuthManager, config::ServerConfig, database::Database, server::{self, ApiContext},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let database = Database::new(&config.database.url).await?;
//!     let auth_manager = AuthManager::new(vec![7u8; 64], 24, 7);
//!
//!     let context = ApiContext::new(database, auth_manager, config.auth.bcrypt_cost);
//!     server::run(context, &config).await
//! }
//! ```

/// Authentication and token management
pub mod auth;

/// Environment-driven configuration
pub mod config;

/// Application constants and configuration defaults
pub mod constants;

/// SQLite storage
pub mod database;

/// API error type and its HTTP mapping
pub mod errors;

/// Health checks and monitoring
pub mod health;

/// Production logging and structured output
pub mod logging;

/// Weekly and monthly activity aggregation
pub mod metrics;

/// Core data models
pub mod models;

/// Request handlers
pub mod routes;

/// Warp wiring and the server entry point
pub mod server;

/// Input validation
pub mod validation;
