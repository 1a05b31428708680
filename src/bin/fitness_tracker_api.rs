// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Fitness Tracker API Server Binary
//!
//! Loads configuration from the environment, opens the database, loads or
//! creates the JWT signing secret and serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use fitness_tracker_api::{
    auth::{generate_jwt_secret, AuthManager},
    config::ServerConfig,
    constants::defaults::JWT_SECRET_LEN,
    database::Database,
    logging,
    server::{self, ApiContext},
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "fitness-tracker-api")]
#[command(about = "Fitness tracking HTTP API")]
#[command(version)]
pub struct Args {
    /// Port to listen on (overrides HTTP_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(short, long)]
    database_url: Option<String>,

    /// JWT secret file, generated if it doesn't exist (overrides JWT_SECRET_PATH)
    #[arg(short, long)]
    jwt_secret_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;

    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(path) = args.jwt_secret_file {
        config.auth.jwt_secret_path = path;
    }

    config.validate()?;
    info!("{}", config.summary());

    let jwt_secret = load_or_generate_jwt_secret(&config.auth.jwt_secret_path)?;
    info!("JWT secret loaded from: {}", config.auth.jwt_secret_path.display());

    ensure_database_dir(&config.database.url)?;
    let database = Database::new(&config.database.url).await?;
    info!("Database initialized successfully");

    let auth_manager = AuthManager::new(
        jwt_secret.to_vec(),
        config.auth.jwt_expiry_hours,
        config.auth.refresh_expiry_days,
    );

    let context = ApiContext::new(database, auth_manager, config.auth.bcrypt_cost);
    if let Err(e) = server::run(context, &config).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Load JWT secret from file or generate a new one
fn load_or_generate_jwt_secret(secret_file: &Path) -> Result<[u8; JWT_SECRET_LEN]> {
    if secret_file.exists() {
        let secret_data = std::fs::read(secret_file)
            .with_context(|| format!("Failed to read {}", secret_file.display()))?;
        let secret: [u8; JWT_SECRET_LEN] = secret_data.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "Invalid JWT secret length: expected {} bytes, got {}",
                JWT_SECRET_LEN,
                secret_data.len()
            )
        })?;
        return Ok(secret);
    }

    if let Some(parent) = secret_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let secret = generate_jwt_secret()?;
    std::fs::write(secret_file, secret)?;
    info!("Generated new JWT secret: {}", secret_file.display());
    Ok(secret)
}

/// SQLite creates the file but not its directory
fn ensure_database_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
    }
    Ok(())
}
