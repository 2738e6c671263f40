//! pulse-verify - business verification service
//!
//! Serves `GET /api/verify/:id` plus the directory, issue-report and health
//! routes. Default port 5740.

use anyhow::{Context, Result};
use clap::Parser;
use pulse_common::config::{init_tracing, load_toml_or_default, resolve_config_file};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use pulse_verify::aggregator::Aggregator;
use pulse_verify::config::{ServiceConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use pulse_verify::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "pulse-verify", version, about = "TLV Business Pulse verification service")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Bind address (overrides [server] host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides [server] port)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file (overrides [database] path)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (overrides [logging] level)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.database {
            config.database.path = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: CLI > PULSE_* environment > TOML > defaults
    let config_path = resolve_config_file(cli.config.as_deref(), CONFIG_ENV_VAR, CONFIG_FILE_NAME);
    let mut config: ServiceConfig = load_toml_or_default(config_path.as_deref())?;
    config.apply_env_overrides()?;
    cli.apply(&mut config);

    init_tracing(&config.logging)?;

    info!(
        "Starting TLV Business Pulse verification (pulse-verify) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    config
        .verification
        .validate()
        .context("Invalid verification configuration")?;
    config.log_warnings();

    let db_path = config.database.resolved_path();
    info!("Database path: {}", db_path.display());
    let pool = match pulse_common::db::init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let verification = Arc::new(config.verification.clone());
    let aggregator =
        Aggregator::from_config(verification).context("Failed to build source adapters")?;
    for source in &config.verification.sources {
        info!(
            source = %source.id,
            required = source.required,
            weight = source.weight,
            "Verification source enabled"
        );
    }

    let state = AppState::new(pool, aggregator);
    let app = build_router(state);

    let bind_address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("pulse-verify listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
