//! services/engine/src/bin/migrate.rs
//!
//! Applies pending schema migrations and exits. Run this before pointing the
//! serving layer at a fresh database.

use engine_lib::{Config, Engine, EngineError};
use std::sync::Arc;
use storycove_core::NoopFinalizer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Connecting to database...");
    let engine = Engine::connect(&config, Arc::new(NoopFinalizer)).await?;
    info!("Running database migrations...");
    engine.run_migrations().await?;
    info!("Database migrations complete.");

    Ok(())
}
