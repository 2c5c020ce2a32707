pub mod api;
pub mod appointment;
pub mod config;
pub mod db;
pub mod models;
pub mod patient;
pub mod validation;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::{ApiContext, ServerError};
use crate::config::{Config, ConfigError};
use crate::db::{default_schemas, DatabaseError, SqliteRecordStore};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot open record store: {0}")]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = Config::from_env()?;
    tracing::info!(db_path = %config.db_path.display(), "Opening record store");
    let store = SqliteRecordStore::open(&config.db_path, default_schemas(&config.collections))?;

    let ctx = ApiContext::new(Arc::new(store), &config.collections);
    api::serve(config.bind_addr, ctx).await?;

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
