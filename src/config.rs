use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "CarePulse";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default document database id. Every collection lives under it.
pub const DEFAULT_DATABASE_ID: &str = "carepulse";
pub const DEFAULT_USER_COLLECTION_ID: &str = "users";
pub const DEFAULT_PATIENT_COLLECTION_ID: &str = "patients";
pub const DEFAULT_APPOINTMENT_COLLECTION_ID: &str = "appointments";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DB_FILE_NAME: &str = "carepulse.sqlite3";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid bind address {value}: {reason}")]
    InvalidBindAddr { value: String, reason: String },

    #[error("Invalid value for {key}: must not be empty")]
    EmptyValue { key: &'static str },
}

/// Identifies the database and collections the boundaries read and write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionIds {
    pub database_id: String,
    pub users: String,
    pub patients: String,
    pub appointments: String,
}

impl Default for CollectionIds {
    fn default() -> Self {
        Self {
            database_id: DEFAULT_DATABASE_ID.into(),
            users: DEFAULT_USER_COLLECTION_ID.into(),
            patients: DEFAULT_PATIENT_COLLECTION_ID.into(),
            appointments: DEFAULT_APPOINTMENT_COLLECTION_ID.into(),
        }
    }
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub collections: CollectionIds,
}

impl Config {
    /// Load from `CAREPULSE_*` environment variables, falling back to defaults.
    ///
    /// - `CAREPULSE_BIND_ADDR` (default `127.0.0.1:3000`)
    /// - `CAREPULSE_DB_PATH` (default `<data dir>/CarePulse/carepulse.sqlite3`)
    /// - `CAREPULSE_DATABASE_ID`, `CAREPULSE_USER_COLLECTION_ID`,
    ///   `CAREPULSE_PATIENT_COLLECTION_ID`, `CAREPULSE_APPOINTMENT_COLLECTION_ID`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads through `lookup`, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("CAREPULSE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidBindAddr {
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let db_path = lookup("CAREPULSE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let collections = CollectionIds {
            database_id: non_empty(&lookup, "CAREPULSE_DATABASE_ID", DEFAULT_DATABASE_ID)?,
            users: non_empty(&lookup, "CAREPULSE_USER_COLLECTION_ID", DEFAULT_USER_COLLECTION_ID)?,
            patients: non_empty(
                &lookup,
                "CAREPULSE_PATIENT_COLLECTION_ID",
                DEFAULT_PATIENT_COLLECTION_ID,
            )?,
            appointments: non_empty(
                &lookup,
                "CAREPULSE_APPOINTMENT_COLLECTION_ID",
                DEFAULT_APPOINTMENT_COLLECTION_ID,
            )?,
        };

        Ok(Self {
            bind_addr,
            db_path,
            collections,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &'static str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue { key }),
        Some(v) => Ok(v.trim().to_string()),
        None => Ok(default.to_string()),
    }
}

/// Get the application data directory.
/// Falls back to the working directory when the platform has no data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join(DB_FILE_NAME)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "carepulse_lib=info,carepulse=info,warn"
}
