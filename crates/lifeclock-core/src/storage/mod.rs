mod config;
pub mod database;
pub mod snapshot;

pub use config::{Config, GatewayConfig, LifespanSettings, TimerDefaults};
pub use database::Database;
pub use snapshot::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns `~/.config/lifeclock[-dev]/` based on LIFECLOCK_ENV.
///
/// Set LIFECLOCK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("LIFECLOCK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("lifeclock-dev")
    } else {
        base_dir.join("lifeclock")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
