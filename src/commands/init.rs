use super::{CommandError, Result};
use crate::config::Config;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the configuration file written by `init`
pub const CONFIG_FILE: &str = "qsql.toml";

/// Handle the init command: write a default configuration into `dir`
#[allow(clippy::disallowed_methods)]
pub fn handle_init(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(CommandError::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }

    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        return Err(CommandError::AlreadyInitialized {
            path: config_path.display().to_string(),
        });
    }

    let config = Config::default();
    fs::write(&config_path, config.to_toml()?)?;
    info!("Wrote default configuration to {}", config_path.display());

    println!("Successfully initialized qsql configuration");
    println!("Dialect: {}", config.query.dialect);
    println!("Database: {}@{}:{}", config.database.database, config.database.host, config.database.port);
    println!("Configuration saved to: {}", config_path.display());

    Ok(config_path)
}
