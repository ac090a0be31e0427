use crate::config::ConfigError;
use crate::error::QueryError;
use thiserror::Error;

/// Bench command functionality
pub mod bench;
/// Init command functionality
pub mod init;
/// Render command functionality
pub mod render;

/// Errors reported by command handlers
#[derive(Debug, Error)]
pub enum CommandError {
    /// IO error while reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or written
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The requested statement could not be built
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// The target directory does not exist
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// Missing directory
        path: String,
    },

    /// A configuration file is already present
    #[error("Configuration already exists: {path}")]
    AlreadyInitialized {
        /// Existing file
        path: String,
    },
}

/// Result type for command handlers
pub type Result<T> = std::result::Result<T, CommandError>;
