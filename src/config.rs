use crate::templates::{Dialect, SqlTemplates};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error occurred while reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error occurred
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error occurred
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Main configuration structure for qsql
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Query rendering configuration
    #[serde(default)]
    pub query: QueryConfig,
    /// Benchmark configuration
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

/// Database connection configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database user
    pub user: String,
    /// Environment variable containing the password
    pub password_env: Option<String>,
    /// Database name
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password_env: Some("POSTGRES_PASSWORD".to_string()),
            database: "postgres".to_string(),
        }
    }
}

/// Query rendering configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct QueryConfig {
    /// Dialect used to render queries
    pub dialect: Dialect,
    /// Inline constants instead of binding them
    #[serde(default)]
    pub use_literals: bool,
    /// Render every clause on one line
    #[serde(default)]
    pub single_line: bool,
    /// Quote every identifier
    #[serde(default)]
    pub quote_identifiers: bool,
    /// Qualify tables with their schema
    #[serde(default)]
    pub print_schema: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            use_literals: false,
            single_line: false,
            quote_identifiers: false,
            print_schema: false,
        }
    }
}

/// Benchmark configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BenchmarkConfig {
    /// Executions per scenario
    pub iterations: u64,
    /// Fixture rows inserted before the run
    pub rows: u64,
    /// Look rows up in random order instead of sequentially
    #[serde(default)]
    pub random_keys: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            rows: 10_000,
            random_keys: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl QueryConfig {
    /// Build the templates and settings described by this section
    #[must_use]
    pub fn configuration(&self) -> Configuration {
        let mut templates = self.dialect.templates();
        if self.single_line {
            templates.new_line_to_single_space();
        }
        templates
            .set_quote_all(self.quote_identifiers)
            .set_print_schema(self.print_schema);
        Configuration::new(templates).with_literals(self.use_literals)
    }
}

/// Settings shared by every query built against one database
#[derive(Debug, Clone)]
pub struct Configuration {
    templates: SqlTemplates,
    use_literals: bool,
}

impl Configuration {
    /// Create a configuration around dialect templates
    #[must_use]
    pub const fn new(templates: SqlTemplates) -> Self {
        Self {
            templates,
            use_literals: false,
        }
    }

    /// Inline constants as literals
    #[must_use]
    pub fn with_literals(mut self, use_literals: bool) -> Self {
        self.use_literals = use_literals;
        self
    }

    /// Dialect templates
    #[must_use]
    pub const fn templates(&self) -> &SqlTemplates {
        &self.templates
    }

    /// Whether constants are inlined
    #[must_use]
    pub const fn use_literals(&self) -> bool {
        self.use_literals
    }
}
