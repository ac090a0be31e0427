use crate::bench::Scenario;
use crate::templates::Dialect;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI interface for `qsql`
#[derive(Parser)]
#[command(name = "qsql")]
#[command(version = crate::VERSION)]
#[command(about = "qsql - Typed SQL queries rendered per dialect")]
#[command(
    long_about = "Render typed queries for H2, CUBRID, PostgreSQL, MySQL and SQLite, and benchmark them against hand written statements"
)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Write a default qsql.toml
    Init {
        /// Directory receiving the configuration file
        #[arg(long, value_name = "DIR", default_value = ".")]
        path: PathBuf,
    },
    /// Print the SQL of the companies lookup for a dialect
    Render {
        /// Target dialect
        #[arg(long, value_enum, default_value_t = Dialect::H2)]
        dialect: Dialect,
        /// Render every clause on one line
        #[arg(long)]
        single_line: bool,
        /// Inline constants instead of binding them
        #[arg(long)]
        literals: bool,
        /// Render the row count query
        #[arg(long, conflicts_with = "merge")]
        count: bool,
        /// Render a merge of one company instead
        #[arg(long)]
        merge: bool,
    },
    /// Compare raw statements with built queries
    Bench {
        /// Configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Executions per scenario
        #[arg(long)]
        iterations: Option<u64>,
        /// Fixture rows
        #[arg(long)]
        rows: Option<u64>,
        /// Run only the scenarios that need no database
        #[arg(long)]
        offline: bool,
        /// Scenarios to run, all by default
        #[arg(long, value_enum)]
        scenario: Vec<Scenario>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
