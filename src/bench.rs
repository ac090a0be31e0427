//! # Query performance harness
//!
//! Compares statements executed directly through the pool with the same
//! lookups built through [`SqlQuery`], and measures the serializer on its own.
//! Live scenarios need a `companies` table which [`setup`] creates and
//! [`teardown`] drops; serialization scenarios run without a database.

use crate::config::{BenchmarkConfig, Configuration};
use crate::database::{DatabaseError, DatabasePool};
use crate::dml::SqlInsertClause;
use crate::error::{QueryError, Result};
use crate::expr::Expression;
use crate::metadata::{JoinType, QueryMetadata};
use crate::query::SqlQuery;
use crate::serializer::SqlSerializer;
use crate::templates::SqlTemplates;
use crate::value::Value;
use crate::TableSource;
use chrono::{DateTime, Utc};
use futures::{pin_mut, TryStreamExt};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

crate::table! {
    /// The `companies` fixture table
    pub struct QCompanies("COMPANIES") {
        id: i64 => "ID",
        name: String => "NAME",
    }
}

impl QCompanies {
    /// The fixture aliased by its own name
    #[must_use]
    pub fn fixture() -> Self {
        Self::new("COMPANIES")
    }
}

const CREATE_TABLE: &str = "drop table if exists companies;
create table companies (id bigserial primary key, name varchar(30) unique not null)";
const DROP_TABLE: &str = "drop table if exists companies";
const RAW_BY_ID: &str = "select name from companies where id = $1";
const RAW_BY_NAME: &str = "select name from companies where name = $1";

/// One measured workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Hand written statement, lookup by id
    RawById,
    /// Hand written statement, lookup by name
    RawByName,
    /// Built query collected into a list, lookup by id
    DslById,
    /// Built query consumed as a row stream, lookup by id
    DslByIdIterated,
    /// Built query without source validation, lookup by id
    DslByIdNoValidation,
    /// Built query selecting id and name, lookup by id
    DslByIdTwoColumns,
    /// Built query collected into a list, lookup by name
    DslByName,
    /// Built query consumed as a row stream, lookup by name
    DslByNameIterated,
    /// Built query without source validation, lookup by name
    DslByNameNoValidation,
    /// Serializer with constant folding
    Serialization,
    /// Serializer without constant folding
    SerializationNonNormalized,
}

impl Scenario {
    /// Every scenario in reporting order
    pub const ALL: [Self; 11] = [
        Self::RawById,
        Self::RawByName,
        Self::DslById,
        Self::DslByIdIterated,
        Self::DslByIdNoValidation,
        Self::DslByIdTwoColumns,
        Self::DslByName,
        Self::DslByNameIterated,
        Self::DslByNameNoValidation,
        Self::Serialization,
        Self::SerializationNonNormalized,
    ];

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RawById => "raw by id",
            Self::RawByName => "raw by name",
            Self::DslById => "dsl by id (list)",
            Self::DslByIdIterated => "dsl by id (iterated)",
            Self::DslByIdNoValidation => "dsl by id (no validation)",
            Self::DslByIdTwoColumns => "dsl by id (two columns)",
            Self::DslByName => "dsl by name (list)",
            Self::DslByNameIterated => "dsl by name (iterated)",
            Self::DslByNameNoValidation => "dsl by name (no validation)",
            Self::Serialization => "serialization (normalized)",
            Self::SerializationNonNormalized => "serialization (non-normalized)",
        }
    }

    /// Whether the scenario talks to the database
    #[must_use]
    pub const fn requires_database(self) -> bool {
        !matches!(self, Self::Serialization | Self::SerializationNonNormalized)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Timing of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Measured scenario
    pub scenario: Scenario,
    /// Executions performed
    pub iterations: u64,
    /// Wall clock time in milliseconds
    pub elapsed_ms: f64,
    /// Rows read, or statements produced for serialization scenarios
    pub rows: u64,
}

impl ScenarioReport {
    fn new(scenario: Scenario, iterations: u64, elapsed: Duration, rows: u64) -> Self {
        let report = Self {
            scenario,
            iterations,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            rows,
        };
        info!(
            "{}: {} iterations in {:.1} ms ({} rows)",
            scenario, iterations, report.elapsed_ms, rows
        );
        report
    }
}

/// Result of a benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    /// Unique id of the run
    pub run_id: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Fixture rows
    pub rows: u64,
    /// Timings in execution order
    pub scenarios: Vec<ScenarioReport>,
}

impl BenchmarkReport {
    /// Start an empty report
    #[must_use]
    pub fn new(rows: u64) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            rows,
            scenarios: Vec::new(),
        }
    }

    /// Render the report as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Key of the row looked up at iteration `i`, in `0..rows`
fn key(i: u64, settings: &BenchmarkConfig) -> u64 {
    let rows = settings.rows.max(1);
    if settings.random_keys {
        fastrand::u64(0..rows)
    } else {
        i % rows
    }
}

/// Fixture ids start at 1
fn id_for(key: u64) -> i64 {
    i64::try_from(key).map_or(i64::MAX, |id| id.saturating_add(1))
}

/// Create the fixture table and insert `rows` companies named `"0"`, `"1"`, ...
pub async fn setup(pool: &DatabasePool, rows: u64) -> std::result::Result<(), DatabaseError> {
    info!("Creating companies fixture with {} rows", rows);
    pool.batch_execute(CREATE_TABLE).await?;

    let configuration = Configuration::new(SqlTemplates::postgres());
    let companies = QCompanies::fixture();
    let insert = SqlInsertClause::new(&configuration, &companies)
        .set(&companies.name, String::new())
        .to_sql()?;

    let inserted = pool
        .execute_many(
            &insert.sql,
            (0..rows).map(|i| vec![Value::Text(i.to_string())]),
        )
        .await?;
    debug!("Inserted {} fixture rows", inserted);
    Ok(())
}

/// Drop the fixture table
pub async fn teardown(pool: &DatabasePool) -> std::result::Result<(), DatabaseError> {
    info!("Dropping companies fixture");
    pool.batch_execute(DROP_TABLE).await
}

/// Metadata of `select COMPANIES.NAME from COMPANIES COMPANIES where COMPANIES.ID = ?`
pub fn fixture_metadata(companies: &QCompanies, id: i64) -> Result<QueryMetadata> {
    let mut metadata = QueryMetadata::new();
    metadata.add_join(JoinType::Default, companies.table().clone());
    metadata.add_where(companies.id.eq(id))?;
    metadata.add_projection(companies.name.to_expr())?;
    Ok(metadata)
}

/// Serialize the fixture lookup `iterations` times with H2 templates
///
/// Metadata is built once; each iteration uses a fresh serializer and reads
/// its text, constants and constant paths.
pub fn run_serialization(iterations: u64, normalize: bool) -> Result<ScenarioReport> {
    let templates = SqlTemplates::h2();
    let companies = QCompanies::fixture();
    let metadata = fixture_metadata(&companies, 1)?;
    let scenario = if normalize {
        Scenario::Serialization
    } else {
        Scenario::SerializationNonNormalized
    };

    let started = Instant::now();
    let mut produced = 0;
    for _ in 0..iterations {
        let mut serializer = SqlSerializer::new(&templates);
        serializer.set_normalize(normalize);
        serializer.serialize(&metadata, false)?;
        if serializer.sql().is_empty()
            || serializer.constants().len() != serializer.constant_paths().len()
        {
            return Err(QueryError::EmptyStatement);
        }
        produced += 1;
    }
    Ok(ScenarioReport::new(
        scenario,
        iterations,
        started.elapsed(),
        produced,
    ))
}

/// Runs scenarios against a live database
pub struct Benchmark<'p> {
    pool: &'p DatabasePool,
    configuration: Configuration,
    companies: QCompanies,
    settings: BenchmarkConfig,
}

impl<'p> Benchmark<'p> {
    /// Create a harness; queries are rendered with `PostgreSQL` templates
    #[must_use]
    pub fn new(pool: &'p DatabasePool, settings: BenchmarkConfig) -> Self {
        Self {
            pool,
            configuration: Configuration::new(SqlTemplates::postgres()),
            companies: QCompanies::fixture(),
            settings,
        }
    }

    fn query(&self, validate: bool) -> SqlQuery<'_> {
        let metadata = if validate {
            QueryMetadata::new()
        } else {
            QueryMetadata::new().no_validate()
        };
        SqlQuery::with_metadata(&self.configuration, metadata).from(&self.companies)
    }

    async fn raw(&self, statement: &str, by_name: bool) -> std::result::Result<u64, DatabaseError> {
        let mut rows = 0;
        for i in 0..self.settings.iterations {
            let key = key(i, &self.settings);
            let param = if by_name {
                Value::Text(key.to_string())
            } else {
                Value::Int(id_for(key))
            };
            for row in self.pool.query_values(statement, &[param]).await? {
                let _name: String = row.try_get(0)?;
                rows += 1;
            }
        }
        Ok(rows)
    }

    async fn list(&self, by_name: bool, validate: bool) -> std::result::Result<u64, DatabaseError> {
        let companies = &self.companies;
        let mut rows = 0;
        for i in 0..self.settings.iterations {
            let key = key(i, &self.settings);
            let predicate = if by_name {
                companies.name.eq(key.to_string())
            } else {
                companies.id.eq(id_for(key))
            };
            let names = self
                .query(validate)
                .where_(predicate)
                .fetch_values(self.pool, &companies.name)
                .await?;
            rows += names.len() as u64;
        }
        Ok(rows)
    }

    async fn iterated(&self, by_name: bool) -> std::result::Result<u64, DatabaseError> {
        let companies = &self.companies;
        let mut rows = 0;
        for i in 0..self.settings.iterations {
            let key = key(i, &self.settings);
            let predicate = if by_name {
                companies.name.eq(key.to_string())
            } else {
                companies.id.eq(id_for(key))
            };
            let stream = self
                .query(true)
                .where_(predicate)
                .iterate(self.pool, &companies.name)
                .await?;
            pin_mut!(stream);
            while let Some(row) = stream.try_next().await? {
                let _name: String = row.try_get(0)?;
                rows += 1;
            }
        }
        Ok(rows)
    }

    async fn two_columns(&self) -> std::result::Result<u64, DatabaseError> {
        let companies = &self.companies;
        let mut rows = 0;
        for i in 0..self.settings.iterations {
            let id = id_for(key(i, &self.settings));
            for row in self
                .query(true)
                .where_(companies.id.eq(id))
                .fetch(self.pool, (&companies.id, &companies.name))
                .await?
            {
                let _id: i64 = row.try_get(0)?;
                let _name: String = row.try_get(1)?;
                rows += 1;
            }
        }
        Ok(rows)
    }

    /// Time one scenario
    pub async fn run(&self, scenario: Scenario) -> std::result::Result<ScenarioReport, DatabaseError> {
        debug!("Running scenario: {}", scenario);
        let started = Instant::now();
        let rows = match scenario {
            Scenario::RawById => self.raw(RAW_BY_ID, false).await?,
            Scenario::RawByName => self.raw(RAW_BY_NAME, true).await?,
            Scenario::DslById => self.list(false, true).await?,
            Scenario::DslByIdIterated => self.iterated(false).await?,
            Scenario::DslByIdNoValidation => self.list(false, false).await?,
            Scenario::DslByIdTwoColumns => self.two_columns().await?,
            Scenario::DslByName => self.list(true, true).await?,
            Scenario::DslByNameIterated => self.iterated(true).await?,
            Scenario::DslByNameNoValidation => self.list(true, false).await?,
            Scenario::Serialization => {
                return Ok(run_serialization(self.settings.iterations, true)?);
            }
            Scenario::SerializationNonNormalized => {
                return Ok(run_serialization(self.settings.iterations, false)?);
            }
        };
        Ok(ScenarioReport::new(
            scenario,
            self.settings.iterations,
            started.elapsed(),
            rows,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_query_h2() {
        let templates = SqlTemplates::h2();
        let metadata = fixture_metadata(&QCompanies::fixture(), 1).unwrap();
        let mut serializer = SqlSerializer::new(&templates);
        serializer.serialize(&metadata, false).unwrap();

        assert_eq!(
            serializer.to_string(),
            "select COMPANIES.NAME\nfrom COMPANIES COMPANIES\nwhere COMPANIES.ID = ?"
        );
        assert_eq!(serializer.constants(), &[Value::Int(1)]);
    }

    #[test]
    fn test_serialization_scenarios_run_offline() {
        let normalized = run_serialization(50, true).unwrap();
        let plain = run_serialization(50, false).unwrap();

        assert_eq!(normalized.scenario, Scenario::Serialization);
        assert_eq!(normalized.rows, 50);
        assert_eq!(plain.scenario, Scenario::SerializationNonNormalized);
        assert!(!Scenario::Serialization.requires_database());
        assert!(Scenario::RawById.requires_database());
    }

    #[test]
    fn test_sequential_keys_wrap_around_rows() {
        let settings = BenchmarkConfig {
            iterations: 10,
            rows: 3,
            random_keys: false,
        };
        let keys: Vec<u64> = (0..5).map(|i| key(i, &settings)).collect();
        assert_eq!(keys, vec![0, 1, 2, 0, 1]);
        assert_eq!(id_for(0), 1);
    }

    #[test]
    fn test_random_keys_stay_in_range() {
        let settings = BenchmarkConfig {
            iterations: 10,
            rows: 7,
            random_keys: true,
        };
        assert!((0..100).all(|i| key(i, &settings) < 7));
    }

    #[test]
    fn test_report_json() {
        let mut report = BenchmarkReport::new(10);
        report.scenarios.push(run_serialization(1, true).unwrap());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"scenario\": \"serialization\""));
        assert!(json.contains(&report.run_id));
    }
}
