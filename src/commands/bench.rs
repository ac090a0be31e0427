use crate::bench::{self, Benchmark, BenchmarkReport, Scenario};
use crate::config::Config;
use crate::database::DatabasePool;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// Options of the bench command
#[derive(Debug, Clone, Default)]
pub struct BenchOptions {
    /// Configuration file, defaults when absent
    pub config: Option<PathBuf>,
    /// Override of the configured iterations
    pub iterations: Option<u64>,
    /// Override of the configured fixture rows
    pub rows: Option<u64>,
    /// Skip scenarios that need a database
    pub offline: bool,
    /// Scenarios to run, all when empty
    pub scenarios: Vec<Scenario>,
}

impl BenchOptions {
    fn selected(&self) -> Vec<Scenario> {
        let requested = if self.scenarios.is_empty() {
            Scenario::ALL.to_vec()
        } else {
            self.scenarios.clone()
        };
        requested
            .into_iter()
            .filter(|scenario| !self.offline || !scenario.requires_database())
            .collect()
    }
}

/// Run the selected scenarios and collect their timings
pub async fn run_bench(options: &BenchOptions) -> Result<BenchmarkReport> {
    let config = match &options.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    let mut settings = config.benchmark.clone();
    if let Some(iterations) = options.iterations {
        settings.iterations = iterations;
    }
    if let Some(rows) = options.rows {
        settings.rows = rows;
    }

    let scenarios = options.selected();
    if scenarios.is_empty() {
        warn!("No scenario selected");
    }
    let mut report = BenchmarkReport::new(settings.rows);
    info!("Benchmark run {} with {} scenarios", report.run_id, scenarios.len());

    if !scenarios.iter().any(|scenario| scenario.requires_database()) {
        for scenario in scenarios {
            let normalize = scenario == Scenario::Serialization;
            report
                .scenarios
                .push(bench::run_serialization(settings.iterations, normalize)?);
        }
        return Ok(report);
    }

    let pool = DatabasePool::from_config(&config.database)
        .await
        .context("Failed to connect to database")?;
    bench::setup(&pool, settings.rows)
        .await
        .context("Failed to create companies fixture")?;

    let harness = Benchmark::new(&pool, settings);
    let mut outcome = Ok(());
    for scenario in scenarios {
        match harness.run(scenario).await {
            Ok(timing) => report.scenarios.push(timing),
            Err(e) => {
                outcome = Err(e).with_context(|| format!("Scenario '{scenario}' failed"));
                break;
            }
        }
    }

    if let Err(e) = bench::teardown(&pool).await {
        warn!("Failed to drop companies fixture: {}", e);
    }
    outcome.map(|()| report)
}

/// Handle the bench command: print a table or JSON report
#[allow(clippy::disallowed_methods)]
pub fn handle_bench(options: &BenchOptions, json: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    let report = runtime.block_on(run_bench(options))?;

    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("Run {} ({} rows)", report.run_id, report.rows);
    for timing in &report.scenarios {
        println!(
            "{:<32} {:>10} iterations {:>12.1} ms {:>10} rows",
            timing.scenario.label(),
            timing.iterations,
            timing.elapsed_ms,
            timing.rows
        );
    }
    Ok(())
}
