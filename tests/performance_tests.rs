mod common;

use qsql::bench::{self, Benchmark, BenchmarkReport, Scenario};
use qsql::config::BenchmarkConfig;
use std::time::Instant;

/// Serialization of the companies lookup must stay cheap without a database
#[test]
fn test_serialization_throughput() {
    let start = Instant::now();
    let normalized = bench::run_serialization(10_000, true).unwrap();
    let plain = bench::run_serialization(10_000, false).unwrap();
    let elapsed = start.elapsed();

    println!(
        "Serialized 20000 queries in {}ms ({:.1} / {:.1} ms)",
        elapsed.as_millis(),
        normalized.elapsed_ms,
        plain.elapsed_ms
    );
    assert_eq!(normalized.rows, 10_000);
    assert_eq!(plain.rows, 10_000);
    assert!(elapsed.as_secs() < 30, "serialization is unexpectedly slow");
}

/// Every live scenario reads exactly one row per lookup
#[tokio::test]
async fn test_live_scenarios_against_fixture() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    let settings = BenchmarkConfig {
        iterations: 20,
        rows: 50,
        random_keys: true,
    };
    bench::setup(&pool, settings.rows).await.unwrap();

    let harness = Benchmark::new(&pool, settings);
    let mut report = BenchmarkReport::new(50);
    for scenario in Scenario::ALL {
        let timing = harness.run(scenario).await.unwrap();
        assert_eq!(timing.iterations, 20);
        assert_eq!(timing.rows, 20, "{scenario} read an unexpected number of rows");
        report.scenarios.push(timing);
    }

    bench::teardown(&pool).await.unwrap();
    assert_eq!(report.scenarios.len(), Scenario::ALL.len());
    println!("{}", report.to_json().unwrap());
}
