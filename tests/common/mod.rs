/// Shared test utilities for qsql integration tests
use qsql::config::DatabaseConfig;
use qsql::database::DatabasePool;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Database configuration used by live tests, overridable through `QSQL_TEST_HOST`
#[allow(dead_code)]
pub fn test_db_config() -> DatabaseConfig {
    let mut config = DatabaseConfig::default();
    if let Ok(host) = std::env::var("QSQL_TEST_HOST") {
        config.host = host;
    }
    config
}

/// Connect to the test database, or `None` when PostgreSQL is not reachable
pub async fn try_pool() -> Option<DatabasePool> {
    let config = test_db_config();
    let reachable = timeout(
        Duration::from_millis(500),
        TcpStream::connect((config.host.as_str(), config.port)),
    )
    .await
    .is_ok_and(|connected| connected.is_ok());
    if !reachable {
        println!("⚠️  PostgreSQL not reachable (expected without PostgreSQL)");
        return None;
    }

    let pool = DatabasePool::from_config(&config).await.ok()?;
    match pool.query("select 1", &[]).await {
        Ok(_) => Some(pool),
        Err(e) => {
            println!("⚠️  PostgreSQL refused the connection: {e}");
            None
        }
    }
}
