use std::env;
use std::time::Duration;

use anyhow::Result;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::Database;

/// Create a database handle for tests. Points at the postgres named by
/// TEST_DATABASE_URL when set; otherwise builds a pool around an unreachable
/// host with a 1ms connect timeout, for tests that wire up the application
/// without touching storage.
pub async fn create_mock_database() -> Result<Database> {
    let pg_config = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url.parse::<tokio_postgres::Config>()?,
        Err(_) => {
            let mut cfg = tokio_postgres::Config::new();
            cfg.host("mock-host-that-doesnt-exist")
                .port(5432)
                .dbname("mock_db")
                .user("mock_user")
                .password("mock_pass")
                .connect_timeout(Duration::from_millis(1));
            cfg
        }
    };

    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    let pool = Pool::builder(manager).max_size(4).build()?;

    Ok(Database::new(pool))
}
