//! Storage layer for PostgreSQL.

pub mod alerts;
pub mod clusters;
pub mod markets;
pub mod positions;
pub mod state;
pub mod trades;
pub mod wallets;

use crate::config::DatabaseConfig;
use crate::metrics;
use crate::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

pub use alerts::AlertRepo;
pub use clusters::ClusterRepo;
pub use markets::MarketRepo;
pub use positions::NetPositionRepo;
pub use state::AppStateRepo;
pub use trades::TradeRepo;
pub use wallets::WalletRepo;

/// Directory scanned by the sqlx migrator at startup.
const MIGRATIONS_DIR: &str = "./migrations";

/// Connect to Postgres, retrying with exponential backoff. The service
/// usually races its database at startup, so transient refusals are
/// expected; only exhausting the retry budget is fatal.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let total_attempts = config.max_retries + 1;
    let mut attempt = 1u32;

    loop {
        match connect_once(config).await {
            Ok(pool) => {
                if attempt > 1 {
                    info!(attempt, "Connected to Postgres after retrying");
                }
                return Ok(pool);
            }
            Err(e) if attempt < total_attempts => {
                let backoff = backoff_delay(config, attempt);
                warn!(
                    attempt,
                    total_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Postgres connection failed, backing off before retry"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                error!(attempts = total_attempts, error = %e, "Postgres unreachable, giving up");
                return Err(e.into());
            }
        }
    }
}

async fn connect_once(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    let mut opts = PgPoolOptions::new().max_connections(config.max_connections);
    if let Some(secs) = config.acquire_timeout_secs {
        opts = opts.acquire_timeout(Duration::from_secs(secs));
    }
    opts.connect(&config.url).await
}

/// Delay before the next attempt: doubles from the base delay, saturating
/// at the configured ceiling.
fn backoff_delay(config: &DatabaseConfig, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    let ms = config
        .retry_base_delay_ms
        .saturating_mul(1u64 << shift)
        .min(config.retry_max_delay_ms);
    Duration::from_millis(ms)
}

/// Apply pending migrations from the workspace migrations directory.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrator = sqlx::migrate::Migrator::new(Path::new(MIGRATIONS_DIR)).await?;
    migrator.run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}

/// All repositories over one shared pool.
#[derive(Clone)]
pub struct Store {
    pub state: AppStateRepo,
    pub trades: TradeRepo,
    pub wallets: WalletRepo,
    pub markets: MarketRepo,
    pub alerts: AlertRepo,
    pub positions: NetPositionRepo,
    pub clusters: ClusterRepo,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self {
            state: AppStateRepo::new(pool.clone()),
            trades: TradeRepo::new(pool.clone()),
            wallets: WalletRepo::new(pool.clone()),
            markets: MarketRepo::new(pool.clone()),
            alerts: AlertRepo::new(pool.clone()),
            positions: NetPositionRepo::new(pool.clone()),
            clusters: ClusterRepo::new(pool),
        }
    }
}

/// Record the query metric and convert the sqlx error in one place.
pub(crate) fn track<T>(operation: &str, result: std::result::Result<T, sqlx::Error>) -> Result<T> {
    metrics::record_db_query(operation, result.is_ok());
    result.map_err(Into::into)
}
