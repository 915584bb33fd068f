// src/database/pool.rs
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::info;

use crate::error::ChargingError;

pub type DbPool = Pool;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chf_records (
    record_id UUID PRIMARY KEY,
    subscriber TEXT NOT NULL,
    charging_session_id TEXT NOT NULL,
    record_sequence_number BIGINT NOT NULL,
    status TEXT NOT NULL,
    body JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS chf_records_subscriber_idx
    ON chf_records (subscriber, record_sequence_number);
";

pub async fn create_pool(database_url: &str, max_size: usize) -> Result<Pool, ChargingError> {
    let url = database_url
        .replace("postgresql+asyncpg://", "postgresql://")
        .replace("postgres+asyncpg://", "postgresql://");

    let mut cfg = Config::new();
    cfg.url = Some(url);
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(max_size));

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| ChargingError::Config(format!("database pool: {}", e)))?;

    let client = pool.get().await?;
    let row = client.query_one("SELECT 1 as test", &[]).await?;
    let test: i32 = row.get(0);

    if test == 1 {
        info!("Database connection test successful");
    }

    client.batch_execute(SCHEMA).await?;

    Ok(pool)
}
