// src/database/record_store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::pool::DbPool;
use crate::error::ChargingError;
use crate::models::{ChfRecord, RecordStatus};

/// Durable storage of CHF records, keyed by subscriber
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace each record by record id
    async fn persist(&self, subscriber: &str, records: &[ChfRecord]) -> Result<(), ChargingError>;

    /// All records of a subscriber in sequence order
    async fn records(&self, subscriber: &str) -> Result<Vec<ChfRecord>, ChargingError>;
}

pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn status_label(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Open => "OPEN",
        RecordStatus::Closed => "CLOSED",
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn persist(&self, subscriber: &str, records: &[ChfRecord]) -> Result<(), ChargingError> {
        let mut client = self.pool.get().await.map_err(|e| {
            error!("❌ Failed to get DB connection: {}", e);
            ChargingError::from(e)
        })?;

        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                "INSERT INTO chf_records
                    (record_id, subscriber, charging_session_id, record_sequence_number, status, body, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, NOW())
                 ON CONFLICT (record_id) DO UPDATE
                 SET status = EXCLUDED.status, body = EXCLUDED.body, updated_at = NOW()",
            )
            .await?;

        for record in records {
            let body = serde_json::to_value(record)?;
            let sequence = i64::try_from(record.record_sequence_number)
                .map_err(|_| ChargingError::Persistence("record sequence out of range".to_string()))?;
            tx.execute(
                &stmt,
                &[
                    &record.record_id,
                    &subscriber,
                    &record.charging_session_id,
                    &sequence,
                    &status_label(record.status),
                    &body,
                ],
            )
            .await?;
        }

        tx.commit().await?;
        debug!("Persisted {} records for {}", records.len(), subscriber);
        Ok(())
    }

    async fn records(&self, subscriber: &str) -> Result<Vec<ChfRecord>, ChargingError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT body FROM chf_records
                 WHERE subscriber = $1
                 ORDER BY record_sequence_number ASC",
                &[&subscriber],
            )
            .await?;

        rows.into_iter()
            .map(|row| -> Result<ChfRecord, ChargingError> {
                let body: serde_json::Value = row.try_get(0)?;
                Ok(serde_json::from_value(body)?)
            })
            .collect()
    }
}

/// Process-local record store, used when no database is configured
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, Vec<ChfRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn persist(&self, subscriber: &str, records: &[ChfRecord]) -> Result<(), ChargingError> {
        let mut store = self.records.write().await;
        let stored = store.entry(subscriber.to_string()).or_default();

        for record in records {
            match stored.iter_mut().find(|r| r.record_id == record.record_id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        stored.sort_by_key(|r| r.record_sequence_number);

        Ok(())
    }

    async fn records(&self, subscriber: &str) -> Result<Vec<ChfRecord>, ChargingError> {
        Ok(self
            .records
            .read()
            .await
            .get(subscriber)
            .cloned()
            .unwrap_or_default())
    }
}
