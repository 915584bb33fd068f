// src/services/record_exporter.rs
//! Background forwarding of CHF records to the billing gateway (CGF)
//!
//! Charging operations enqueue batches with `try_send` and never wait on
//! the gateway. A single worker drains the bounded queue; `shutdown` closes
//! the queue and waits for the worker to flush what is left.

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::models::ChfRecord;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBatch {
    pub subscriber: String,
    pub records: Vec<ChfRecord>,
}

pub struct RecordExporter {
    sender: Mutex<Option<Sender<ExportBatch>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RecordExporter {
    /// Start the export worker. With no gateway configured the exporter
    /// accepts and discards batches.
    pub fn start(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let Some(url) = config.url.as_deref() else {
            info!("⚠️  No billing gateway configured, record export disabled");
            return Ok(Self::disabled());
        };

        let http_client = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let endpoint = format!("{}/records", url.trim_end_matches('/'));
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));

        info!("✅ Record export to {} (queue {})", endpoint, config.queue_size);

        let worker = tokio::spawn(Self::run(http_client, endpoint, receiver));

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn disabled() -> Self {
        Self {
            sender: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Queue records for export; drops the batch when the queue is full
    pub fn enqueue(&self, subscriber: &str, records: Vec<ChfRecord>) {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return;
        };

        let batch = ExportBatch {
            subscriber: subscriber.to_string(),
            records,
        };

        match sender.try_send(batch) {
            Ok(()) => debug!("Queued record export for {}", subscriber),
            Err(TrySendError::Full(batch)) => warn!(
                "⚠️  Export queue full, dropping {} records for {}",
                batch.records.len(),
                batch.subscriber
            ),
            Err(TrySendError::Closed(_)) => warn!("Export queue closed, dropping records for {}", subscriber),
        }
    }

    /// Close the queue and wait until every queued batch was sent
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!("Record export worker failed: {}", e);
            }
            info!("🛑 Record export drained");
        }
    }

    async fn run(http_client: Client, endpoint: String, mut receiver: Receiver<ExportBatch>) {
        while let Some(batch) = receiver.recv().await {
            match http_client.post(&endpoint).json(&batch).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Exported {} records for {}", batch.records.len(), batch.subscriber);
                }
                Ok(response) => {
                    error!(
                        "❌ Billing gateway rejected records for {}: status {}",
                        batch.subscriber,
                        response.status()
                    );
                }
                Err(e) => {
                    error!("❌ Billing gateway fail to receive records for {}: {}", batch.subscriber, e);
                }
            }
        }
    }
}
