// src/services/processor.rs
//! Nchf converged charging operations
//!
//! Every operation resolves the subscriber's session, holds its lock for
//! the whole exchange (peer calls included) and persists the affected
//! records before answering. Record export is best effort.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use super::notifier::NotificationDispatcher;
use super::quota_engine::QuotaEngine;
use super::record_exporter::RecordExporter;
use super::record_manager::RecordManager;
use super::session_registry::{ChargingMode, SessionState};
use crate::context::ChfContext;
use crate::database::RecordStore;
use crate::error::ChargingError;
use crate::models::{
    ChargingDataRequest, ChargingDataResponse, ChargingNotifyRequest, ChfRecord,
    NotificationType, ReauthorizationDetails,
};
use crate::peers::{AccountClient, RatingClient};

pub struct ChargingProcessor {
    context: Arc<ChfContext>,
    engine: QuotaEngine,
    store: Arc<dyn RecordStore>,
    exporter: Arc<RecordExporter>,
    notifier: NotificationDispatcher,
}

impl ChargingProcessor {
    pub fn new(
        context: Arc<ChfContext>,
        rating: Arc<dyn RatingClient>,
        accounts: Arc<dyn AccountClient>,
        store: Arc<dyn RecordStore>,
        exporter: Arc<RecordExporter>,
    ) -> Self {
        let engine = QuotaEngine::new(rating, accounts, context.node_name());
        let notifier = NotificationDispatcher::new(context.config().charging.notify_timeout_ms);

        Self {
            context,
            engine,
            store,
            exporter,
            notifier,
        }
    }

    pub fn context(&self) -> &ChfContext {
        &self.context
    }

    /// Open a charging data resource. Returns the response and its location.
    #[instrument(skip(self, request), fields(subscriber = %request.subscriber_identifier))]
    pub async fn create(
        &self,
        request: ChargingDataRequest,
    ) -> Result<(ChargingDataResponse, String), ChargingError> {
        let supi = request.subscriber_identifier.as_str();
        let session = self.context.registry().find_or_create(supi)?;
        let mut state = session.lock().await;

        state.notify_uri = request.notify_uri.clone();

        let local_sequence = self.context.next_local_sequence();
        let charging_session_id = format!("{}{}{}", supi, request.consumer_name(), local_sequence);

        let mut record =
            RecordManager::open(&request, &mut state, &charging_session_id, local_sequence, false);
        RecordManager::update(&mut record, &request)?;

        if request.one_time_event {
            RecordManager::close(&mut record, false)?;
        }

        state
            .records
            .insert(charging_session_id.clone(), record.clone());

        self.store.persist(supi, std::slice::from_ref(&record)).await?;
        self.exporter.enqueue(supi, vec![record]);

        info!("✅ Charging data {} created for {}", charging_session_id, supi);

        let response = ChargingDataResponse {
            invocation_time_stamp: Utc::now(),
            invocation_sequence_number: request.invocation_sequence_number,
            multiple_unit_information: Vec::new(),
        };

        Ok((response, self.context.location(&charging_session_id)))
    }

    #[instrument(skip(self, request), fields(subscriber = %request.subscriber_identifier))]
    pub async fn update(
        &self,
        request: ChargingDataRequest,
        charging_session_id: &str,
    ) -> Result<ChargingDataResponse, ChargingError> {
        let supi = request.subscriber_identifier.as_str();
        let session = self
            .context
            .registry()
            .find(supi)
            .ok_or_else(|| ChargingError::SubscriberNotFound(supi.to_string()))?;
        let mut state = session.lock().await;

        ensure_open(&state, charging_session_id)?;

        let outcome = self
            .engine
            .process(session.subscription_id(), &mut state, &request)
            .await;

        let record = state
            .records
            .get_mut(charging_session_id)
            .ok_or_else(|| ChargingError::ChargingSessionNotFound(charging_session_id.to_string()))?;
        RecordManager::update(record, &request)?;

        let mut export: Vec<ChfRecord> = Vec::new();
        if outcome.partial_record {
            let open = record.clone();
            RecordManager::close(record, true)?;
            let closed = record.clone();

            // Keep the usage in the open record until the closed copy is stored
            if let Err(e) = self.store.persist(supi, std::slice::from_ref(&closed)).await {
                error!("❌ Partial record {} not stored: {}", charging_session_id, e);
                state.records.insert(charging_session_id.to_string(), open);
                return Err(e);
            }

            let local_sequence = self.context.next_local_sequence();
            RecordManager::open_successor(&request, &mut state, charging_session_id, local_sequence)?;
            export.push(closed);
        }

        let records: Vec<ChfRecord> = state.records.values().cloned().collect();
        self.store.persist(supi, &records).await?;
        export.extend(records);
        self.exporter.enqueue(supi, export);

        Ok(ChargingDataResponse {
            invocation_time_stamp: Utc::now(),
            invocation_sequence_number: request.invocation_sequence_number,
            multiple_unit_information: outcome.unit_information,
        })
    }

    #[instrument(skip(self, request), fields(subscriber = %request.subscriber_identifier))]
    pub async fn release(
        &self,
        request: ChargingDataRequest,
        charging_session_id: &str,
    ) -> Result<(), ChargingError> {
        let supi = request.subscriber_identifier.as_str();
        let session = self
            .context
            .registry()
            .find(supi)
            .ok_or_else(|| ChargingError::SubscriberNotFound(supi.to_string()))?;
        let mut state = session.lock().await;

        ensure_open(&state, charging_session_id)?;

        // Final usage is settled; the unit information has no receiver
        self.engine
            .process(session.subscription_id(), &mut state, &request)
            .await;

        let record = state
            .records
            .get_mut(charging_session_id)
            .ok_or_else(|| ChargingError::ChargingSessionNotFound(charging_session_id.to_string()))?;
        RecordManager::update(record, &request)?;
        RecordManager::close(record, false)?;
        let closed = record.clone();

        self.store.persist(supi, std::slice::from_ref(&closed)).await?;
        self.exporter.enqueue(supi, vec![closed]);

        info!("🏁 Charging data {} released for {}", charging_session_id, supi);
        Ok(())
    }

    /// Balance recharged for a rating group: back to reserve mode and ask
    /// the consumer to reauthorize
    #[instrument(skip(self))]
    pub async fn notify_recharge(&self, ue_id: &str, rating_group: u32) -> Result<(), ChargingError> {
        let session = self
            .context
            .registry()
            .find(ue_id)
            .ok_or_else(|| ChargingError::SubscriberNotFound(ue_id.to_string()))?;

        let notify_uri = {
            let mut state = session.lock().await;
            state.rating_group(rating_group).mode = ChargingMode::Reserve;
            state.notify_uri.clone()
        };

        match notify_uri.filter(|uri| !uri.is_empty()) {
            Some(uri) => {
                let request = ChargingNotifyRequest {
                    notification_type: NotificationType::Reauthorization,
                    reauthorization_details: vec![ReauthorizationDetails {
                        rating_group,
                        service_id: None,
                    }],
                };
                self.notifier.notify(&uri, request);
            }
            None => warn!(
                "No notify URI for {}, recharge of rating group {} not signalled",
                session.supi(),
                rating_group
            ),
        }

        Ok(())
    }

    /// Stored records of a subscriber
    pub async fn records(&self, supi: &str) -> Result<Vec<ChfRecord>, ChargingError> {
        self.store.records(supi).await
    }
}

fn ensure_open(state: &SessionState, charging_session_id: &str) -> Result<(), ChargingError> {
    match state.records.get(charging_session_id) {
        None => Err(ChargingError::ChargingSessionNotFound(charging_session_id.to_string())),
        Some(record) if !record.is_open() => {
            Err(ChargingError::RecordClosed(charging_session_id.to_string()))
        }
        Some(_) => Ok(()),
    }
}
