// src/services/record_manager.rs
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::session_registry::SessionState;
use crate::error::ChargingError;
use crate::models::{CauseForRecordClosing, ChargingDataRequest, ChfRecord, RecordStatus};

/// Opens, updates and closes the CHF records of a session
pub struct RecordManager;

impl RecordManager {
    /// Open a record for `charging_session_id` with the session's next
    /// sequence number. `partial` marks a record continuing a partial one.
    pub fn open(
        request: &ChargingDataRequest,
        state: &mut SessionState,
        charging_session_id: &str,
        local_sequence: u64,
        partial: bool,
    ) -> ChfRecord {
        let now = Utc::now();
        let record = ChfRecord {
            record_id: Uuid::new_v4(),
            charging_session_id: charging_session_id.to_string(),
            subscriber_identifier: request.subscriber_identifier.clone(),
            nf_consumer: request.consumer_name().to_string(),
            record_sequence_number: state.next_record_sequence(),
            local_record_sequence_number: local_sequence,
            opening_time: now,
            last_update_time: now,
            closing_time: None,
            duration: 0,
            cause_for_record_closing: None,
            one_time_event: request.one_time_event,
            continuation: partial,
            status: RecordStatus::Open,
            usage: Default::default(),
        };

        info!(
            "📝 Opened record {} for {} (sequence {})",
            record.charging_session_id, record.subscriber_identifier, record.record_sequence_number
        );

        record
    }

    /// Fold every used unit container of the request into the record
    pub fn update(record: &mut ChfRecord, request: &ChargingDataRequest) -> Result<(), ChargingError> {
        if !record.is_open() {
            return Err(ChargingError::RecordClosed(record.charging_session_id.clone()));
        }

        for usage in &request.multiple_unit_usage {
            let entry = record.usage.entry(usage.rating_group).or_default();
            if usage.upf_id.is_some() {
                entry.upf_id = usage.upf_id.clone();
            }
            for container in &usage.used_unit_container {
                entry.apply(container);
            }
        }
        record.last_update_time = Utc::now();

        debug!(
            "Updated record {}: total_volume={}",
            record.charging_session_id,
            record.total_volume()
        );

        Ok(())
    }

    pub fn close(record: &mut ChfRecord, partial: bool) -> Result<(), ChargingError> {
        if !record.is_open() {
            return Err(ChargingError::RecordClosed(record.charging_session_id.clone()));
        }

        let now = Utc::now();
        record.closing_time = Some(now);
        record.duration = (now - record.opening_time).num_seconds();
        record.cause_for_record_closing = Some(if partial {
            CauseForRecordClosing::PartialRecord
        } else {
            CauseForRecordClosing::NormalRelease
        });
        record.status = RecordStatus::Closed;

        info!(
            "🔒 Closed record {} (sequence {}, cause {:?})",
            record.charging_session_id,
            record.record_sequence_number,
            record.cause_for_record_closing
        );

        Ok(())
    }

    /// Open the successor of a record closed as partial, under the same id.
    /// The closed record must already be stored; it is replaced in the session.
    pub fn open_successor(
        request: &ChargingDataRequest,
        state: &mut SessionState,
        charging_session_id: &str,
        local_sequence: u64,
    ) -> Result<(), ChargingError> {
        match state.records.get(charging_session_id) {
            None => {
                return Err(ChargingError::ChargingSessionNotFound(
                    charging_session_id.to_string(),
                ))
            }
            Some(record)
                if record.cause_for_record_closing != Some(CauseForRecordClosing::PartialRecord) =>
            {
                return Err(ChargingError::Internal(format!(
                    "record {} was not closed as partial",
                    charging_session_id
                )))
            }
            Some(_) => {}
        }

        let next = Self::open(request, state, charging_session_id, local_sequence, true);
        state.records.insert(charging_session_id.to_string(), next);

        Ok(())
    }
}
