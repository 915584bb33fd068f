// src/models/mod.rs
pub mod charging;
pub mod record;
pub mod subscriber;

pub use charging::{
    ChargingDataRequest, ChargingDataResponse, ChargingNotifyRequest, FinalUnitAction,
    FinalUnitIndication, GrantedUnit, MultipleUnitInformation, MultipleUnitUsage,
    NfIdentification, NotificationType, ProblemDetails, QuotaManagementIndicator,
    ReauthorizationDetails, RequestedUnit, Trigger, TriggerCategory, TriggerType,
    UsedUnitContainer,
};
pub use record::{CauseForRecordClosing, ChfRecord, RatingGroupUsage, RecordStatus};
pub use subscriber::{SubscriptionId, SubscriptionIdType};

use serde::Serialize;

// ==================== API DTOs ====================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub active_sessions: usize,
}
