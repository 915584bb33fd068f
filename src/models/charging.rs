// src/models/charging.rs
//! Nchf_ConvergedCharging data types (TS 32.291), limited to the fields the
//! charging function reads or writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingDataRequest {
    pub subscriber_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nf_consumer_identification: Option<NfIdentification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_time_stamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invocation_sequence_number: u32,
    #[serde(default)]
    pub one_time_event: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multiple_unit_usage: Vec<MultipleUnitUsage>,
}

impl ChargingDataRequest {
    /// Name of the NF consumer, empty when the consumer did not identify itself
    pub fn consumer_name(&self) -> &str {
        self.nf_consumer_identification
            .as_ref()
            .and_then(|nf| nf.nf_name.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfIdentification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nf_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nf_i_pv4_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_functionality: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleUnitUsage {
    pub rating_group: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_unit: Option<RequestedUnit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_unit_container: Vec<UsedUnitContainer>,
    #[serde(rename = "uPFID", default, skip_serializing_if = "Option::is_none")]
    pub upf_id: Option<String>,
}

impl MultipleUnitUsage {
    /// Requested total volume, zero when nothing was requested
    pub fn requested_volume(&self) -> u64 {
        self.requested_unit
            .as_ref()
            .and_then(|unit| unit.total_volume)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_volume: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedUnitContainer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_management_indicator: Option<QuotaManagementIndicator>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_sequence_number: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotaManagementIndicator {
    OnlineCharging,
    OfflineCharging,
    QuotaManagementSuspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub trigger_type: TriggerType,
    pub trigger_category: TriggerCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_limit: Option<u32>,
    #[serde(rename = "maxNumberOfccc", default, skip_serializing_if = "Option::is_none")]
    pub max_number_of_ccc: Option<u32>,
}

impl Trigger {
    pub fn new(trigger_type: TriggerType, trigger_category: TriggerCategory) -> Self {
        Self {
            trigger_type,
            trigger_category,
            time_limit: None,
            volume_limit: None,
            max_number_of_ccc: None,
        }
    }

    pub fn immediate(trigger_type: TriggerType) -> Self {
        Self::new(trigger_type, TriggerCategory::ImmediateReport)
    }

    pub fn with_volume_limit(mut self, volume_limit: u32) -> Self {
        self.volume_limit = Some(volume_limit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    QuotaThreshold,
    Qht,
    Final,
    QuotaExhausted,
    ValidityTime,
    OtherQuotaType,
    ForcedReauthorisation,
    UnusedQuotaTimer,
    UnitCountInactivityTimer,
    AbnormalRelease,
    QosChange,
    VolumeLimit,
    TimeLimit,
    EventLimit,
    PlmnChange,
    UserLocationChange,
    RatChange,
    SessionAmbrChange,
    UeTimezoneChange,
    TariffTimeChange,
    MaxNumberOfChangesInChargingConditions,
    ManagementIntervention,
    ChangeOfUePresenceInPresenceReportingArea,
    #[serde(rename = "CHANGE_OF_3GPP_PS_DATA_OFF_STATUS")]
    ChangeOf3gppPsDataOffStatus,
    ServingNodeChange,
    RemovalOfUpf,
    AdditionOfUpf,
    StartOfServiceDataFlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerCategory {
    ImmediateReport,
    DeferredReport,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingDataResponse {
    pub invocation_time_stamp: DateTime<Utc>,
    pub invocation_sequence_number: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multiple_unit_information: Vec<MultipleUnitInformation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleUnitInformation {
    pub rating_group: u32,
    #[serde(rename = "uPFID", default, skip_serializing_if = "Option::is_none")]
    pub upf_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granted_unit: Option<GrantedUnit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_quota_threshold: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_unit_indication: Option<FinalUnitIndication>,
}

impl MultipleUnitInformation {
    pub fn new(rating_group: u32, upf_id: Option<String>) -> Self {
        Self {
            rating_group,
            upf_id,
            ..Default::default()
        }
    }

    pub fn has_trigger(&self, trigger_type: TriggerType, category: TriggerCategory) -> bool {
        self.triggers
            .iter()
            .any(|t| t.trigger_type == trigger_type && t.trigger_category == category)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantedUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_volume: Option<u64>,
}

impl GrantedUnit {
    /// Same volume granted in total, uplink and downlink
    pub fn volume(units: u64) -> Self {
        Self {
            total_volume: Some(units),
            uplink_volume: Some(units),
            downlink_volume: Some(units),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalUnitIndication {
    pub final_unit_action: FinalUnitAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalUnitAction {
    Terminate,
    Redirect,
    RestrictAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingNotifyRequest {
    pub notification_type: NotificationType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reauthorization_details: Vec<ReauthorizationDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Reauthorization,
    AbortCharging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReauthorizationDetails {
    pub rating_group: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<u32>,
}

/// Problem descriptor returned on failed operations (TS 29.571)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}
