// src/models/record.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::charging::UsedUnitContainer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CauseForRecordClosing {
    NormalRelease,
    PartialRecord,
}

/// Usage accumulated for one rating group inside a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingGroupUsage {
    pub total_volume: u64,
    pub uplink_volume: u64,
    pub downlink_volume: u64,
    pub time: u64,
    #[serde(rename = "uPFID", default, skip_serializing_if = "Option::is_none")]
    pub upf_id: Option<String>,
    pub containers: u32,
}

impl RatingGroupUsage {
    pub fn apply(&mut self, container: &UsedUnitContainer) {
        self.total_volume = self
            .total_volume
            .saturating_add(container.total_volume.unwrap_or(0));
        self.uplink_volume = self
            .uplink_volume
            .saturating_add(container.uplink_volume.unwrap_or(0));
        self.downlink_volume = self
            .downlink_volume
            .saturating_add(container.downlink_volume.unwrap_or(0));
        self.time = self.time.saturating_add(u64::from(container.time.unwrap_or(0)));
        self.containers = self.containers.saturating_add(1);
    }
}

/// CHF record: the billing record of one charging session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChfRecord {
    pub record_id: Uuid,
    pub charging_session_id: String,
    pub subscriber_identifier: String,
    pub nf_consumer: String,
    pub record_sequence_number: u64,
    pub local_record_sequence_number: u64,
    pub opening_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_time: Option<DateTime<Utc>>,
    /// Seconds between opening and closing
    #[serde(default)]
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_for_record_closing: Option<CauseForRecordClosing>,
    #[serde(default)]
    pub one_time_event: bool,
    /// Opened to continue a record closed as partial
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub continuation: bool,
    pub status: RecordStatus,
    #[serde(default)]
    pub usage: BTreeMap<u32, RatingGroupUsage>,
}

impl ChfRecord {
    pub fn is_open(&self) -> bool {
        self.status == RecordStatus::Open
    }

    pub fn total_volume(&self) -> u64 {
        self.usage
            .values()
            .fold(0u64, |acc, u| acc.saturating_add(u.total_volume))
    }
}
