//! Wire types for the rating engine and account balance peers
//!
//! Both peers speak JSON-RPC 2.0; the payloads follow the Nchf rating
//! (TS 32.296) service usage and account debit messages.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{FinalUnitAction, SubscriptionId};

// ============================================================================
// JSON-RPC 2.0 Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<T> {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<T>,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

pub mod methods {
    pub const SERVICE_USAGE: &str = "RatingSv1.ServiceUsage";
    pub const ACCOUNT_DEBIT: &str = "AccountSv1.Debit";
    pub const RATING_PING: &str = "RatingSv1.Ping";
    pub const ACCOUNT_PING: &str = "AccountSv1.Ping";
}

// ============================================================================
// Rating Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestSubType {
    Reserve,
    Debit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUsageRequest {
    pub session_id: String,
    pub origin_host: String,
    pub origin_realm: String,
    pub actual_time: DateTime<Utc>,
    pub subscription_id: SubscriptionId,
    pub user_name: String,
    pub service_rating: ServiceRating,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRating {
    pub service_identifier: u32,
    pub request_sub_type: RequestSubType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monetary_quota: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_units: Option<u64>,
}

impl ServiceRating {
    /// Tariff lookup for a rating group
    pub fn tariff(rating_group: u32) -> Self {
        Self {
            service_identifier: rating_group,
            request_sub_type: RequestSubType::Reserve,
            monetary_quota: Some(0),
            consumed_units: None,
        }
    }

    pub fn reserve(rating_group: u32, monetary_quota: u64) -> Self {
        Self {
            service_identifier: rating_group,
            request_sub_type: RequestSubType::Reserve,
            monetary_quota: Some(monetary_quota),
            consumed_units: None,
        }
    }

    pub fn debit(rating_group: u32, consumed_units: u64) -> Self {
        Self {
            service_identifier: rating_group,
            request_sub_type: RequestSubType::Debit,
            monetary_quota: None,
            consumed_units: Some(consumed_units),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUsageResponse {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub service_rating: ServiceRatingResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRatingResult {
    #[serde(default)]
    pub service_identifier: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<UnitCost>,
    #[serde(default)]
    pub allowed_units: u64,
    #[serde(default)]
    pub price: u64,
}

/// Price of one unit as `value_digits × 10^exponent` currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitCost {
    pub value_digits: i64,
    #[serde(default)]
    pub exponent: i32,
}

impl UnitCost {
    /// Integer cost per unit. Fractional costs round up, so a positive
    /// mantissa never prices to zero. `None` on overflow or a negative cost.
    pub fn to_units(&self) -> Option<u64> {
        if self.value_digits < 0 {
            return None;
        }
        let digits = self.value_digits as u64;

        if self.exponent >= 0 {
            let scale = 10u64.checked_pow(u32::try_from(self.exponent).ok()?)?;
            return digits.checked_mul(scale);
        }

        let scale = u32::try_from(self.exponent.unsigned_abs()).ok()?;
        if scale > 28 {
            return Some(u64::from(digits > 0));
        }
        Decimal::new(self.value_digits, scale).ceil().to_u64()
    }
}

// ============================================================================
// Account Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CcRequestType {
    InitialRequest,
    UpdateRequest,
    TerminationRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestedAction {
    DirectDebiting,
    RefundAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDebitRequest {
    pub session_id: String,
    pub origin_host: String,
    pub origin_realm: String,
    pub event_timestamp: DateTime<Utc>,
    pub subscription_id: SubscriptionId,
    pub user_name: String,
    pub cc_request_number: u32,
    pub cc_request_type: CcRequestType,
    pub requested_action: RequestedAction,
    pub multiple_services_credit_control: CreditControlRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditControlRequest {
    pub rating_group: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_service_unit: Option<ServiceUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_service_unit: Option<ServiceUnit>,
}

impl CreditControlRequest {
    pub fn requested(rating_group: u32, octets: u64) -> Self {
        Self {
            rating_group,
            requested_service_unit: Some(ServiceUnit::octets(octets)),
            used_service_unit: None,
        }
    }

    pub fn used(rating_group: u32, octets: u64) -> Self {
        Self {
            rating_group,
            requested_service_unit: None,
            used_service_unit: Some(ServiceUnit::octets(octets)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUnit {
    #[serde(rename = "ccTotalOctets", default)]
    pub cc_total_octets: u64,
}

impl ServiceUnit {
    pub fn octets(cc_total_octets: u64) -> Self {
        Self { cc_total_octets }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDebitResponse {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub cc_request_number: u32,
    #[serde(default)]
    pub multiple_services_credit_control: CreditControlAnswer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditControlAnswer {
    #[serde(default)]
    pub rating_group: u32,
    #[serde(default)]
    pub granted_service_unit: ServiceUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_unit_indication: Option<PeerFinalUnitIndication>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerFinalUnitIndication {
    pub final_unit_action: FinalUnitAction,
}
