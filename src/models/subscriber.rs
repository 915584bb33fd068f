// src/models/subscriber.rs
use serde::{Deserialize, Serialize};

use crate::error::ChargingError;

/// Subscription-Id-Type values carried to the rating and account peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionIdType {
    EndUserE164,
    EndUserImsi,
    EndUserSipUri,
    EndUserNai,
    EndUserPrivate,
}

/// Subscriber identity as sent on the peer interfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionId {
    pub subscription_id_type: SubscriptionIdType,
    pub subscription_id_data: String,
}

impl SubscriptionId {
    /// Parse a SUPI/GPSI style identifier (`imsi-`, `nai-`, `gci-`, `gli-`).
    pub fn parse(supi: &str) -> Result<Self, ChargingError> {
        let (scheme, _) = supi
            .split_once('-')
            .ok_or_else(|| ChargingError::MalformedSubscriber(supi.to_string()))?;

        let (id_type, data) = match scheme {
            "imsi" => {
                let digits = &supi[5..];
                let valid = (5..=15).contains(&digits.len())
                    && digits.bytes().all(|b| b.is_ascii_digit());
                if !valid {
                    return Err(ChargingError::MalformedSubscriber(supi.to_string()));
                }
                (SubscriptionIdType::EndUserImsi, digits)
            }
            "nai" | "gci" | "gli" => (SubscriptionIdType::EndUserNai, &supi[4..]),
            _ => return Err(ChargingError::MalformedSubscriber(supi.to_string())),
        };

        if data.is_empty() {
            return Err(ChargingError::MalformedSubscriber(supi.to_string()));
        }

        Ok(Self {
            subscription_id_type: id_type,
            subscription_id_data: data.to_string(),
        })
    }
}
