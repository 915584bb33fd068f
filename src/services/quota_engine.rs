// src/services/quota_engine.rs
//! Quota reservation engine
//!
//! Decides, per rating group, whether usage is charged against a quota
//! reserved at the account peer (reserve mode) or settled directly against
//! the final price (debit mode). Runs under the session lock; peer failures
//! abandon the affected rating group only.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::session_registry::{ChargingMode, QuotaPolicy, SessionState};
use crate::models::{
    ChargingDataRequest, FinalUnitAction, FinalUnitIndication, GrantedUnit,
    MultipleUnitInformation, MultipleUnitUsage, QuotaManagementIndicator, SubscriptionId, Trigger,
    TriggerCategory, TriggerType,
};
use crate::peers::{
    AccountClient, AccountDebitRequest, CcRequestType, CreditControlRequest, PeerError,
    RatingClient, RequestedAction, ServiceRating, ServiceUsageRequest,
};

#[derive(Debug, Default)]
pub struct QuotaOutcome {
    pub unit_information: Vec<MultipleUnitInformation>,
    /// The consumer reported a change of charging condition that closes
    /// the current record
    pub partial_record: bool,
}

#[derive(Debug, Error)]
enum GroupError {
    #[error("peer failure: {0}")]
    Peer(#[from] PeerError),

    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),
}

/// Result of the usage deduction step of a reserve cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveCycle {
    /// Reserved quota after deducting the priced usage
    pub reserved: i64,
    /// Requested volume priced at the unit cost
    pub requested_quota: u64,
    /// Amount to reserve at the account peer, when the quota ran out
    pub refill: Option<u64>,
}

/// Deduct priced usage from the reservation and work out the refill.
/// `None` when any step overflows.
pub fn reserve_cycle(
    reserved: i64,
    consumed: u64,
    requested: u64,
    unit_cost: u64,
) -> Option<ReserveCycle> {
    let used = i64::try_from(consumed.checked_mul(unit_cost)?).ok()?;
    let requested_quota = requested.checked_mul(unit_cost)?;
    let reserved = reserved.checked_sub(used)?;

    let refill = if reserved <= 0 {
        Some(reserved.unsigned_abs().checked_add(requested_quota)?)
    } else {
        None
    };

    Some(ReserveCycle {
        reserved,
        requested_quota,
        refill,
    })
}

/// Settlement of a debit-mode rating group against its reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Price below the reservation, return the difference
    Refund(u64),
    /// Price at or above the reservation, charge the difference
    Extra(u64),
}

pub fn settle(reserved: i64, price: u64) -> Option<Settlement> {
    let price = i64::try_from(price).ok()?;
    if price < reserved {
        Some(Settlement::Refund(u64::try_from(reserved - price).ok()?))
    } else {
        Some(Settlement::Extra(u64::try_from(price.checked_sub(reserved)?).ok()?))
    }
}

/// ⌊granted × rate⌋
pub fn volume_threshold(granted: u64, rate: Decimal) -> Option<u64> {
    Decimal::from(granted).checked_mul(rate)?.floor().to_u64()
}

/// Peer correlation data for one rating group exchange
struct Exchange<'a> {
    subscription_id: &'a SubscriptionId,
    rate_session_id: String,
    acct_session_id: String,
    request_number: u32,
}

pub struct QuotaEngine {
    rating: Arc<dyn RatingClient>,
    accounts: Arc<dyn AccountClient>,
    user_name: String,
}

impl QuotaEngine {
    pub fn new(
        rating: Arc<dyn RatingClient>,
        accounts: Arc<dyn AccountClient>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            rating,
            accounts,
            user_name: user_name.into(),
        }
    }

    /// Run credit control for every rating group of the request
    #[instrument(skip_all, fields(subscriber = %request.subscriber_identifier))]
    pub async fn process(
        &self,
        subscription_id: &SubscriptionId,
        state: &mut SessionState,
        request: &ChargingDataRequest,
    ) -> QuotaOutcome {
        let mut outcome = QuotaOutcome::default();
        let mut saw_final = false;
        let mut saw_partial_trigger = false;
        let policy = state.policy.clone();

        for (index, usage) in request.multiple_unit_usage.iter().enumerate() {
            let rg = usage.rating_group;
            let mut info = MultipleUnitInformation::new(rg, usage.upf_id.clone());
            let mut online = false;
            let mut consumed: Option<u64> = Some(0);

            for container in &usage.used_unit_container {
                match container.quota_management_indicator {
                    Some(QuotaManagementIndicator::OfflineCharging) => {
                        info.triggers
                            .push(Trigger::immediate(TriggerType::QuotaThreshold));
                        info.volume_quota_threshold = Some(policy.offline_volume_threshold);
                    }
                    Some(QuotaManagementIndicator::OnlineCharging) => {
                        online = true;
                        consumed = consumed
                            .and_then(|c| c.checked_add(container.total_volume.unwrap_or(0)));
                    }
                    Some(QuotaManagementIndicator::QuotaManagementSuspended) => {
                        warn!("Quota management suspended is not supported, rating group {}", rg);
                    }
                    None => {
                        debug!("Used unit container without quota management indicator, rating group {}", rg);
                    }
                }
            }

            if !online {
                info!("Credit control not required for rating group {}", rg);
                if !info.triggers.is_empty() {
                    outcome.unit_information.push(info);
                }
                continue;
            }

            for trigger in &request.triggers {
                match (trigger.trigger_type, trigger.trigger_category) {
                    (TriggerType::Final, _) => {
                        state.rating_group(rg).mode = ChargingMode::Debit;
                        saw_final = true;
                    }
                    (TriggerType::VolumeLimit, TriggerCategory::ImmediateReport)
                    | (TriggerType::MaxNumberOfChangesInChargingConditions, _)
                    | (TriggerType::ManagementIntervention, _) => {}
                    _ => saw_partial_trigger = true,
                }
            }

            let exchange = Exchange {
                subscription_id,
                rate_session_id: state.rate_session_id.to_string(),
                acct_session_id: state.acct_session_id.to_string(),
                request_number: state.rating_group(rg).request_number,
            };

            let mode = state.rating_group(rg).mode;
            let result = match consumed {
                None => Err(GroupError::Overflow("consumed volume")),
                Some(consumed) => match mode {
                    ChargingMode::Reserve => {
                        // The PDU session limit rides on the first entry only
                        let add_pdu_limit = index == 0 && policy.volume_limit_pdu != 0;
                        self.reserve(state, &policy, &exchange, usage, consumed, info, add_pdu_limit)
                            .await
                    }
                    ChargingMode::Debit => self.debit(state, &exchange, consumed, info).await,
                },
            };

            let group = state.rating_group(rg);
            group.request_number = group.request_number.wrapping_add(1);

            match result {
                Ok(info) => outcome.unit_information.push(info),
                Err(e) => error!("❌ Rating group {} abandoned: {}", rg, e),
            }
        }

        outcome.partial_record = saw_partial_trigger && !saw_final;
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    async fn reserve(
        &self,
        state: &mut SessionState,
        policy: &QuotaPolicy,
        exchange: &Exchange<'_>,
        usage: &MultipleUnitUsage,
        consumed: u64,
        mut info: MultipleUnitInformation,
        add_pdu_limit: bool,
    ) -> Result<MultipleUnitInformation, GroupError> {
        let rg = usage.rating_group;
        let requested = usage.requested_volume();

        let unit_cost = self.unit_cost(exchange, rg).await?;
        state.rating_group(rg).unit_cost = unit_cost;

        let group = state.rating_group(rg);
        let cycle = reserve_cycle(group.reserved_quota, consumed, requested, unit_cost)
            .ok_or(GroupError::Overflow("reserve cycle"))?;
        group.reserved_quota = cycle.reserved;

        if let Some(refill) = cycle.refill {
            debug!(
                "Reserving quota: rating_group={}, refill={}, reserved={}",
                rg, refill, cycle.reserved
            );

            let answer = self
                .accounts
                .account_debit(self.debit_request(
                    exchange,
                    CcRequestType::UpdateRequest,
                    RequestedAction::DirectDebiting,
                    CreditControlRequest::requested(rg, refill),
                ))
                .await?
                .multiple_services_credit_control;

            let granted = i64::try_from(answer.granted_service_unit.cc_total_octets)
                .map_err(|_| GroupError::Overflow("granted quota"))?;
            let group = state.rating_group(rg);
            group.reserved_quota = group
                .reserved_quota
                .checked_add(granted)
                .ok_or(GroupError::Overflow("reserved quota"))?;

            if let Some(fui) = answer.final_unit_indication {
                if fui.final_unit_action == FinalUnitAction::Terminate {
                    info!("💳 Last granted quota for rating group {}", rg);
                    group.mode = ChargingMode::Debit;
                    info.final_unit_indication = Some(FinalUnitIndication {
                        final_unit_action: FinalUnitAction::Terminate,
                    });
                }
            }
        }

        let reply = self
            .rating
            .service_usage(
                self.usage_request(exchange, ServiceRating::reserve(rg, cycle.requested_quota)),
            )
            .await?;

        if let Some(cost) = reply.service_rating.unit_cost.and_then(|c| c.to_units()) {
            state.rating_group(rg).unit_cost = cost;
        }

        let granted = reply.service_rating.allowed_units.min(requested);

        if state.rating_group(rg).mode == ChargingMode::Reserve {
            let threshold = volume_threshold(granted, policy.volume_threshold_rate)
                .ok_or(GroupError::Overflow("volume quota threshold"))?;
            info.triggers
                .push(Trigger::immediate(TriggerType::QuotaThreshold));
            info.volume_quota_threshold = Some(threshold);
        }

        info.triggers
            .push(Trigger::immediate(TriggerType::QuotaExhausted));

        if policy.volume_limit != 0 {
            info.triggers.push(
                Trigger::new(TriggerType::VolumeLimit, TriggerCategory::DeferredReport)
                    .with_volume_limit(policy.volume_limit),
            );
        }

        if add_pdu_limit {
            info.triggers.push(
                Trigger::immediate(TriggerType::VolumeLimit)
                    .with_volume_limit(policy.volume_limit_pdu),
            );
        }

        if policy.quota_validity_time != 0 {
            info.triggers
                .push(Trigger::immediate(TriggerType::ValidityTime));
            info.validity_time = Some(policy.quota_validity_time);
        }

        info.granted_unit = Some(GrantedUnit::volume(granted));

        info!(
            "📊 Granted {} units for rating group {} (reserved={})",
            granted,
            rg,
            state.rating_group(rg).reserved_quota
        );

        Ok(info)
    }

    async fn debit(
        &self,
        state: &mut SessionState,
        exchange: &Exchange<'_>,
        consumed: u64,
        mut info: MultipleUnitInformation,
    ) -> Result<MultipleUnitInformation, GroupError> {
        let rg = info.rating_group;

        let reply = self
            .rating
            .service_usage(self.usage_request(exchange, ServiceRating::debit(rg, consumed)))
            .await?;
        let price = reply.service_rating.price;
        let reserved = state.rating_group(rg).reserved_quota;

        debug!("Settling rating group {}: price={}, reserved={}", rg, price, reserved);

        match settle(reserved, price).ok_or(GroupError::Overflow("settlement"))? {
            Settlement::Refund(amount) => {
                self.accounts
                    .account_debit(self.debit_request(
                        exchange,
                        CcRequestType::UpdateRequest,
                        RequestedAction::RefundAccount,
                        CreditControlRequest::requested(rg, amount),
                    ))
                    .await?;
                info!("↩️  Refunded {} for rating group {}", amount, rg);
                state.rating_group(rg).mode = ChargingMode::Reserve;
            }
            Settlement::Extra(amount) => {
                self.accounts
                    .account_debit(self.debit_request(
                        exchange,
                        CcRequestType::TerminationRequest,
                        RequestedAction::DirectDebiting,
                        CreditControlRequest::used(rg, amount),
                    ))
                    .await?;
                info!("💰 Debited {} extra for rating group {}", amount, rg);
            }
        }

        state.rating_group(rg).reserved_quota = 0;

        info.triggers
            .push(Trigger::immediate(TriggerType::QuotaExhausted));
        info.granted_unit = Some(GrantedUnit::volume(0));

        Ok(info)
    }

    /// Current tariff of a rating group; 1 when the rating engine cannot say
    async fn unit_cost(&self, exchange: &Exchange<'_>, rg: u32) -> Result<u64, GroupError> {
        match self
            .rating
            .service_usage(self.usage_request(exchange, ServiceRating::tariff(rg)))
            .await
        {
            Ok(reply) => match reply.service_rating.unit_cost {
                Some(cost) => cost.to_units().ok_or(GroupError::Overflow("unit cost")),
                None => {
                    warn!("No unit cost for rating group {}, using 1", rg);
                    Ok(1)
                }
            },
            Err(e) => {
                warn!("Tariff lookup failed for rating group {}, using unit cost 1: {}", rg, e);
                Ok(1)
            }
        }
    }

    fn usage_request(&self, exchange: &Exchange<'_>, service_rating: ServiceRating) -> ServiceUsageRequest {
        ServiceUsageRequest {
            session_id: exchange.rate_session_id.clone(),
            origin_host: String::new(),
            origin_realm: String::new(),
            actual_time: Utc::now(),
            subscription_id: exchange.subscription_id.clone(),
            user_name: self.user_name.clone(),
            service_rating,
        }
    }

    fn debit_request(
        &self,
        exchange: &Exchange<'_>,
        cc_request_type: CcRequestType,
        requested_action: RequestedAction,
        credit_control: CreditControlRequest,
    ) -> AccountDebitRequest {
        AccountDebitRequest {
            session_id: exchange.acct_session_id.clone(),
            origin_host: String::new(),
            origin_realm: String::new(),
            event_timestamp: Utc::now(),
            subscription_id: exchange.subscription_id.clone(),
            user_name: self.user_name.clone(),
            cc_request_number: exchange.request_number,
            cc_request_type,
            requested_action,
            multiple_services_credit_control: credit_control,
        }
    }
}
