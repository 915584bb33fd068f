// tests/peer_simulator.rs
//! Rating and account peer simulators for integration testing
//!
//! Both implement the peer traits directly, answer from configurable values
//! and record every request they receive. The record store can be told to
//! fail its next writes.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use apolo_chf::config::AppConfig;
use apolo_chf::context::ChfContext;
use apolo_chf::database::{MemoryRecordStore, RecordStore};
use apolo_chf::error::ChargingError;
use apolo_chf::models::{
    ChargingDataRequest, ChfRecord, FinalUnitAction, MultipleUnitUsage, NfIdentification,
    QuotaManagementIndicator, RequestedUnit, Trigger, UsedUnitContainer,
};
use apolo_chf::peers::{
    AccountClient, AccountDebitRequest, AccountDebitResponse, CreditControlAnswer, PeerError,
    PeerFinalUnitIndication, RatingClient, ServiceRatingResult, ServiceUnit, ServiceUsageRequest,
    ServiceUsageResponse, UnitCost,
};
use apolo_chf::services::{ChargingProcessor, RecordExporter};

pub const SUPI: &str = "imsi-208930000000001";

#[derive(Default)]
pub struct RatingSimulator {
    unit_cost: Mutex<Option<i64>>,
    allowed_units: Mutex<u64>,
    price: Mutex<u64>,
    requests: Mutex<Vec<ServiceUsageRequest>>,
}

impl RatingSimulator {
    pub fn new(unit_cost: i64, allowed_units: u64, price: u64) -> Self {
        Self {
            unit_cost: Mutex::new(Some(unit_cost)),
            allowed_units: Mutex::new(allowed_units),
            price: Mutex::new(price),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_unit_cost(&self, unit_cost: i64) {
        *self.unit_cost.lock() = Some(unit_cost);
    }

    pub fn set_price(&self, price: u64) {
        *self.price.lock() = price;
    }

    pub fn requests(&self) -> Vec<ServiceUsageRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RatingClient for RatingSimulator {
    async fn service_usage(
        &self,
        request: ServiceUsageRequest,
    ) -> Result<ServiceUsageResponse, PeerError> {
        let service_identifier = request.service_rating.service_identifier;
        self.requests.lock().push(request);

        Ok(ServiceUsageResponse {
            session_id: String::new(),
            service_rating: ServiceRatingResult {
                service_identifier,
                unit_cost: (*self.unit_cost.lock()).map(|value_digits| UnitCost {
                    value_digits,
                    exponent: 0,
                }),
                allowed_units: *self.allowed_units.lock(),
                price: *self.price.lock(),
            },
        })
    }
}

#[derive(Default)]
pub struct AccountSimulator {
    /// Octets granted per request; `None` grants what was requested
    granted: Mutex<Option<u64>>,
    final_unit_action: Mutex<Option<FinalUnitAction>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<AccountDebitRequest>>,
}

impl AccountSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request only after `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_granted(&self, granted: u64) {
        *self.granted.lock() = Some(granted);
    }

    pub fn set_final_unit_action(&self, action: Option<FinalUnitAction>) {
        *self.final_unit_action.lock() = action;
    }

    pub fn requests(&self) -> Vec<AccountDebitRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AccountClient for AccountSimulator {
    async fn account_debit(
        &self,
        request: AccountDebitRequest,
    ) -> Result<AccountDebitResponse, PeerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let credit_control = &request.multiple_services_credit_control;
        let requested = credit_control
            .requested_service_unit
            .map(|unit| unit.cc_total_octets)
            .unwrap_or_default();
        let granted = (*self.granted.lock()).unwrap_or(requested);

        let response = AccountDebitResponse {
            session_id: request.session_id.clone(),
            cc_request_number: request.cc_request_number,
            multiple_services_credit_control: CreditControlAnswer {
                rating_group: credit_control.rating_group,
                granted_service_unit: ServiceUnit::octets(granted),
                final_unit_indication: (*self.final_unit_action.lock())
                    .map(|final_unit_action| PeerFinalUnitIndication { final_unit_action }),
            },
        };
        self.requests.lock().push(request);

        Ok(response)
    }
}

/// In-memory record store with injectable write failures
#[derive(Default)]
pub struct SimulatedStore {
    inner: MemoryRecordStore,
    failing_writes: Mutex<u32>,
}

impl SimulatedStore {
    pub fn fail_next_persist(&self) {
        *self.failing_writes.lock() += 1;
    }
}

#[async_trait]
impl RecordStore for SimulatedStore {
    async fn persist(&self, subscriber: &str, records: &[ChfRecord]) -> Result<(), ChargingError> {
        {
            let mut failing = self.failing_writes.lock();
            if *failing > 0 {
                *failing -= 1;
                return Err(ChargingError::Persistence("disk full".to_string()));
            }
        }
        self.inner.persist(subscriber, records).await
    }

    async fn records(&self, subscriber: &str) -> Result<Vec<ChfRecord>, ChargingError> {
        self.inner.records(subscriber).await
    }
}

pub struct Harness {
    pub processor: Arc<ChargingProcessor>,
    pub rating: Arc<RatingSimulator>,
    pub accounts: Arc<AccountSimulator>,
    pub store: Arc<SimulatedStore>,
}

impl Harness {
    pub fn new(rating: RatingSimulator, accounts: AccountSimulator) -> Self {
        Self::with_config(AppConfig::default(), rating, accounts)
    }

    pub fn with_config(config: AppConfig, rating: RatingSimulator, accounts: AccountSimulator) -> Self {
        let rating = Arc::new(rating);
        let accounts = Arc::new(accounts);
        let store = Arc::new(SimulatedStore::default());

        let processor = ChargingProcessor::new(
            Arc::new(ChfContext::new(config)),
            rating.clone() as Arc<dyn RatingClient>,
            accounts.clone() as Arc<dyn AccountClient>,
            store.clone() as Arc<dyn RecordStore>,
            Arc::new(RecordExporter::disabled()),
        );

        Self {
            processor: Arc::new(processor),
            rating,
            accounts,
            store,
        }
    }
}

pub fn online_usage(rating_group: u32, used: u64, requested: u64) -> MultipleUnitUsage {
    MultipleUnitUsage {
        rating_group,
        requested_unit: Some(RequestedUnit {
            total_volume: Some(requested),
            ..Default::default()
        }),
        used_unit_container: vec![UsedUnitContainer {
            quota_management_indicator: Some(QuotaManagementIndicator::OnlineCharging),
            total_volume: Some(used),
            ..Default::default()
        }],
        upf_id: None,
    }
}

pub fn charging_request(usages: Vec<MultipleUnitUsage>, triggers: Vec<Trigger>) -> ChargingDataRequest {
    ChargingDataRequest {
        subscriber_identifier: SUPI.to_string(),
        nf_consumer_identification: Some(NfIdentification {
            nf_name: Some("SMF".to_string()),
            ..Default::default()
        }),
        triggers,
        multiple_unit_usage: usages,
        ..Default::default()
    }
}
