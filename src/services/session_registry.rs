// src/services/session_registry.rs
//! Per-subscriber charging sessions
//!
//! The registry map sits behind a short-lived `parking_lot::RwLock` that is
//! never held across an await. Each session carries its own async mutex,
//! held by the caller for a whole charging operation, peer calls included.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::config::ChargingPolicyConfig;
use crate::error::ChargingError;
use crate::models::{ChfRecord, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargingMode {
    Reserve,
    Debit,
}

/// Credit-control state of one rating group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingGroupState {
    pub mode: ChargingMode,
    /// Currency units held at the account peer; transiently negative
    /// between usage deduction and refill
    pub reserved_quota: i64,
    pub unit_cost: u64,
    pub request_number: u32,
}

impl Default for RatingGroupState {
    fn default() -> Self {
        Self {
            mode: ChargingMode::Reserve,
            reserved_quota: 0,
            unit_cost: 1,
            request_number: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub volume_threshold_rate: Decimal,
    pub volume_limit: u32,
    pub volume_limit_pdu: u32,
    pub quota_validity_time: u32,
    pub offline_volume_threshold: u64,
}

impl From<&ChargingPolicyConfig> for QuotaPolicy {
    fn from(config: &ChargingPolicyConfig) -> Self {
        Self {
            volume_threshold_rate: config.volume_threshold_rate,
            volume_limit: config.volume_limit,
            volume_limit_pdu: config.volume_limit_pdu,
            quota_validity_time: config.quota_validity_time,
            offline_volume_threshold: config.offline_volume_threshold,
        }
    }
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self::from(&ChargingPolicyConfig::default())
    }
}

/// Mutable state of a session, reachable only through [`ChargingSession::lock`]
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Records keyed by charging session id
    pub records: BTreeMap<String, ChfRecord>,
    pub rating_groups: BTreeMap<u32, RatingGroupState>,
    pub notify_uri: Option<String>,
    pub rate_session_id: u32,
    pub acct_session_id: u32,
    pub policy: QuotaPolicy,
    next_record_sequence: u64,
}

impl SessionState {
    fn new(rate_session_id: u32, acct_session_id: u32, policy: QuotaPolicy) -> Self {
        Self {
            records: BTreeMap::new(),
            rating_groups: BTreeMap::new(),
            notify_uri: None,
            rate_session_id,
            acct_session_id,
            policy,
            next_record_sequence: 0,
        }
    }

    /// Next record sequence number; never repeats within the session
    pub fn next_record_sequence(&mut self) -> u64 {
        let seq = self.next_record_sequence;
        self.next_record_sequence += 1;
        seq
    }

    /// State of a rating group, created in reserve mode on first use
    pub fn rating_group(&mut self, rating_group: u32) -> &mut RatingGroupState {
        self.rating_groups.entry(rating_group).or_default()
    }
}

pub struct ChargingSession {
    supi: String,
    subscription_id: SubscriptionId,
    state: Mutex<SessionState>,
}

impl ChargingSession {
    pub fn supi(&self) -> &str {
        &self.supi
    }

    pub fn subscription_id(&self) -> &SubscriptionId {
        &self.subscription_id
    }

    /// Exclusive access to the session state for one charging operation
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<ChargingSession>>>,
    rate_session_ids: AtomicU32,
    acct_session_ids: AtomicU32,
    policy: QuotaPolicy,
}

impl SessionRegistry {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            rate_session_ids: AtomicU32::new(1),
            acct_session_ids: AtomicU32::new(1),
            policy,
        }
    }

    /// Look up the subscriber's session, creating it on first contact.
    /// The identifier is validated before anything is inserted.
    pub fn find_or_create(&self, supi: &str) -> Result<Arc<ChargingSession>, ChargingError> {
        if let Some(session) = self.sessions.read().get(supi) {
            return Ok(Arc::clone(session));
        }

        let subscription_id = SubscriptionId::parse(supi)?;

        let mut sessions = self.sessions.write();
        let session = sessions.entry(supi.to_string()).or_insert_with(|| {
            let rate_session_id = self.rate_session_ids.fetch_add(1, Ordering::SeqCst);
            let acct_session_id = self.acct_session_ids.fetch_add(1, Ordering::SeqCst);
            info!(
                "📇 New charging session: supi={}, rate_session={}, acct_session={}",
                supi, rate_session_id, acct_session_id
            );
            Arc::new(ChargingSession {
                supi: supi.to_string(),
                subscription_id,
                state: Mutex::new(SessionState::new(
                    rate_session_id,
                    acct_session_id,
                    self.policy.clone(),
                )),
            })
        });

        Ok(Arc::clone(session))
    }

    pub fn find(&self, supi: &str) -> Option<Arc<ChargingSession>> {
        self.sessions.read().get(supi).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(QuotaPolicy::default())
    }
}
