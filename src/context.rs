// src/context.rs
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::AppConfig;
use crate::services::session_registry::{QuotaPolicy, SessionRegistry};

pub const SERVICE_PATH: &str = "/nchf-convergedcharging/v3";

/// Process-wide charging state, built once at startup and shared by reference
pub struct ChfContext {
    config: AppConfig,
    registry: SessionRegistry,
    local_record_sequence: AtomicU64,
}

impl ChfContext {
    pub fn new(config: AppConfig) -> Self {
        let registry = SessionRegistry::new(QuotaPolicy::from(&config.charging));
        Self {
            config,
            registry,
            local_record_sequence: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn node_name(&self) -> &str {
        &self.config.sbi.node_name
    }

    /// Local record sequence number, unique across all sessions
    pub fn next_local_sequence(&self) -> u64 {
        self.local_record_sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// `Location` of a charging data resource
    pub fn location(&self, charging_session_id: &str) -> String {
        format!(
            "{}{}/chargingdata/{}",
            self.config.sbi.uri.trim_end_matches('/'),
            SERVICE_PATH,
            charging_session_id
        )
    }
}
