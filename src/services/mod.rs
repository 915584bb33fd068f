// src/services/mod.rs
pub mod notifier;
pub mod processor;
pub mod quota_engine;
pub mod record_exporter;
pub mod record_manager;
pub mod session_registry;

pub use notifier::NotificationDispatcher;
pub use processor::ChargingProcessor;
pub use quota_engine::{QuotaEngine, QuotaOutcome};
pub use record_exporter::RecordExporter;
pub use record_manager::RecordManager;
pub use session_registry::{
    ChargingMode, ChargingSession, QuotaPolicy, RatingGroupState, SessionRegistry, SessionState,
};
