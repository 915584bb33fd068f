//! Apolo converged charging function (CHF)
//!
//! Serves the Nchf converged charging operations: online quota reservation
//! and debit settlement against a rating engine and an account balance
//! function, plus the lifecycle of the CHF records of each subscriber.

pub mod api;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod models;
pub mod peers;
pub mod services;

pub use config::AppConfig;
pub use context::ChfContext;
pub use error::ChargingError;
pub use services::ChargingProcessor;
