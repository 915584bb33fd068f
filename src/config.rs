// src/config.rs
//! Service configuration
//!
//! Loaded with the `config` crate: built-in defaults, then the optional
//! `config/default` and `config/{RUN_MODE}` files, then `CHF__` prefixed
//! environment variables (e.g. `CHF__RATING__URL`).

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sbi: SbiConfig,
    #[serde(default = "default_rating_peer")]
    pub rating: PeerConfig,
    #[serde(default = "default_account_peer")]
    pub account: PeerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub charging: ChargingPolicyConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

/// Service-based interface identity of this CHF
#[derive(Debug, Deserialize, Clone)]
pub struct SbiConfig {
    /// Base URI advertised in `Location` headers
    #[serde(default = "default_sbi_uri")]
    pub uri: String,

    #[serde(default = "default_node_name")]
    pub node_name: String,
}

fn default_sbi_uri() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_node_name() -> String {
    "CHF".to_string()
}

impl Default for SbiConfig {
    fn default() -> Self {
        Self {
            uri: default_sbi_uri(),
            node_name: default_node_name(),
        }
    }
}

/// Rating engine or account balance peer
#[derive(Debug, Deserialize, Clone)]
pub struct PeerConfig {
    pub url: String,

    /// Falls back to the local hostname when unset
    #[serde(default)]
    pub origin_host: Option<String>,

    #[serde(default = "default_origin_realm")]
    pub origin_realm: String,

    #[serde(default = "default_peer_timeout")]
    pub timeout_ms: u64,
}

fn default_origin_realm() -> String {
    "chf.local".to_string()
}

fn default_peer_timeout() -> u64 {
    3000
}

fn default_rating_peer() -> PeerConfig {
    PeerConfig {
        url: "http://127.0.0.1:2080/jsonrpc".to_string(),
        origin_host: None,
        origin_realm: default_origin_realm(),
        timeout_ms: default_peer_timeout(),
    }
}

fn default_account_peer() -> PeerConfig {
    PeerConfig {
        url: "http://127.0.0.1:2081/jsonrpc".to_string(),
        origin_host: None,
        origin_realm: default_origin_realm(),
        timeout_ms: default_peer_timeout(),
    }
}

/// Billing gateway (CGF) the records are forwarded to
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Export is disabled when unset
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    #[serde(default = "default_peer_timeout")]
    pub timeout_ms: u64,
}

fn default_queue_size() -> usize {
    1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: None,
            queue_size: default_queue_size(),
            timeout_ms: default_peer_timeout(),
        }
    }
}

/// Record store database; records are kept in memory when unset
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    16
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Quota policy handed to every new charging session
#[derive(Debug, Deserialize, Clone)]
pub struct ChargingPolicyConfig {
    /// Fraction of the granted volume at which the consumer reports back
    #[serde(default = "default_threshold_rate")]
    pub volume_threshold_rate: Decimal,

    /// Deferred volume limit, 0 disables the trigger
    #[serde(default)]
    pub volume_limit: u32,

    /// Immediate volume limit per PDU session, 0 disables the trigger
    #[serde(default)]
    pub volume_limit_pdu: u32,

    /// Seconds, 0 disables the trigger
    #[serde(default)]
    pub quota_validity_time: u32,

    #[serde(default = "default_offline_threshold")]
    pub offline_volume_threshold: u64,

    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_ms: u64,
}

fn default_threshold_rate() -> Decimal {
    Decimal::new(8, 1)
}

fn default_offline_threshold() -> u64 {
    30_000_000
}

fn default_notify_timeout() -> u64 {
    2000
}

impl Default for ChargingPolicyConfig {
    fn default() -> Self {
        Self {
            volume_threshold_rate: default_threshold_rate(),
            volume_limit: 0,
            volume_limit_pdu: 0,
            quota_validity_time: 0,
            offline_volume_threshold: default_offline_threshold(),
            notify_timeout_ms: default_notify_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            sbi: SbiConfig::default(),
            rating: default_rating_peer(),
            account: default_account_peer(),
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            charging: ChargingPolicyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, config files and environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("server.workers", default_workers() as i64)?
            .set_default("sbi.uri", default_sbi_uri())?
            .set_default("sbi.node_name", default_node_name())?
            .set_default("rating.url", default_rating_peer().url)?
            .set_default("account.url", default_account_peer().url)?
            .set_default("charging.volume_threshold_rate", "0.8")?
            .set_default("charging.offline_volume_threshold", 30_000_000i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("CHF")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
