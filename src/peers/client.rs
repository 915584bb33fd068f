//! JSON-RPC 2.0 over HTTP client shared by the rating and account peers

use reqwest::{Client, ClientBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use super::types::{JsonRpcRequest, JsonRpcResponse};
use crate::config::PeerConfig;

pub struct PeerClient {
    http_client: Client,
    base_url: String,
    origin_host: String,
    origin_realm: String,
    timeout_ms: u64,
    request_id: AtomicU64,
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP error: status {0}")]
    HttpError(u16),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("RPC error {0}: {1}")]
    RpcError(i32, String),

    #[error("Credit limit reached")]
    CreditLimitReached,

    #[error("Subscriber unknown to peer: {0}")]
    UnknownSubscriber(String),

    #[error("Rating group not provisioned: {0}")]
    UnknownRatingGroup(String),

    #[error("Empty response from peer")]
    EmptyResponse,

    #[error("Timeout: request took longer than {0}ms")]
    Timeout(u64),
}

impl PeerError {
    /// Map a JSON-RPC error object onto the charging failures the peers report
    fn from_rpc(code: i32, message: String) -> Self {
        let upper = message.to_uppercase();

        if upper.contains("INSUFFICIENT_CREDIT") || upper.contains("NOT_ENOUGH_BALANCE") {
            return PeerError::CreditLimitReached;
        }
        if upper.contains("ACCOUNT_NOT_FOUND") || upper.contains("USER_UNKNOWN") {
            return PeerError::UnknownSubscriber(message);
        }
        if upper.contains("RATING_GROUP") && upper.contains("NOT_FOUND") {
            return PeerError::UnknownRatingGroup(message);
        }

        PeerError::RpcError(code, message)
    }
}

impl PeerClient {
    pub fn new(
        base_url: &str,
        origin_host: Option<&str>,
        origin_realm: &str,
        timeout_ms: u64,
    ) -> Result<Self, PeerError> {
        let http_client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| PeerError::Connection(e.to_string()))?;

        let origin_host = match origin_host {
            Some(host) => host.to_string(),
            None => hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "apolo-chf".to_string()),
        };

        Ok(Self {
            http_client,
            base_url: base_url.to_string(),
            origin_host,
            origin_realm: origin_realm.to_string(),
            timeout_ms,
            request_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &PeerConfig) -> Result<Self, PeerError> {
        Self::new(
            &config.url,
            config.origin_host.as_deref(),
            &config.origin_realm,
            config.timeout_ms,
        )
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn origin_host(&self) -> &str {
        &self.origin_host
    }

    pub fn origin_realm(&self) -> &str {
        &self.origin_realm
    }

    /// Execute one JSON-RPC call and decode its result
    #[instrument(skip(self, params), fields(method = %method))]
    pub async fn call<T, R>(&self, method: &str, params: T) -> Result<R, PeerError>
    where
        T: Serialize + std::fmt::Debug,
        R: DeserializeOwned,
    {
        let request_id = self.next_id();

        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params: vec![params],
            id: request_id,
        };

        debug!("Peer request: method={}, id={}", method, request_id);

        let response = self
            .http_client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PeerError::Timeout(self.timeout_ms)
                } else {
                    PeerError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Peer HTTP error: method={}, status={}", method, status);
            return Err(PeerError::HttpError(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PeerError::ParseError(format!("Failed to read response body: {}", e)))?;

        debug!("Peer response: {}", body);

        let rpc_response: JsonRpcResponse<R> = serde_json::from_str(&body).map_err(|e| {
            PeerError::ParseError(format!("Failed to parse JSON: {} - Body: {}", e, body))
        })?;

        if let Some(err) = rpc_response.error {
            let err = PeerError::from_rpc(err.code, err.message);
            warn!("Peer rejected {}: {}", method, err);
            return Err(err);
        }

        rpc_response.result.ok_or(PeerError::EmptyResponse)
    }

    /// Ask the peer behind `method` (e.g. `RatingSv1.Ping`) whether it is serving
    pub async fn health_check(&self, method: &str) -> Result<bool, PeerError> {
        #[derive(Debug, Serialize)]
        struct PingArgs {}

        #[derive(Deserialize)]
        struct PingReply(String);

        let reply: PingReply = self.call(method, PingArgs {}).await?;
        Ok(reply.0 == "Pong")
    }
}
