// src/services/notifier.rs
//! Best-effort charging notifications towards the consumer's notify URI

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, ClientBuilder};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::ChargingNotifyRequest;

/// HTTP client bound to one callback endpoint
pub struct CallbackClient {
    http_client: Client,
    uri: String,
}

impl CallbackClient {
    fn new(uri: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = ClientBuilder::new()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            http_client,
            uri: uri.to_string(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    async fn send(&self, request: &ChargingNotifyRequest) {
        match self.http_client.post(&self.uri).json(request).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Charging notification delivered to {}", self.uri);
            }
            Ok(response) => {
                warn!(
                    "⚠️  Charging notification to {} failed: status {}",
                    self.uri,
                    response.status()
                );
            }
            Err(e) => {
                warn!("⚠️  Charging notification to {} failed: {}", self.uri, e);
            }
        }
    }
}

pub struct NotificationDispatcher {
    clients: RwLock<HashMap<String, Arc<CallbackClient>>>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Cached client for `uri`, built on first use
    fn client(&self, uri: &str) -> Option<Arc<CallbackClient>> {
        if let Some(client) = self.clients.read().get(uri) {
            return Some(Arc::clone(client));
        }

        let client = match CallbackClient::new(uri, self.timeout) {
            Ok(client) => client,
            Err(e) => {
                warn!("Cannot build callback client for {}: {}", uri, e);
                return None;
            }
        };

        let mut clients = self.clients.write();
        let client = clients
            .entry(uri.to_string())
            .or_insert_with(|| Arc::new(client));
        Some(Arc::clone(client))
    }

    /// Fire-and-forget POST of `request` to `uri`. The returned handle only
    /// matters to callers that want to wait for delivery.
    pub fn notify(&self, uri: &str, request: ChargingNotifyRequest) -> Option<JoinHandle<()>> {
        if uri.is_empty() {
            return None;
        }
        let client = self.client(uri)?;

        info!("📨 Sending charging notification to {}", uri);
        Some(tokio::spawn(async move {
            client.send(&request).await;
        }))
    }

    pub fn cached_clients(&self) -> usize {
        self.clients.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationType, ReauthorizationDetails};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reauthorization(rating_group: u32) -> ChargingNotifyRequest {
        ChargingNotifyRequest {
            notification_type: NotificationType::Reauthorization,
            reauthorization_details: vec![ReauthorizationDetails {
                rating_group,
                service_id: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_notification_is_posted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .and(body_partial_json(serde_json::json!({
                "reauthorizationDetails": [{ "ratingGroup": 11 }]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = NotificationDispatcher::new(1000);
        let uri = format!("{}/notify", server.uri());
        dispatcher
            .notify(&uri, reauthorization(11))
            .unwrap()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_notification_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dispatcher = NotificationDispatcher::new(1000);
        let handle = dispatcher.notify(&server.uri(), reauthorization(1)).unwrap();
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_clients_cached_per_uri() {
        let dispatcher = NotificationDispatcher::new(1000);
        let a = dispatcher.client("http://127.0.0.1:1/a").unwrap();
        let b = dispatcher.client("http://127.0.0.1:1/a").unwrap();
        dispatcher.client("http://127.0.0.1:1/b").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.uri(), "http://127.0.0.1:1/a");
        assert_eq!(dispatcher.cached_clients(), 2);
    }

    #[test]
    fn test_empty_uri_is_ignored() {
        let dispatcher = NotificationDispatcher::new(1000);
        assert!(dispatcher.notify("", reauthorization(1)).is_none());
        assert_eq!(dispatcher.cached_clients(), 0);
    }
}
