//! Rating engine interface: tariff lookup, quota pricing and final pricing

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::client::{PeerClient, PeerError};
use super::types::{methods, ServiceUsageRequest, ServiceUsageResponse};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingClient: Send + Sync {
    /// Send a service usage request. Origin host and realm are stamped by
    /// the transport.
    async fn service_usage(
        &self,
        request: ServiceUsageRequest,
    ) -> Result<ServiceUsageResponse, PeerError>;
}

#[async_trait]
impl RatingClient for PeerClient {
    #[instrument(skip(self, request), fields(
        session_id = %request.session_id,
        rating_group = request.service_rating.service_identifier
    ))]
    async fn service_usage(
        &self,
        mut request: ServiceUsageRequest,
    ) -> Result<ServiceUsageResponse, PeerError> {
        request.origin_host = self.origin_host().to_string();
        request.origin_realm = self.origin_realm().to_string();

        let reply: ServiceUsageResponse = self.call(methods::SERVICE_USAGE, request).await?;

        debug!(
            "Service usage reply: unit_cost={:?}, allowed_units={}, price={}",
            reply.service_rating.unit_cost,
            reply.service_rating.allowed_units,
            reply.service_rating.price
        );

        Ok(reply)
    }
}
