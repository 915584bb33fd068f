//! Account balance interface (ABMF): debit, reserve and refund

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::client::{PeerClient, PeerError};
use super::types::{methods, AccountDebitRequest, AccountDebitResponse};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Send an account debit request. Origin host and realm are stamped by
    /// the transport.
    async fn account_debit(
        &self,
        request: AccountDebitRequest,
    ) -> Result<AccountDebitResponse, PeerError>;
}

#[async_trait]
impl AccountClient for PeerClient {
    #[instrument(skip(self, request), fields(
        session_id = %request.session_id,
        rating_group = request.multiple_services_credit_control.rating_group,
        cc_request_number = request.cc_request_number
    ))]
    async fn account_debit(
        &self,
        mut request: AccountDebitRequest,
    ) -> Result<AccountDebitResponse, PeerError> {
        request.origin_host = self.origin_host().to_string();
        request.origin_realm = self.origin_realm().to_string();

        let reply: AccountDebitResponse = self.call(methods::ACCOUNT_DEBIT, request).await?;

        debug!(
            "Account debit reply: granted={}, final_unit={:?}",
            reply.multiple_services_credit_control.granted_service_unit.cc_total_octets,
            reply.multiple_services_credit_control.final_unit_indication
        );

        Ok(reply)
    }
}
