use thiserror::Error;

use crate::{
    helpers::SignatureError,
    traits::data_objects::{GatewayOrder, GatewayOrderRequest},
};

/// The outbound half of the payment gateway.
///
/// Implementations talk to the gateway's REST API and own the API key secret, which is also the key the gateway
/// uses to sign checkout results.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Mints a gateway-side order for the given amount. The returned id is what the hosted checkout is opened with.
    ///
    /// This is never retried. A failure is reported to the caller, who may try again.
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, PaymentGatewayError>;

    /// Checks the signature the gateway attached to a completed checkout.
    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(), SignatureError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Could not reach the payment gateway: {0}")]
    Unreachable(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
    #[error("Could not understand the payment gateway's response. {0}")]
    InvalidResponse(String),
}
