use gig_common::Secret;
use gig_payment_engine::{
    db_types::Paise,
    helpers::{verify_checkout_signature, SignatureError},
    traits::{GatewayOrder, GatewayOrderRequest, PaymentGateway, PaymentGatewayError},
};
use log::*;
use razorpay_tools::{NewRazorpayOrder, RazorpayApi, RazorpayApiError, RazorpayConfig};

/// [`PaymentGateway`] backed by the Razorpay REST API.
#[derive(Clone)]
pub struct RazorpayGateway {
    api: RazorpayApi,
    key_secret: Secret<String>,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, RazorpayApiError> {
        let key_secret = config.key_secret.clone();
        let api = RazorpayApi::new(config)?;
        Ok(Self { api, key_secret })
    }
}

impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, PaymentGatewayError> {
        let order = NewRazorpayOrder {
            amount: request.amount.value(),
            currency: request.currency,
            receipt: request.receipt,
            notes: request.notes,
        };
        let order = self.api.create_order(order).await.map_err(|e| {
            warn!("💳️ Razorpay order creation failed. {e}");
            convert_error(e)
        })?;
        Ok(GatewayOrder { id: order.id, amount: Paise::from(order.amount), currency: order.currency })
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(), SignatureError> {
        verify_checkout_signature(self.key_secret.reveal(), gateway_order_id, gateway_payment_id, signature)
    }
}

fn convert_error(e: RazorpayApiError) -> PaymentGatewayError {
    match e {
        RazorpayApiError::RestRequestError(s) | RazorpayApiError::Initialization(s) => {
            PaymentGatewayError::Unreachable(s)
        },
        RazorpayApiError::QueryError { status, message } => {
            PaymentGatewayError::Rejected(format!("Error {status}. {message}"))
        },
        RazorpayApiError::RestResponseError(s) | RazorpayApiError::JsonError(s) => {
            PaymentGatewayError::InvalidResponse(s)
        },
    }
}
