use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    fees::FeeError,
    helpers::SignatureError,
    traits::{PaymentGatewayError, SettlementDatabaseError},
};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Invalid amount. {0}")]
    InvalidAmount(String),
    #[error("Invalid rate. {0}")]
    InvalidRate(String),
    #[error("You are not allowed to do that. {0}")]
    NotAuthorized(String),
    #[error("Order {order_id} is {status}, so this action is not possible")]
    InvalidOrderState { order_id: OrderId, status: OrderStatusType },
    #[error("The payment signature could not be verified")]
    SignatureMismatch,
    #[error("The webhook signature could not be verified")]
    InvalidSignature,
    #[error("Payment gateway error. {0}")]
    GatewayError(#[from] PaymentGatewayError),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl SettlementError {
    /// Errors that are worth a retry from the other side. The webhook receiver answers these with a 5xx so that
    /// the gateway redelivers.
    pub fn is_retry_worthy(&self) -> bool {
        matches!(self, SettlementError::DatabaseError(_))
    }
}

impl From<SettlementDatabaseError> for SettlementError {
    fn from(e: SettlementDatabaseError) -> Self {
        match e {
            SettlementDatabaseError::OrderNotFound(id) => SettlementError::OrderNotFound(id),
            SettlementDatabaseError::PaymentNotFound(id) => SettlementError::PaymentNotFound(id),
            SettlementDatabaseError::OrderAlreadyExists(id) => {
                SettlementError::InvalidRequest(format!("Order {id} already exists"))
            },
            SettlementDatabaseError::PaymentAlreadyExists(id) => {
                SettlementError::InvalidRequest(format!("Gateway order {id} is already in use"))
            },
            SettlementDatabaseError::DatabaseError(s) => SettlementError::DatabaseError(s),
        }
    }
}

impl From<FeeError> for SettlementError {
    fn from(e: FeeError) -> Self {
        match e {
            FeeError::InvalidRate(_) => SettlementError::InvalidRate(e.to_string()),
            FeeError::InvalidAmount(_) | FeeError::Overflow(_) => SettlementError::InvalidAmount(e.to_string()),
        }
    }
}

impl From<SignatureError> for SettlementError {
    fn from(_: SignatureError) -> Self {
        SettlementError::SignatureMismatch
    }
}
