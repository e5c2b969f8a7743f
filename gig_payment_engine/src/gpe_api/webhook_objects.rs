//! Gateway webhook payloads.
//!
//! Every delivery has the same envelope:
//!
//! ```json
//! {
//!   "entity": "event",
//!   "event": "payment.captured",
//!   "payload": {
//!     "payment": { "entity": { "id": "pay_...", "order_id": "order_...", "amount": 102520, ... } }
//!   },
//!   "created_at": 1709294400
//! }
//! ```
//!
//! Only the fields the settlement flow needs are modelled. Everything else is ignored.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl WebhookEnvelope {
    pub fn event_type(&self) -> WebhookEventType {
        self.event.parse().unwrap_or_else(|_| WebhookEventType::Unknown(self.event.clone()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<Wrapped<PaymentEntity>>,
    #[serde(default)]
    pub transfer: Option<Wrapped<TransferEntity>>,
    #[serde(default)]
    pub refund: Option<Wrapped<RefundEntity>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wrapped<T> {
    pub entity: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    /// Minor units
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEntity {
    pub id: String,
    /// The payment the transfer was split from
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundEntity {
    pub id: String,
    pub payment_id: String,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    PaymentAuthorized,
    PaymentCaptured,
    PaymentFailed,
    TransferProcessed,
    TransferFailed,
    RefundProcessed,
    RefundFailed,
    Unknown(String),
}

impl FromStr for WebhookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment.authorized" => Ok(Self::PaymentAuthorized),
            "payment.captured" => Ok(Self::PaymentCaptured),
            "payment.failed" => Ok(Self::PaymentFailed),
            "transfer.processed" => Ok(Self::TransferProcessed),
            "transfer.failed" => Ok(Self::TransferFailed),
            "refund.processed" => Ok(Self::RefundProcessed),
            "refund.failed" => Ok(Self::RefundFailed),
            other => Err(format!("Unsupported webhook event: {other}")),
        }
    }
}

impl Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PaymentAuthorized => "payment.authorized",
            Self::PaymentCaptured => "payment.captured",
            Self::PaymentFailed => "payment.failed",
            Self::TransferProcessed => "transfer.processed",
            Self::TransferFailed => "transfer.failed",
            Self::RefundProcessed => "refund.processed",
            Self::RefundFailed => "refund.failed",
            Self::Unknown(s) => s.as_str(),
        };
        write!(f, "{s}")
    }
}
