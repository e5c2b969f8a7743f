use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{OrderId, Paise},
    fees::FeeBreakdown,
};

/// Everything the client needs to open the gateway's hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiated {
    pub gateway_order_id: String,
    /// Minor units, as the checkout widget expects
    pub amount: Paise,
    pub currency: String,
}

/// The checkout result as reported by the client's browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event changed something.
    Applied,
    /// The event was valid but had already been applied, e.g. by the client-side verification.
    AlreadyApplied,
    /// The event id was already in the ledger.
    Duplicate,
    /// Acknowledged, but nothing was done. The reason has been logged.
    Ignored(String),
}

/// The platform's fee settings, with a worked example.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSettings {
    pub commission_rate: Decimal,
    pub tax_rate: Decimal,
    pub currency: String,
    pub example: FeeBreakdown,
}
