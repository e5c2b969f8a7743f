use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Paise, Payment};

/// What we ask the gateway for when a client starts checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrderRequest {
    /// In minor units
    pub amount: Paise,
    pub currency: String,
    /// Our order id. Shows up on the gateway dashboard and in settlement reports.
    pub receipt: String,
    #[serde(default)]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: Paise,
    pub currency: String,
}

/// The result of [`crate::traits::SettlementDatabase::complete_payment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompletion {
    pub payment: Payment,
    /// The order after the update. `None` only if the order row has gone missing.
    pub order: Option<Order>,
    /// False if the payment had already been completed by an earlier call.
    pub newly_completed: bool,
}
