use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, UserId};

/// A request from a client to buy a service plan tier from a freelancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub freelancer_id: UserId,
    pub service_id: String,
    pub plan_tier: String,
    /// In major units, e.g. rupees
    pub price: Decimal,
}

/// An order, as presented to its parties. `effective_status` takes the deadlines into account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub effective_status: OrderStatusType,
}

impl OrderView {
    pub fn at(order: Order, now: DateTime<Utc>) -> Self {
        let effective_status = order.effective_status(now);
        Self { order, effective_status }
    }
}

/// How long the freelancer has to accept an order, and the client then has to pay for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderWindows {
    pub accept_window: Duration,
    pub payment_window: Duration,
}

impl Default for OrderWindows {
    fn default() -> Self {
        Self { accept_window: Duration::hours(48), payment_window: Duration::hours(24) }
    }
}
