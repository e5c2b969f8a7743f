use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewPayment, Order, OrderId, OrderStatusType, Payment, UserId},
    traits::data_objects::PaymentCompletion,
};

/// This trait defines the storage behaviour that backends need to provide for order settlement.
///
/// Every state change is a conditional update: it only takes effect if the record is still in the expected
/// predecessor state. Methods that perform such an update return `Ok(None)` when nothing matched, so that replays
/// and races are harmless. Backends must not hold any state of their own beyond the database handle.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a brand-new order with `Pending` status.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, SettlementDatabaseError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, SettlementDatabaseError>;

    /// All orders where the user is either the client or the freelancer, newest first.
    async fn fetch_orders_for_user(&self, user: &UserId) -> Result<Vec<Order>, SettlementDatabaseError>;

    /// `Pending -> Accepted`. Sets the payment deadline.
    async fn accept_order(
        &self,
        order_id: &OrderId,
        payment_deadline: DateTime<Utc>,
    ) -> Result<Option<Order>, SettlementDatabaseError>;

    /// Moves the order to `to` if its stored status is one of `from`.
    async fn transition_order(
        &self,
        order_id: &OrderId,
        from: &[OrderStatusType],
        to: OrderStatusType,
    ) -> Result<Option<Order>, SettlementDatabaseError>;

    /// Stores a new `Pending` payment. Gateway order ids are unique.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, SettlementDatabaseError>;

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError>;

    async fn fetch_payment_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, SettlementDatabaseError>;

    async fn fetch_payment_by_gateway_payment_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<Payment>, SettlementDatabaseError>;

    async fn fetch_payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, SettlementDatabaseError>;

    /// In a single atomic transaction:
    /// * the payment for `gateway_order_id` goes `Pending | Failed -> Completed`, recording the gateway payment id,
    /// * its order goes `Accepted -> Active`.
    ///
    /// If the order is not `Accepted` at that point (it was cancelled, or another payment already activated it), the
    /// payment is still completed but is also flagged `needs_review`.
    ///
    /// If the payment is already completed, nothing is written and `newly_completed` is false.
    /// Fails with `PaymentNotFound` if there is no payment for the gateway order id.
    async fn complete_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Result<PaymentCompletion, SettlementDatabaseError>;

    /// `Pending -> Failed`. The order is left alone so the client can retry or cancel.
    async fn fail_payment(
        &self,
        id: i64,
        gateway_payment_id: Option<String>,
    ) -> Result<Option<Payment>, SettlementDatabaseError>;

    /// `Completed -> Refunded`
    async fn refund_payment(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError>;

    /// Records a successful payout to the freelancer. Clears the manual transfer flag.
    async fn mark_payment_transferred(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError>;

    /// Flags a payment whose automatic payout failed, so that an admin can pay the freelancer by hand.
    async fn flag_manual_transfer(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError>;

    async fn flag_payment_for_review(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError>;

    /// Completed payments whose payout has to be done by hand.
    async fn fetch_payments_awaiting_transfer(&self) -> Result<Vec<Payment>, SettlementDatabaseError>;

    /// Clears the manual transfer flag once an admin has paid the freelancer. Only flagged payments are affected.
    async fn complete_manual_transfer(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError>;

    async fn webhook_event_seen(&self, event_id: &str) -> Result<bool, SettlementDatabaseError>;

    /// Adds the event to the ledger. Returns false if it was already there.
    async fn record_webhook_event(&self, event_id: &str, event_type: &str) -> Result<bool, SettlementDatabaseError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), SettlementDatabaseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementDatabaseError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("Cannot insert payment, since gateway order {0} is already linked to a payment")]
    PaymentAlreadyExists(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("There is no payment for {0}")]
    PaymentNotFound(String),
}

impl From<sqlx::Error> for SettlementDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        SettlementDatabaseError::DatabaseError(e.to_string())
    }
}
