//! `SqliteDatabase` is a concrete implementation of a settlement backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements [`SettlementDatabase`].
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, orders, payments, webhook_events};
use crate::{
    db_types::{NewOrder, NewPayment, Order, OrderId, OrderStatusType, Payment, PaymentStatus, UserId},
    traits::{PaymentCompletion, SettlementDatabase, SettlementDatabaseError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Returns a reference to the database connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user: &UserId) -> Result<Vec<Order>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user, &mut conn).await?;
        Ok(orders)
    }

    async fn accept_order(
        &self,
        order_id: &OrderId,
        payment_deadline: DateTime<Utc>,
    ) -> Result<Option<Order>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::accept_order(order_id, payment_deadline, &mut conn).await?;
        Ok(order)
    }

    async fn transition_order(
        &self,
        order_id: &OrderId,
        from: &[OrderStatusType],
        to: OrderStatusType,
    ) -> Result<Option<Order>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::transition_order_status(order_id, from, to, &mut conn).await?;
        Ok(order)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(payment, &mut conn).await
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_gateway_order_id(gateway_order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_gateway_payment_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_gateway_payment_id(gateway_payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments_for_order(order_id, &mut conn).await?;
        Ok(payments)
    }

    /// Both conditional updates run in one transaction, so the payment and its order never disagree.
    ///
    /// If the order is no longer `Accepted` when a payment completes, the money has been taken for an order that was
    /// cancelled, or that another payment already settled, so the payment is flagged for review.
    async fn complete_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Result<PaymentCompletion, SettlementDatabaseError> {
        // Write first, so that the transaction takes the write lock straight away
        let mut tx = self.pool.begin().await?;
        let (payment, newly_completed) = match payments::complete_payment(gateway_order_id, gateway_payment_id, &mut tx)
            .await?
        {
            Some(p) => {
                debug!("🗃️ Payment #{} ({gateway_order_id}) is now Completed", p.id);
                let activated = orders::transition_order_status(
                    &p.order_id,
                    &[OrderStatusType::Accepted],
                    OrderStatusType::Active,
                    &mut tx,
                )
                .await?;
                match activated {
                    Some(_) => (p, true),
                    None => {
                        error!(
                            "🗃️ Payment #{} ({gateway_order_id}) completed, but order [{}] is not waiting for payment. \
                             Flagged for review.",
                            p.id, p.order_id
                        );
                        let flagged = payments::flag_for_review(p.id, &mut tx).await?;
                        (flagged.unwrap_or(p), true)
                    },
                }
            },
            None => {
                let existing = payments::fetch_payment_by_gateway_order_id(gateway_order_id, &mut tx)
                    .await?
                    .ok_or_else(|| SettlementDatabaseError::PaymentNotFound(gateway_order_id.to_string()))?;
                if existing.status != PaymentStatus::Completed {
                    warn!(
                        "🗃️ Payment #{} ({gateway_order_id}) is {} and cannot be completed.",
                        existing.id, existing.status
                    );
                }
                (existing, false)
            },
        };
        let order = orders::fetch_order_by_order_id(&payment.order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(PaymentCompletion { payment, order, newly_completed })
    }

    async fn fail_payment(
        &self,
        id: i64,
        gateway_payment_id: Option<String>,
    ) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fail_payment(id, gateway_payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn refund_payment(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::refund_payment(id, &mut conn).await?;
        Ok(payment)
    }

    async fn mark_payment_transferred(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::mark_transferred(id, false, &mut conn).await?;
        Ok(payment)
    }

    async fn flag_manual_transfer(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::flag_manual_transfer(id, &mut conn).await?;
        Ok(payment)
    }

    async fn flag_payment_for_review(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::flag_for_review(id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_awaiting_transfer(&self) -> Result<Vec<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments_awaiting_transfer(&mut conn).await?;
        Ok(payments)
    }

    async fn complete_manual_transfer(&self, id: i64) -> Result<Option<Payment>, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::mark_transferred(id, true, &mut conn).await?;
        Ok(payment)
    }

    async fn webhook_event_seen(&self, event_id: &str) -> Result<bool, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let seen = webhook_events::event_exists(event_id, &mut conn).await?;
        Ok(seen)
    }

    async fn record_webhook_event(&self, event_id: &str, event_type: &str) -> Result<bool, SettlementDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let inserted = webhook_events::record_event(event_id, event_type, &mut conn).await?;
        Ok(inserted)
    }

    async fn close(&mut self) -> Result<(), SettlementDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}
