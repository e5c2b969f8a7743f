use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, Paise, UserId},
    gpe_api::{
        errors::SettlementError,
        order_objects::{NewOrderRequest, OrderView, OrderWindows},
    },
    traits::SettlementDatabase,
};

/// `OrderFlowApi` drives an order through its lifecycle, up to the point where it can be paid for, and again once
/// the work is under way.
///
/// | from \ event | accept   | pay      | deliver   | complete  | cancel    |
/// |--------------|----------|----------|-----------|-----------|-----------|
/// | Pending      | Accepted | –        | –         | –         | Cancelled |
/// | Accepted     | –        | Active   | –         | –         | Cancelled |
/// | Active       | –        | –        | Delivered | –         | –         |
/// | Delivered    | –        | –        | –         | Completed | –         |
///
/// Payment (`Accepted -> Active`) is handled by [`crate::SettlementApi`].
pub struct OrderFlowApi<B> {
    db: B,
    windows: OrderWindows,
    currency: String,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, windows: OrderWindows, currency: &str) -> Self {
        Self { db, windows, currency: currency.to_string() }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: SettlementDatabase
{
    /// Places a new order on behalf of `client`. The freelancer then has `accept_window` to accept it.
    pub async fn create_order(&self, client: &UserId, request: NewOrderRequest) -> Result<Order, SettlementError> {
        if &request.freelancer_id == client {
            return Err(SettlementError::InvalidRequest("You cannot order your own service".into()));
        }
        if request.service_id.trim().is_empty() || request.plan_tier.trim().is_empty() {
            return Err(SettlementError::InvalidRequest("A service and plan tier are required".into()));
        }
        let price = Paise::try_from(request.price).map_err(|e| SettlementError::InvalidAmount(e.to_string()))?;
        if !price.is_positive() {
            return Err(SettlementError::InvalidAmount(format!("{} is not a valid price", request.price)));
        }
        let order = NewOrder {
            order_id: OrderId::random(),
            client_id: client.clone(),
            freelancer_id: request.freelancer_id,
            service_id: request.service_id,
            plan_tier: request.plan_tier,
            price,
            currency: self.currency.clone(),
            accept_deadline: Utc::now() + self.windows.accept_window,
        };
        let order = self.db.insert_order(order).await?;
        info!("📦️ Order [{}] placed by {client} for {} {}", order.order_id, order.price, order.currency);
        Ok(order)
    }

    /// Fetches an order for one of its parties, or an admin.
    pub async fn fetch_order(
        &self,
        caller: &UserId,
        is_admin: bool,
        order_id: &OrderId,
    ) -> Result<OrderView, SettlementError> {
        let order = self.fetch_existing(order_id).await?;
        if !is_admin && !order.is_party(caller) {
            return Err(SettlementError::NotAuthorized(format!("{caller} is not a party to order {order_id}")));
        }
        Ok(OrderView::at(order, Utc::now()))
    }

    pub async fn orders_for_user(&self, user: &UserId) -> Result<Vec<OrderView>, SettlementError> {
        let now = Utc::now();
        let orders = self.db.fetch_orders_for_user(user).await?;
        Ok(orders.into_iter().map(|o| OrderView::at(o, now)).collect())
    }

    /// The freelancer accepts the order. The client then has `payment_window` to pay.
    pub async fn accept(&self, caller: &UserId, order_id: &OrderId) -> Result<Order, SettlementError> {
        let order = self.fetch_existing(order_id).await?;
        if &order.freelancer_id != caller {
            return Err(SettlementError::NotAuthorized("Only the freelancer can accept an order".into()));
        }
        let now = Utc::now();
        let status = order.effective_status(now);
        if status != OrderStatusType::Pending {
            return Err(SettlementError::InvalidOrderState { order_id: order_id.clone(), status });
        }
        let updated = self.db.accept_order(order_id, now + self.windows.payment_window).await?;
        let order = self.or_current_state(order_id, updated).await?;
        info!("📦️ Order [{order_id}] accepted by {caller}");
        Ok(order)
    }

    /// The freelancer hands over the work.
    pub async fn deliver(&self, caller: &UserId, order_id: &OrderId) -> Result<Order, SettlementError> {
        let order = self.fetch_existing(order_id).await?;
        if &order.freelancer_id != caller {
            return Err(SettlementError::NotAuthorized("Only the freelancer can deliver an order".into()));
        }
        let updated =
            self.db.transition_order(order_id, &[OrderStatusType::Active], OrderStatusType::Delivered).await?;
        let order = self.or_current_state(order_id, updated).await?;
        info!("📦️ Order [{order_id}] delivered");
        Ok(order)
    }

    /// The client signs off on the delivery.
    pub async fn complete(&self, caller: &UserId, order_id: &OrderId) -> Result<Order, SettlementError> {
        let order = self.fetch_existing(order_id).await?;
        if &order.client_id != caller {
            return Err(SettlementError::NotAuthorized("Only the client can complete an order".into()));
        }
        let updated =
            self.db.transition_order(order_id, &[OrderStatusType::Delivered], OrderStatusType::Completed).await?;
        let order = self.or_current_state(order_id, updated).await?;
        info!("📦️ Order [{order_id}] completed");
        Ok(order)
    }

    /// Either party may cancel an order that has not been paid for. Expired orders can still be cancelled, which is
    /// how they are tidied away.
    pub async fn cancel(&self, caller: &UserId, order_id: &OrderId) -> Result<Order, SettlementError> {
        let order = self.fetch_existing(order_id).await?;
        if !order.is_party(caller) {
            return Err(SettlementError::NotAuthorized(format!("{caller} is not a party to order {order_id}")));
        }
        let updated = self
            .db
            .transition_order(
                order_id,
                &[OrderStatusType::Pending, OrderStatusType::Accepted],
                OrderStatusType::Cancelled,
            )
            .await?;
        let order = self.or_current_state(order_id, updated).await?;
        info!("📦️ Order [{order_id}] cancelled by {caller}");
        Ok(order)
    }

    async fn fetch_existing(&self, order_id: &OrderId) -> Result<Order, SettlementError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| SettlementError::OrderNotFound(order_id.clone()))
    }

    /// Turns a conditional update that matched nothing into an `InvalidOrderState` error carrying the current status.
    async fn or_current_state(&self, order_id: &OrderId, updated: Option<Order>) -> Result<Order, SettlementError> {
        match updated {
            Some(order) => Ok(order),
            None => {
                let current = self.fetch_existing(order_id).await?;
                let status = current.effective_status(Utc::now());
                debug!("📦️ Order [{order_id}] is {status}. Transition refused.");
                Err(SettlementError::InvalidOrderState { order_id: order_id.clone(), status })
            },
        }
    }
}
