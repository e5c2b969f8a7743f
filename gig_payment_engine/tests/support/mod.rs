#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use chrono::Duration;
use gig_payment_engine::{
    db_types::{Order, UserId},
    helpers::{sign_checkout, verify_checkout_signature, SignatureError},
    order_objects::{NewOrderRequest, OrderWindows},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{GatewayOrder, GatewayOrderRequest, PaymentGateway, PaymentGatewayError},
    FeeSchedule,
    OrderFlowApi,
    SettlementApi,
    SqliteDatabase,
};
use rust_decimal::Decimal;
use serde_json::json;

pub const KEY_SECRET: &str = "rzp_test_key_secret";

/// Stands in for the gateway's REST API. Gateway order ids are sequential so that tests can predict them.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    next_id: Arc<AtomicU64>,
    offline: Arc<AtomicBool>,
}

impl FakeGateway {
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<GatewayOrder, PaymentGatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PaymentGatewayError::Unreachable("connection refused".into()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder { id: format!("order_test{n}"), amount: request.amount, currency: request.currency })
    }

    fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(), SignatureError> {
        verify_checkout_signature(KEY_SECRET, gateway_order_id, gateway_payment_id, signature)
    }
}

pub struct TestSystem {
    pub db_path: String,
    pub gateway: FakeGateway,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub settlement: SettlementApi<SqliteDatabase, FakeGateway>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_windows(OrderWindows::default()).await
    }

    pub async fn with_windows(windows: OrderWindows) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        let gateway = FakeGateway::default();
        let orders = OrderFlowApi::new(db.clone(), windows, "INR");
        let settlement = SettlementApi::new(db, gateway.clone(), FeeSchedule::default(), "INR");
        Self { db_path: url, gateway, orders, settlement }
    }

    /// Places an order from `client` to `freelancer` and has the freelancer accept it.
    pub async fn accepted_order(&self, client: &str, freelancer: &str, price: i64) -> Order {
        let order = self.new_order(client, freelancer, price).await;
        self.orders.accept(&UserId::from(freelancer), &order.order_id).await.expect("Error accepting order")
    }

    pub async fn new_order(&self, client: &str, freelancer: &str, price: i64) -> Order {
        let request = NewOrderRequest {
            freelancer_id: UserId::from(freelancer),
            service_id: "logo-design".into(),
            plan_tier: "standard".into(),
            price: Decimal::from(price),
        };
        self.orders.create_order(&UserId::from(client), request).await.expect("Error creating order")
    }
}

pub fn no_expiry() -> OrderWindows {
    OrderWindows { accept_window: Duration::days(30), payment_window: Duration::days(30) }
}

pub fn already_expired() -> OrderWindows {
    OrderWindows { accept_window: Duration::seconds(-1), payment_window: Duration::seconds(-1) }
}

pub fn checkout_signature(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    sign_checkout(KEY_SECRET, gateway_order_id, gateway_payment_id)
}

pub fn payment_webhook(event: &str, gateway_order_id: &str, gateway_payment_id: &str, amount: i64) -> Vec<u8> {
    json!({
        "entity": "event",
        "event": event,
        "contains": ["payment"],
        "payload": {
            "payment": {
                "entity": {
                    "id": gateway_payment_id,
                    "entity": "payment",
                    "amount": amount,
                    "currency": "INR",
                    "order_id": gateway_order_id,
                    "error_description": if event == "payment.failed" { Some("Payment was declined by the bank") } else { None },
                }
            }
        },
        "created_at": 1709294400
    })
    .to_string()
    .into_bytes()
}

pub fn transfer_webhook(event: &str, transfer_id: &str, gateway_payment_id: &str) -> Vec<u8> {
    json!({
        "entity": "event",
        "event": event,
        "payload": { "transfer": { "entity": { "id": transfer_id, "source": gateway_payment_id, "amount": 86000 } } }
    })
    .to_string()
    .into_bytes()
}

pub fn refund_webhook(event: &str, refund_id: &str, gateway_payment_id: &str) -> Vec<u8> {
    json!({
        "entity": "event",
        "event": event,
        "payload": { "refund": { "entity": { "id": refund_id, "payment_id": gateway_payment_id, "amount": 102520 } } }
    })
    .to_string()
    .into_bytes()
}
