use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use chrono::Duration;
use gig_common::Secret;
use gig_payment_engine::{
    db_types::{OrderStatusType, PaymentStatus, UserId},
    helpers::sign_webhook,
    order_objects::{NewOrderRequest, OrderWindows},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{GatewayOrder, SettlementDatabase},
    FeeSchedule,
    OrderFlowApi,
    SettlementApi,
    SqliteDatabase,
};
use rust_decimal::Decimal;
use serde_json::json;

use super::{helpers::json, mocks::MockGateway};
use crate::{
    middleware::HmacMiddlewareFactory,
    routes::{RazorpayWebhookRoute, WEBHOOK_EVENT_ID_HEADER},
    server::{configure_extractors, RAZORPAY_SIGNATURE_HEADER},
};

const WEBHOOK_SECRET: &str = "whsec_test_5e1f";

/// A fresh database holding an accepted ₹1,000 order with a pending checkout against gateway order `order_wh1`.
async fn prepare_checkout() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    let windows = OrderWindows { accept_window: Duration::days(2), payment_window: Duration::days(1) };
    let orders = OrderFlowApi::new(db.clone(), windows, "INR");
    let request = NewOrderRequest {
        freelancer_id: UserId::from("bob"),
        service_id: "logo-design".into(),
        plan_tier: "standard".into(),
        price: Decimal::from(1000),
    };
    let order = orders.create_order(&UserId::from("alice"), request).await.expect("Error creating order");
    orders.accept(&UserId::from("bob"), &order.order_id).await.expect("Error accepting order");
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_order()
        .returning(|r| Ok(GatewayOrder { id: "order_wh1".into(), amount: r.amount, currency: r.currency }));
    let settlement = SettlementApi::new(db.clone(), gateway, FeeSchedule::default(), "INR");
    settlement.initiate_payment(&UserId::from("alice"), &order.order_id).await.expect("Error starting checkout");
    db
}

fn payment_event(event: &str, amount: i64) -> Vec<u8> {
    json!({
        "entity": "event",
        "event": event,
        "contains": ["payment"],
        "payload": {
            "payment": {
                "entity": {
                    "id": "pay_wh1",
                    "entity": "payment",
                    "amount": amount,
                    "currency": "INR",
                    "order_id": "order_wh1",
                    "error_description": if event == "payment.failed" { Some("Card declined") } else { None },
                }
            }
        },
        "created_at": 1709294400
    })
    .to_string()
    .into_bytes()
}

async fn send_webhook(
    db: &SqliteDatabase,
    secret: &str,
    body: Vec<u8>,
    signature: Option<String>,
    event_id: Option<&str>,
) -> (StatusCode, String) {
    let api = SettlementApi::new(db.clone(), MockGateway::new(), FeeSchedule::default(), "INR");
    let app = App::new().configure(configure_extractors).app_data(web::Data::new(api)).service(
        web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(RAZORPAY_SIGNATURE_HEADER, Secret::new(secret.to_string())))
            .service(RazorpayWebhookRoute::<SqliteDatabase, MockGateway>::new()),
    );
    let service = test::init_service(app).await;
    let mut req = TestRequest::post().uri("/webhook/razorpay").insert_header(("Content-Type", "application/json"));
    if let Some(sig) = signature {
        req = req.insert_header((RAZORPAY_SIGNATURE_HEADER, sig));
    }
    if let Some(id) = event_id {
        req = req.insert_header((WEBHOOK_EVENT_ID_HEADER, id));
    }
    match test::try_call_service(&service, req.set_payload(body).to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = actix_web::body::MessageBody::try_into_bytes(res.into_body()).unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

async fn signed(db: &SqliteDatabase, body: Vec<u8>, event_id: Option<&str>) -> (StatusCode, String) {
    let signature = sign_webhook(WEBHOOK_SECRET, &body);
    send_webhook(db, WEBHOOK_SECRET, body, Some(signature), event_id).await
}

async fn payment_status(db: &SqliteDatabase) -> PaymentStatus {
    db.fetch_payment_by_gateway_order_id("order_wh1").await.unwrap().expect("No payment").status
}

async fn order_status(db: &SqliteDatabase) -> OrderStatusType {
    let payment = db.fetch_payment_by_gateway_order_id("order_wh1").await.unwrap().expect("No payment");
    db.fetch_order(&payment.order_id).await.unwrap().expect("No order").status
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let db = prepare_checkout().await;
    let (status, body) = send_webhook(&db, WEBHOOK_SECRET, payment_event("payment.captured", 102_520), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Invalid webhook signature");
    assert_eq!(payment_status(&db).await, PaymentStatus::Pending);
}

#[actix_web::test]
async fn forged_webhooks_are_rejected() {
    let db = prepare_checkout().await;
    let body = payment_event("payment.captured", 102_520);
    let forged = sign_webhook("not-the-secret", &body);
    let (status, _) = send_webhook(&db, WEBHOOK_SECRET, body, Some(forged), Some("evt_forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(payment_status(&db).await, PaymentStatus::Pending);
    assert!(!db.webhook_event_seen("evt_forged").await.unwrap());
}

#[actix_web::test]
async fn blank_secret_rejects_everything() {
    let db = prepare_checkout().await;
    let body = payment_event("payment.captured", 102_520);
    let signature = sign_webhook("", &body);
    let (status, _) = send_webhook(&db, "", body, Some(signature), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(payment_status(&db).await, PaymentStatus::Pending);
}

#[actix_web::test]
async fn captured_payment_activates_the_order() {
    let db = prepare_checkout().await;
    let (status, body) = signed(&db, payment_event("payment.captured", 102_520), Some("evt_1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"received": true}));
    assert_eq!(payment_status(&db).await, PaymentStatus::Completed);
    assert_eq!(order_status(&db).await, OrderStatusType::Active);
    assert!(db.webhook_event_seen("evt_1").await.unwrap());
}

#[actix_web::test]
async fn redelivered_events_are_skipped() {
    let db = prepare_checkout().await;
    let (status, _) = signed(&db, payment_event("payment.failed", 102_520), Some("evt_2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment_status(&db).await, PaymentStatus::Failed);
    // Same event id, so the body is never looked at
    let (status, body) = signed(&db, payment_event("payment.captured", 102_520), Some("evt_2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"received": true}));
    assert_eq!(payment_status(&db).await, PaymentStatus::Failed);
    assert_eq!(order_status(&db).await, OrderStatusType::Accepted);
}

#[actix_web::test]
async fn short_captures_are_flagged_not_applied() {
    let db = prepare_checkout().await;
    let (status, _) = signed(&db, payment_event("payment.captured", 100_000), Some("evt_3")).await;
    assert_eq!(status, StatusCode::OK);
    let payment = db.fetch_payment_by_gateway_order_id("order_wh1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.needs_review);
    assert_eq!(order_status(&db).await, OrderStatusType::Accepted);
}

#[actix_web::test]
async fn unknown_and_unreadable_events_are_acknowledged() {
    let db = prepare_checkout().await;
    let body = json!({"entity": "event", "event": "subscription.charged", "payload": {}}).to_string().into_bytes();
    let (status, _) = signed(&db, body, Some("evt_4")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = signed(&db, b"this is not json".to_vec(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"received": true}));
    assert_eq!(payment_status(&db).await, PaymentStatus::Pending);
}
