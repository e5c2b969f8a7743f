use actix_web::{http::StatusCode, web, web::ServiceConfig};
use gig_payment_engine::{
    db_types::{Payment, PaymentStatus},
    helpers::SignatureError,
    traits::{GatewayOrder, PaymentCompletion, PaymentGatewayError},
    FeeSchedule,
    SettlementApi,
};
use serde_json::json;

use super::{
    helpers::{admin_token, get_request, json, order, payable_order, payment, post_request, user_token},
    mocks::{MockGateway, MockSettlementDb},
};
use crate::routes::{
    InitiatePaymentRoute,
    ManualTransfersRoute,
    MarkTransferredRoute,
    OrderPaymentsRoute,
    VerifyPaymentRoute,
};

fn configure_with(db: MockSettlementDb, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = SettlementApi::new(db, gateway, FeeSchedule::default(), "INR");
        cfg.app_data(web::Data::new(api))
            .service(InitiatePaymentRoute::<MockSettlementDb, MockGateway>::new())
            .service(VerifyPaymentRoute::<MockSettlementDb, MockGateway>::new())
            .service(OrderPaymentsRoute::<MockSettlementDb, MockGateway>::new())
            .service(ManualTransfersRoute::<MockSettlementDb, MockGateway>::new())
            .service(MarkTransferredRoute::<MockSettlementDb, MockGateway>::new());
    }
}

fn verification(signature: &str) -> serde_json::Value {
    json!({
        "orderId": "ord_0000000000000001",
        "gatewayOrderId": "order_Nx1",
        "gatewayPaymentId": "pay_Ny2",
        "gatewaySignature": signature,
    })
}

#[actix_web::test]
async fn initiate_payment() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(Some(payable_order())));
    db.expect_insert_payment()
        .withf(|p| {
            p.amount.value() == 102_520 &&
                p.platform_fee.value() == 16_520 &&
                p.freelancer_amount.value() == 86_000 &&
                p.gateway_order_id == "order_Nx1"
        })
        .times(1)
        .returning(|_| Ok(payment(PaymentStatus::Pending)));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_order()
        .withf(|r| r.amount.value() == 102_520 && r.currency == "INR" && r.receipt == "ord_0000000000000001")
        .times(1)
        .returning(|r| Ok(GatewayOrder { id: "order_Nx1".into(), amount: r.amount, currency: r.currency }));
    let (status, body) = post_request(
        &user_token("alice"),
        "/api/payments/initiate",
        json!({"orderId": "ord_0000000000000001"}),
        configure_with(db, gateway),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"gatewayOrderId": "order_Nx1", "amount": 102520, "currency": "INR"}));
}

#[actix_web::test]
async fn only_the_client_can_pay() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(payable_order())));
    db.expect_insert_payment().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().never();
    let (status, _) = post_request(
        &user_token("bob"),
        "/api/payments/initiate",
        json!({"orderId": "ord_0000000000000001"}),
        configure_with(db, gateway),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn cannot_pay_before_acceptance() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(gig_payment_engine::db_types::OrderStatusType::Pending))));
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().never();
    let (status, body) = post_request(
        &user_token("alice"),
        "/api/payments/initiate",
        json!({"orderId": "ord_0000000000000001"}),
        configure_with(db, gateway),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json(&body)["error"].as_str().unwrap().contains("is Expired"));
}

#[actix_web::test]
async fn gateway_is_down() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(payable_order())));
    db.expect_insert_payment().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().times(1).returning(|_| Err(PaymentGatewayError::Unreachable("timed out".into())));
    let (status, body) = post_request(
        &user_token("alice"),
        "/api/payments/initiate",
        json!({"orderId": "ord_0000000000000001"}),
        configure_with(db, gateway),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json(&body)["error"].as_str().unwrap().contains("timed out"));
}

#[actix_web::test]
async fn verify_payment() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(payable_order())));
    db.expect_fetch_payment_by_gateway_order_id()
        .withf(|id| id == "order_Nx1")
        .returning(|_| Ok(Some(payment(PaymentStatus::Pending))));
    db.expect_complete_payment().withf(|o, p| o == "order_Nx1" && p == "pay_Ny2").times(1).returning(|_, p| {
        let payment = Payment {
            gateway_payment_id: Some(p.to_string()),
            ..payment(PaymentStatus::Completed)
        };
        Ok(PaymentCompletion { payment, order: None, newly_completed: true })
    });
    let mut gateway = MockGateway::new();
    gateway.expect_verify_payment_signature().times(1).returning(|_, _, _| Ok(()));
    let (status, body) = post_request(
        &user_token("alice"),
        "/api/payments/verify",
        verification("9a1c0d"),
        configure_with(db, gateway),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"success": true}));
}

#[actix_web::test]
async fn forged_signature_changes_nothing() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().never();
    db.expect_fetch_payment_by_gateway_order_id().never();
    db.expect_complete_payment().never();
    let mut gateway = MockGateway::new();
    gateway.expect_verify_payment_signature().times(1).returning(|_, _, _| Err(SignatureError::Mismatch));
    let (status, body) = post_request(
        &user_token("alice"),
        "/api/payments/verify",
        verification("deadbeef"),
        configure_with(db, gateway),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Payment signature verification failed");
}

#[actix_web::test]
async fn payments_for_an_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(payable_order())));
    db.expect_fetch_payments_for_order()
        .returning(|_| Ok(vec![payment(PaymentStatus::Failed), payment(PaymentStatus::Completed)]));
    let (status, body) = get_request(
        &user_token("bob"),
        "/api/orders/ord_0000000000000001/payments",
        configure_with(db, MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payments = json(&body);
    assert_eq!(payments[0]["status"], "Failed");
    assert_eq!(payments[1]["freelancer_amount"], 86_000);
}

#[actix_web::test]
async fn manual_transfers_are_for_admins() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_payments_awaiting_transfer().never();
    let (status, _) = get_request(
        &user_token("alice"),
        "/api/admin/payments/manual_transfers",
        configure_with(db, MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut db = MockSettlementDb::new();
    db.expect_fetch_payments_awaiting_transfer().times(1).returning(|| {
        Ok(vec![Payment { manual_transfer_pending: true, ..payment(PaymentStatus::Completed) }])
    });
    let (status, body) = get_request(
        &admin_token("carol"),
        "/api/admin/payments/manual_transfers",
        configure_with(db, MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)[0]["manual_transfer_pending"], true);
}

#[actix_web::test]
async fn mark_transferred() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_payment()
        .withf(|id| *id == 7)
        .returning(|_| Ok(Some(Payment { manual_transfer_pending: true, ..payment(PaymentStatus::Completed) })));
    db.expect_complete_manual_transfer().times(1).returning(|_| {
        Ok(Some(Payment { transferred_to_freelancer: true, ..payment(PaymentStatus::Completed) }))
    });
    let (status, body) = post_request(
        &admin_token("carol"),
        "/api/admin/payments/7/transferred",
        json!({}),
        configure_with(db, MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["transferred_to_freelancer"], true);
}

#[actix_web::test]
async fn mark_transferred_twice() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_payment().returning(|_| Ok(Some(payment(PaymentStatus::Completed))));
    db.expect_complete_manual_transfer().returning(|_| Ok(None));
    let (status, body) = post_request(
        &admin_token("carol"),
        "/api/admin/payments/7/transferred",
        json!({}),
        configure_with(db, MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("is not waiting for a manual transfer"));
}
