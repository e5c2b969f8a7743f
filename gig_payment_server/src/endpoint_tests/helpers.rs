use std::time::Duration;

use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use gig_payment_engine::db_types::{Order, OrderId, OrderStatusType, Paise, Payment, PaymentStatus, Role, UserId};
use log::debug;
use serde_json::Value;

use crate::{
    auth::{TokenIssuer, TokenVerifier},
    config::AuthConfig,
    middleware::JwtMiddlewareFactory,
    server::configure_extractors,
};

// DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("4f0b7c3e6d2a49e1b8f5c7a0d3e6f9a2", "authenticated")
}

pub fn issue_token(user: &str, roles: Vec<Role>) -> String {
    TokenIssuer::new(&get_auth_config())
        .issue_token(&UserId::from(user), roles, Some(Duration::from_secs(600)))
        .expect("Failed to sign token")
}

pub fn user_token(user: &str) -> String {
    issue_token(user, vec![Role::User])
}

pub fn admin_token(user: &str) -> String {
    issue_token(user, vec![Role::User, Role::Admin])
}

/// Makes a request to the `/api` scope, behind the JWT middleware. An empty token sends no `Authorization` header.
pub async fn api_request<F>(req: TestRequest, token: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = if token.is_empty() { req } else { req.insert_header(("Authorization", format!("Bearer {token}"))) };
    let verifier = TokenVerifier::new(&get_auth_config());
    let app = App::new()
        .configure(configure_extractors)
        .service(web::scope("/api").wrap(JwtMiddlewareFactory::new(verifier)).configure(configure));
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        // Errors raised in middleware are only turned into responses by the HTTP dispatcher
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub async fn get_request<F>(token: &str, path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    api_request(TestRequest::get().uri(path), token, configure).await
}

pub async fn post_request<F>(token: &str, path: &str, body: Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    api_request(TestRequest::post().uri(path).set_json(body), token, configure).await
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("Response was not JSON")
}

/// A ₹1,000 order from alice to bob, created on 1 March 2024.
pub fn order(status: OrderStatusType) -> Order {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    Order {
        id: 1,
        order_id: OrderId::from("ord_0000000000000001".to_string()),
        client_id: UserId::from("alice"),
        freelancer_id: UserId::from("bob"),
        service_id: "logo-design".into(),
        plan_tier: "standard".into(),
        price: Paise::from(100_000),
        currency: "INR".into(),
        status,
        accept_deadline: created + chrono::Duration::hours(48),
        payment_deadline: None,
        created_at: created,
        updated_at: created,
    }
}

/// An accepted order that can still be paid for.
pub fn payable_order() -> Order {
    Order { payment_deadline: Some(Utc::now() + chrono::Duration::hours(24)), ..order(OrderStatusType::Accepted) }
}

pub fn payment(status: PaymentStatus) -> Payment {
    let created = Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap();
    Payment {
        id: 7,
        order_id: OrderId::from("ord_0000000000000001".to_string()),
        amount: Paise::from(102_520),
        platform_fee: Paise::from(16_520),
        freelancer_amount: Paise::from(86_000),
        currency: "INR".into(),
        gateway_order_id: "order_Nx1".into(),
        gateway_payment_id: None,
        status,
        manual_transfer_pending: false,
        transferred_to_freelancer: false,
        needs_review: false,
        created_at: created,
        updated_at: created,
    }
}
