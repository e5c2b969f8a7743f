use actix_web::{http::StatusCode, web, web::ServiceConfig};
use gig_payment_engine::{FeeSchedule, SettlementApi};
use rust_decimal::Decimal;

use super::{
    helpers::{admin_token, get_request, json, user_token},
    mocks::{MockGateway, MockSettlementDb},
};
use crate::routes::{FeePreviewRoute, FeeSettingsRoute};

fn configure(cfg: &mut ServiceConfig) {
    let fees = FeeSchedule::new(Decimal::from(14), Decimal::from(18)).unwrap();
    let api = SettlementApi::new(MockSettlementDb::new(), MockGateway::new(), fees, "INR");
    cfg.app_data(web::Data::new(api))
        .service(FeePreviewRoute::<MockSettlementDb, MockGateway>::new())
        .service(FeeSettingsRoute::<MockSettlementDb, MockGateway>::new());
}

#[actix_web::test]
async fn fee_preview() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&user_token("alice"), "/api/fees?price=1000", configure).await;
    assert_eq!(status, StatusCode::OK);
    let fees = json(&body);
    assert_eq!(fees["commission"], "140.00");
    assert_eq!(fees["tax_on_commission"], "25.20");
    assert_eq!(fees["total"], "1025.20");
    assert_eq!(fees["freelancer_net"], "860.00");
    assert_eq!(fees["platform_retained"], "165.20");
}

#[actix_web::test]
async fn fee_preview_rounds_to_the_paisa() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&user_token("alice"), "/api/fees?price=99.99", configure).await;
    assert_eq!(status, StatusCode::OK);
    let fees = json(&body);
    // 13.9986 and 2.519748
    assert_eq!(fees["commission"], "14.00");
    assert_eq!(fees["tax_on_commission"], "2.52");
}

#[actix_web::test]
async fn fee_preview_rejects_bad_prices() {
    let _ = env_logger::try_init().ok();
    for price in ["0", "-10", "ten"] {
        let (status, _) = get_request(&user_token("alice"), &format!("/api/fees?price={price}"), configure).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "price={price}");
    }
    let (status, _) = get_request(&user_token("alice"), "/api/fees", configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fee_settings_are_for_admins() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(&user_token("alice"), "/api/admin/settings", configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = get_request(&admin_token("carol"), "/api/admin/settings", configure).await;
    assert_eq!(status, StatusCode::OK);
    let settings = json(&body);
    assert_eq!(settings["commissionRate"], "14");
    assert_eq!(settings["taxRate"], "18");
    assert_eq!(settings["currency"], "INR");
    assert_eq!(settings["example"]["total"], "1025.20");
}
