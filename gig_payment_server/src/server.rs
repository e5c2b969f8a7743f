use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gig_payment_engine::{OrderFlowApi, SettlementApi, SqliteDatabase};
use log::*;

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    integrations::RazorpayGateway,
    middleware::{HmacMiddlewareFactory, JwtMiddlewareFactory},
    routes::{
        health,
        AcceptOrderRoute,
        CancelOrderRoute,
        CompleteOrderRoute,
        CreateOrderRoute,
        DeliverOrderRoute,
        FeePreviewRoute,
        FeeSettingsRoute,
        InitiatePaymentRoute,
        ManualTransfersRoute,
        MarkTransferredRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderPaymentsRoute,
        RazorpayWebhookRoute,
        VerifyPaymentRoute,
    },
};

pub const RAZORPAY_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";
const ACCESS_LOG_FORMAT: &str = "%t (%D ms) %s %a %{Host}i %U";
// %{r}a reads the client address from the proxy headers
const ACCESS_LOG_FORWARDED_FORMAT: &str = "%t (%D ms) %s %{r}a %{Host}i %U";

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        RazorpayGateway::new(config.razorpay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RazorpayGateway,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), config.order_windows, &config.currency);
        let settlement_api = SettlementApi::new(db.clone(), gateway.clone(), config.fees, &config.currency);
        let verifier = TokenVerifier::new(&config.auth);
        let log_format = if config.use_x_forwarded_for { ACCESS_LOG_FORWARDED_FORMAT } else { ACCESS_LOG_FORMAT };
        let app = App::new()
            .wrap(Logger::new(log_format).log_target("gig::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(settlement_api))
            .configure(configure_extractors);
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(JwtMiddlewareFactory::new(verifier))
            .service(FeePreviewRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderPaymentsRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(AcceptOrderRoute::<SqliteDatabase>::new())
            .service(DeliverOrderRoute::<SqliteDatabase>::new())
            .service(CompleteOrderRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(InitiatePaymentRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(ManualTransfersRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(MarkTransferredRoute::<SqliteDatabase, RazorpayGateway>::new())
            .service(FeeSettingsRoute::<SqliteDatabase, RazorpayGateway>::new());
        let webhook_scope = web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(RAZORPAY_SIGNATURE_HEADER, config.webhook_secret.clone()))
            .service(RazorpayWebhookRoute::<SqliteDatabase, RazorpayGateway>::new());
        app.service(health).service(auth_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed bodies, queries and paths get the same `{ "error": ... }` responses as everything else.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Rejected request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    }))
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default().error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
    );
}
