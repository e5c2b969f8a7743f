//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Database and gateway calls are all `async`, so keep it that way.
//!
//! Routes under `/api` sit behind the JWT middleware, so every handler there can take [`JwtClaims`]. Whether the
//! caller acts as the client or the freelancer is decided per order by the engine. Only `admin` is a real role.
use std::str::FromStr;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use gig_payment_engine::{
    db_types::{OrderId, Role},
    order_objects::NewOrderRequest,
    payment_objects::{PaymentVerification, WebhookOutcome},
    traits::{PaymentGateway, SettlementDatabase},
    OrderFlowApi,
    SettlementApi,
};
use log::*;
use rust_decimal::Decimal;

use crate::{
    auth::JwtClaims,
    data_objects::{FeeQuery, InitiatePaymentRequest, SuccessResponse, WebhookAck},
    errors::ServerError,
};

pub const WEBHOOK_EVENT_ID_HEADER: &str = "x-razorpay-event-id";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Fees  ----------------------------------------------------
route!(fee_preview => Get "/fees" impl SettlementDatabase, PaymentGateway where requires [Role::User]);
/// The fee breakdown for a price, so the checkout page can show the client what they will pay.
pub async fn fee_preview<B, G>(
    query: web::Query<FeeQuery>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let price = Decimal::from_str(query.price.trim())
        .map_err(|e| ServerError::InvalidAmount(format!("{} is not a valid price. {e}", query.price)))?;
    trace!("💻️ Fee preview for {price}");
    let breakdown = api.fee_breakdown(price)?;
    Ok(HttpResponse::Ok().json(breakdown))
}

route!(fee_settings => Get "/admin/settings" impl SettlementDatabase, PaymentGateway where requires [Role::Admin]);
pub async fn fee_settings<B, G>(api: web::Data<SettlementApi<B, G>>) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let settings = api.fee_settings()?;
    Ok(HttpResponse::Ok().json(settings))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl SettlementDatabase where requires [Role::User]);
pub async fn create_order<B: SettlementDatabase>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new order from {}", claims.sub);
    let order = api.create_order(claims.user_id(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl SettlementDatabase where requires [Role::User]);
pub async fn my_orders<B: SettlementDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", claims.sub);
    let orders = api.orders_for_user(claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl SettlementDatabase where requires [Role::User]);
pub async fn order_by_id<B: SettlementDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order [{order_id}] for {}", claims.sub);
    let order = api.fetch_order(claims.user_id(), claims.is_admin(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(accept_order => Post "/orders/{order_id}/accept" impl SettlementDatabase where requires [Role::User]);
pub async fn accept_order<B: SettlementDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ {} is accepting [{order_id}]", claims.sub);
    let order = api.accept(claims.user_id(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(deliver_order => Post "/orders/{order_id}/deliver" impl SettlementDatabase where requires [Role::User]);
pub async fn deliver_order<B: SettlementDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ {} is delivering [{order_id}]", claims.sub);
    let order = api.deliver(claims.user_id(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(complete_order => Post "/orders/{order_id}/complete" impl SettlementDatabase where requires [Role::User]);
pub async fn complete_order<B: SettlementDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ {} is signing off [{order_id}]", claims.sub);
    let order = api.complete(claims.user_id(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl SettlementDatabase where requires [Role::User]);
pub async fn cancel_order<B: SettlementDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ {} is cancelling [{order_id}]", claims.sub);
    let order = api.cancel(claims.user_id(), &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(initiate_payment => Post "/payments/initiate" impl SettlementDatabase, PaymentGateway where requires [Role::User]);
/// Starts a checkout. The response carries what the client needs to open the gateway's hosted checkout.
pub async fn initiate_payment<B, G>(
    claims: JwtClaims,
    body: web::Json<InitiatePaymentRequest>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let order_id = body.into_inner().order_id;
    debug!("💻️ {} is starting checkout for [{order_id}]", claims.sub);
    let checkout = api.initiate_payment(claims.user_id(), &order_id).await?;
    Ok(HttpResponse::Ok().json(checkout))
}

route!(verify_payment => Post "/payments/verify" impl SettlementDatabase, PaymentGateway where requires [Role::User]);
/// Confirms a checkout with the signed result the gateway gave the client.
pub async fn verify_payment<B, G>(
    claims: JwtClaims,
    body: web::Json<PaymentVerification>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let verification = body.into_inner();
    debug!("💻️ {} is confirming payment for [{}]", claims.sub, verification.order_id);
    api.verify_payment(claims.user_id(), verification).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse { success: true }))
}

route!(order_payments => Get "/orders/{order_id}/payments" impl SettlementDatabase, PaymentGateway where requires [Role::User]);
pub async fn order_payments<B, G>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    debug!("💻️ GET payments for [{order_id}] for {}", claims.sub);
    let payments = api.payments_for_order(claims.user_id(), claims.is_admin(), &order_id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(manual_transfers => Get "/admin/payments/manual_transfers" impl SettlementDatabase, PaymentGateway where requires [Role::Admin]);
/// Completed payments whose payout failed and that someone needs to pay out by hand.
pub async fn manual_transfers<B, G>(api: web::Data<SettlementApi<B, G>>) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let payments = api.payments_awaiting_transfer().await?;
    Ok(HttpResponse::Ok().json(payments))
}

route!(mark_transferred => Post "/admin/payments/{id}/transferred" impl SettlementDatabase, PaymentGateway where requires [Role::Admin]);
pub async fn mark_transferred<B, G>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let id = path.into_inner();
    let payment = api.complete_manual_transfer(claims.user_id(), id).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(razorpay_webhook => Post "/razorpay" impl SettlementDatabase, PaymentGateway);
/// Razorpay webhook deliveries. This route MUST sit behind the HMAC middleware, which has already checked the body.
///
/// Everything authentic is acknowledged, including events we ignore, so that the gateway stops redelivering them.
/// Only errors worth retrying (the database) get a 5xx.
pub async fn razorpay_webhook<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<SettlementApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    let event_id = req.headers().get(WEBHOOK_EVENT_ID_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);
    trace!("💻️ Received webhook {}", event_id.as_deref().unwrap_or("without an event id"));
    match api.process_webhook(body.as_ref(), event_id.as_deref()).await {
        Ok(WebhookOutcome::Ignored(reason)) => info!("💻️ Webhook acknowledged but ignored. {reason}"),
        Ok(outcome) => debug!("💻️ Webhook processed: {outcome:?}"),
        Err(e) if e.is_retry_worthy() => {
            error!("💻️ Could not process webhook. The gateway will retry. {e}");
            return Err(ServerError::BackendError(e.to_string()));
        },
        Err(e) => warn!("💻️ Webhook could not be applied and will not be retried. {e}"),
    }
    Ok(HttpResponse::Ok().json(WebhookAck { received: true }))
}
