use std::str::FromStr;

use cucumber::{then, when};
use gig_payment_engine::{
    db_types::{OrderStatusType, Paise, Payment, PaymentStatus, UserId},
    order_objects::NewOrderRequest,
    payment_objects::{PaymentVerification, WebhookOutcome},
    traits::SettlementDatabase,
    SettlementError,
};
use rust_decimal::Decimal;

use crate::{
    cucumber::SettlementWorld,
    support::{checkout_signature, payment_webhook, transfer_webhook},
};

#[when(expr = "'{word}' orders '{word}' from '{word}' for {int} INR as order {word}")]
async fn place_order(world: &mut SettlementWorld, client: String, service: String, freelancer: String, price: i64, label: String) {
    let request = NewOrderRequest {
        freelancer_id: UserId::from(freelancer),
        service_id: service,
        plan_tier: "standard".into(),
        price: Decimal::from(price),
    };
    let order = world.system().orders.create_order(&UserId::from(client), request).await.expect("Error placing order");
    world.orders.insert(label, order.order_id);
}

#[when(expr = "'{word}' accepts order {word}")]
async fn accept_order(world: &mut SettlementWorld, user: String, label: String) {
    let order_id = world.order_id(&label);
    let result = world.system().orders.accept(&UserId::from(user), &order_id).await;
    world.last_error = result.err();
}

#[when(expr = "'{word}' delivers order {word}")]
async fn deliver_order(world: &mut SettlementWorld, user: String, label: String) {
    let order_id = world.order_id(&label);
    let result = world.system().orders.deliver(&UserId::from(user), &order_id).await;
    world.last_error = result.err();
}

#[when(expr = "'{word}' completes order {word}")]
async fn complete_order(world: &mut SettlementWorld, user: String, label: String) {
    let order_id = world.order_id(&label);
    let result = world.system().orders.complete(&UserId::from(user), &order_id).await;
    world.last_error = result.err();
}

#[when(expr = "'{word}' cancels order {word}")]
async fn cancel_order(world: &mut SettlementWorld, user: String, label: String) {
    let order_id = world.order_id(&label);
    let result = world.system().orders.cancel(&UserId::from(user), &order_id).await;
    world.last_error = result.err();
}

#[when(expr = "'{word}' starts checkout for order {word}")]
async fn start_checkout(world: &mut SettlementWorld, user: String, label: String) {
    let order_id = world.order_id(&label);
    match world.system().settlement.initiate_payment(&UserId::from(user), &order_id).await {
        Ok(checkout) => {
            world.checkouts.insert(label, checkout);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "'{word}' confirms payment '{word}' for order {word} with a {word} signature")]
async fn confirm_payment(world: &mut SettlementWorld, user: String, payment_id: String, label: String, kind: String) {
    let order_id = world.order_id(&label);
    let gateway_order_id = world.checkout(&label).gateway_order_id.clone();
    let gateway_signature = match kind.as_str() {
        "valid" => checkout_signature(&gateway_order_id, &payment_id),
        _ => checkout_signature(&gateway_order_id, "pay_someone_else"),
    };
    let verification = PaymentVerification { order_id, gateway_order_id, gateway_payment_id: payment_id, gateway_signature };
    let result = world.system().settlement.verify_payment(&UserId::from(user), verification).await;
    world.last_error = result.err();
}

#[when(expr = "the gateway reports '{word}' with payment '{word}' for order {word} as event '{word}'")]
async fn payment_event(world: &mut SettlementWorld, event: String, payment_id: String, label: String, event_id: String) {
    let checkout = world.checkout(&label).clone();
    let body = payment_webhook(&event, &checkout.gateway_order_id, &payment_id, checkout.amount.value());
    let outcome = world.system().settlement.process_webhook(&body, Some(&event_id)).await.expect("Webhook failed");
    world.last_outcome = Some(outcome);
}

#[when(expr = "the gateway reports '{word}' for transfer '{word}' of payment '{word}'")]
async fn transfer_event(world: &mut SettlementWorld, event: String, transfer_id: String, payment_id: String) {
    let body = transfer_webhook(&event, &transfer_id, &payment_id);
    let outcome = world.system().settlement.process_webhook(&body, None).await.expect("Webhook failed");
    world.last_outcome = Some(outcome);
}

#[when(expr = "an admin marks the payout for order {word} as done")]
async fn manual_payout(world: &mut SettlementWorld, label: String) {
    let payment = latest_payment(world, &label).await;
    let result = world.system().settlement.complete_manual_transfer(&UserId::from("admin"), payment.id).await;
    world.last_error = result.err();
}

#[then(expr = "order {word} is {word}")]
async fn check_order_status(world: &mut SettlementWorld, label: String, status: String) {
    let order_id = world.order_id(&label);
    let expected = OrderStatusType::from_str(&status).expect("Not a valid order status");
    let order = world.system().db.fetch_order(&order_id).await.expect("Error fetching order").expect("No order");
    assert_eq!(order.status, expected);
}

#[then(expr = "the checkout for order {word} is for {int} paise")]
async fn check_checkout_amount(world: &mut SettlementWorld, label: String, amount: i64) {
    assert_eq!(world.checkout(&label).amount, Paise::from(amount));
}

async fn latest_payment(world: &SettlementWorld, label: &str) -> Payment {
    let order_id = world.order_id(label);
    let payments = world.system().db.fetch_payments_for_order(&order_id).await.expect("Error fetching payments");
    payments.last().cloned().expect("No payments for order")
}

#[then(expr = "the latest payment for order {word} is {word}")]
async fn check_payment_status(world: &mut SettlementWorld, label: String, status: String) {
    let expected = PaymentStatus::from_str(&status).expect("Not a valid payment status");
    assert_eq!(latest_payment(world, &label).await.status, expected);
}

#[then(expr = "order {word} has {int} payments")]
async fn check_payment_count(world: &mut SettlementWorld, label: String, count: usize) {
    let order_id = world.order_id(&label);
    let payments = world.system().db.fetch_payments_for_order(&order_id).await.expect("Error fetching payments");
    assert_eq!(payments.len(), count);
}

#[then(expr = "the latest payment for order {word} has a platform fee of {int} paise and a freelancer share of {int} paise")]
async fn check_fee_split(world: &mut SettlementWorld, label: String, fee: i64, share: i64) {
    let payment = latest_payment(world, &label).await;
    assert_eq!(payment.platform_fee, Paise::from(fee));
    assert_eq!(payment.freelancer_amount, Paise::from(share));
}

#[then(expr = "the payout for order {word} is {word}")]
async fn check_payout(world: &mut SettlementWorld, label: String, state: String) {
    let payment = latest_payment(world, &label).await;
    match state.as_str() {
        "done" => assert!(payment.transferred_to_freelancer && !payment.manual_transfer_pending, "{payment:?}"),
        "manual" => assert!(payment.manual_transfer_pending && !payment.transferred_to_freelancer, "{payment:?}"),
        _ => panic!("Unknown payout state {state}"),
    }
}

#[then(expr = "the webhook was {word}")]
async fn check_outcome(world: &mut SettlementWorld, outcome: String) {
    let actual = world.last_outcome.clone().expect("No webhook has been processed");
    match outcome.as_str() {
        "applied" => assert_eq!(actual, WebhookOutcome::Applied),
        "a-duplicate" => assert_eq!(actual, WebhookOutcome::Duplicate),
        "already-applied" => assert_eq!(actual, WebhookOutcome::AlreadyApplied),
        "ignored" => assert!(matches!(actual, WebhookOutcome::Ignored(_)), "{actual:?}"),
        _ => panic!("Unknown outcome {outcome}"),
    }
}

#[then(expr = "the last request succeeded")]
async fn check_success(world: &mut SettlementWorld) {
    assert!(world.last_error.is_none(), "{:?}", world.last_error);
}

#[then(expr = "the last request failed with {string}")]
async fn check_failure(world: &mut SettlementWorld, kind: String) {
    let err = world.last_error.clone().expect("The last request succeeded");
    let matched = match kind.as_str() {
        "signature mismatch" => matches!(err, SettlementError::SignatureMismatch),
        "not authorized" => matches!(err, SettlementError::NotAuthorized(_)),
        "invalid order state" => matches!(err, SettlementError::InvalidOrderState { .. }),
        "invalid request" => matches!(err, SettlementError::InvalidRequest(_)),
        _ => panic!("Unknown failure kind {kind}"),
    };
    assert!(matched, "Expected {kind}, got {err:?}");
}
