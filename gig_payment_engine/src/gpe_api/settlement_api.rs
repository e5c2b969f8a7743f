use std::{collections::HashMap, fmt::Debug};

use chrono::Utc;
use log::*;
use rust_decimal::Decimal;

use crate::{
    db_types::{NewPayment, Order, OrderId, OrderStatusType, Payment, PaymentStatus, UserId},
    fees::{FeeBreakdown, FeeSchedule},
    gpe_api::{
        errors::SettlementError,
        payment_objects::{FeeSettings, PaymentInitiated, PaymentVerification, WebhookOutcome},
        webhook_objects::{WebhookEnvelope, WebhookEventType},
    },
    traits::{GatewayOrderRequest, PaymentCompletion, PaymentGateway, PaymentGatewayError, SettlementDatabase},
};

/// The price used for the worked example in [`SettlementApi::fee_settings`].
const EXAMPLE_PRICE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// `SettlementApi` moves money for orders: it starts checkouts, confirms them, and applies the gateway's webhooks.
///
/// Two independent paths can confirm a payment: the client reporting a signed checkout result
/// ([`Self::verify_payment`]), and the gateway's `payment.captured` webhook ([`Self::process_webhook`]). Whichever
/// arrives second is a no-op.
pub struct SettlementApi<B, G> {
    db: B,
    gateway: G,
    fees: FeeSchedule,
    currency: String,
}

impl<B, G> Debug for SettlementApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi ({:?})", self.fees)
    }
}

impl<B, G> SettlementApi<B, G> {
    pub fn new(db: B, gateway: G, fees: FeeSchedule, currency: &str) -> Self {
        Self { db, gateway, fees, currency: currency.to_string() }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn fee_schedule(&self) -> &FeeSchedule {
        &self.fees
    }

    /// The fee breakdown for a price in major units. Used to show the client what they will pay.
    pub fn fee_breakdown(&self, price: Decimal) -> Result<FeeBreakdown, SettlementError> {
        Ok(self.fees.calculate(price)?)
    }

    pub fn fee_settings(&self) -> Result<FeeSettings, SettlementError> {
        let example = self.fees.calculate(EXAMPLE_PRICE)?;
        Ok(FeeSettings {
            commission_rate: self.fees.commission_rate(),
            tax_rate: self.fees.tax_rate(),
            currency: self.currency.clone(),
            example,
        })
    }
}

impl<B, G> SettlementApi<B, G>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    /// Creates a gateway order for the full amount due on `order_id`, and records a `Pending` payment against it.
    ///
    /// Only the order's client may do this, and only while the order is `Accepted` and inside its payment window.
    /// Each call creates a new gateway order, so a client can retry after a failed or abandoned checkout.
    pub async fn initiate_payment(&self, caller: &UserId, order_id: &OrderId) -> Result<PaymentInitiated, SettlementError> {
        let order = self.fetch_order(order_id).await?;
        if &order.client_id != caller {
            return Err(SettlementError::NotAuthorized("Only the client can pay for an order".into()));
        }
        let status = order.effective_status(Utc::now());
        if status != OrderStatusType::Accepted {
            return Err(SettlementError::InvalidOrderState { order_id: order_id.clone(), status });
        }
        let fees = self.fees.calculate_for(order.price)?;
        let amount = fees.total_minor_units()?;
        let request = GatewayOrderRequest {
            amount,
            currency: order.currency.clone(),
            receipt: order.order_id.to_string(),
            notes: checkout_notes(&order),
        };
        let gateway_order = self.gateway.create_order(request).await.map_err(|e| {
            warn!("💳️ Could not create a gateway order for [{order_id}]. {e}");
            e
        })?;
        if gateway_order.amount != amount {
            error!(
                "💳️ Gateway order {} is for {}, but {amount} was requested for [{order_id}]",
                gateway_order.id, gateway_order.amount
            );
            return Err(PaymentGatewayError::InvalidResponse("Amount mismatch".into()).into());
        }
        let payment = NewPayment {
            order_id: order.order_id.clone(),
            amount,
            platform_fee: fees.platform_retained_minor_units()?,
            freelancer_amount: fees.freelancer_net_minor_units()?,
            currency: order.currency.clone(),
            gateway_order_id: gateway_order.id.clone(),
        };
        let payment = self.db.insert_payment(payment).await?;
        info!(
            "💳️ Checkout started for [{order_id}]. Payment #{} / gateway order {} for {} {}",
            payment.id, payment.gateway_order_id, payment.amount, payment.currency
        );
        Ok(PaymentInitiated { gateway_order_id: gateway_order.id, amount, currency: order.currency })
    }

    /// Confirms a checkout from the signed result the gateway handed to the client.
    ///
    /// The signature is checked before anything else is looked at. If it does not match, nothing is changed.
    /// Confirming a payment that has already been completed (e.g. by the webhook) succeeds without side effects.
    pub async fn verify_payment(
        &self,
        caller: &UserId,
        verification: PaymentVerification,
    ) -> Result<PaymentCompletion, SettlementError> {
        let PaymentVerification { order_id, gateway_order_id, gateway_payment_id, gateway_signature } = verification;
        if let Err(e) =
            self.gateway.verify_payment_signature(&gateway_order_id, &gateway_payment_id, &gateway_signature)
        {
            warn!(
                "🔐️ Checkout signature rejected for order [{order_id}], gateway order {gateway_order_id}, payment \
                 {gateway_payment_id}, reported by {caller}. {e}"
            );
            return Err(SettlementError::SignatureMismatch);
        }
        let order = self.fetch_order(&order_id).await?;
        if &order.client_id != caller {
            return Err(SettlementError::NotAuthorized("Only the client can confirm a payment".into()));
        }
        let payment = self
            .db
            .fetch_payment_by_gateway_order_id(&gateway_order_id)
            .await?
            .filter(|p| p.order_id == order_id)
            .ok_or_else(|| SettlementError::PaymentNotFound(gateway_order_id.clone()))?;
        let completion = self.db.complete_payment(&payment.gateway_order_id, &gateway_payment_id).await?;
        if completion.newly_completed {
            info!("💳️ Payment #{} for [{order_id}] confirmed by the client", completion.payment.id);
        } else if completion.payment.status == PaymentStatus::Completed {
            debug!("💳️ Payment #{} for [{order_id}] was already confirmed", completion.payment.id);
        } else {
            return Err(SettlementError::InvalidRequest(format!(
                "Payment #{} is {} and cannot be confirmed",
                completion.payment.id, completion.payment.status
            )));
        }
        Ok(completion)
    }

    /// Applies a gateway webhook. The body's signature must already have been checked.
    ///
    /// If the gateway supplied an event id, deliveries already in the ledger are acknowledged without being
    /// processed. The id is only recorded once the event has been applied, so a failure here gets redelivered.
    /// Payloads that cannot be parsed, and events we don't handle, are acknowledged and logged.
    pub async fn process_webhook(&self, body: &[u8], event_id: Option<&str>) -> Result<WebhookOutcome, SettlementError> {
        if let Some(id) = event_id {
            if self.db.webhook_event_seen(id).await? {
                info!("🪝️ Webhook event {id} has already been processed. Skipping.");
                return Ok(WebhookOutcome::Duplicate);
            }
        }
        let envelope = match serde_json::from_slice::<WebhookEnvelope>(body) {
            Ok(e) => e,
            Err(e) => {
                warn!("🪝️ Authentic webhook with an unreadable payload. {e}");
                return Ok(WebhookOutcome::Ignored(format!("Unreadable payload. {e}")));
            },
        };
        let outcome = self.apply_event(&envelope).await?;
        debug!("🪝️ {} webhook: {outcome:?}", envelope.event);
        if let Some(id) = event_id {
            self.db.record_webhook_event(id, &envelope.event).await?;
        }
        Ok(outcome)
    }

    async fn apply_event(&self, envelope: &WebhookEnvelope) -> Result<WebhookOutcome, SettlementError> {
        let payload = &envelope.payload;
        match envelope.event_type() {
            WebhookEventType::PaymentAuthorized | WebhookEventType::PaymentCaptured => {
                let Some(entity) = payload.payment.as_ref().map(|w| &w.entity) else {
                    return Ok(ignore("No payment entity in the payload"));
                };
                let Some(payment) = self.payment_for_gateway_order(entity.order_id.as_deref()).await? else {
                    return Ok(ignore(&format!("Payment {} is not linked to any of our orders", entity.id)));
                };
                let currency_matches =
                    entity.currency.as_ref().map(|c| c.eq_ignore_ascii_case(&payment.currency)).unwrap_or(true);
                if entity.amount != payment.amount.value() || !currency_matches {
                    error!(
                        "🪝️ Payment {} captured {} (minor units) but payment #{} expects {} {}. Flagged for review.",
                        entity.id,
                        entity.amount,
                        payment.id,
                        payment.amount.value(),
                        payment.currency
                    );
                    self.db.flag_payment_for_review(payment.id).await?;
                    return Ok(WebhookOutcome::Ignored("Amount mismatch".into()));
                }
                let completion = self.db.complete_payment(&payment.gateway_order_id, &entity.id).await?;
                if completion.newly_completed {
                    info!("🪝️ Payment #{} for [{}] completed by webhook", payment.id, payment.order_id);
                    Ok(WebhookOutcome::Applied)
                } else {
                    Ok(WebhookOutcome::AlreadyApplied)
                }
            },
            WebhookEventType::PaymentFailed => {
                let Some(entity) = payload.payment.as_ref().map(|w| &w.entity) else {
                    return Ok(ignore("No payment entity in the payload"));
                };
                let Some(payment) = self.payment_for_gateway_order(entity.order_id.as_deref()).await? else {
                    return Ok(ignore(&format!("Payment {} is not linked to any of our orders", entity.id)));
                };
                let reason = entity.error_description.as_deref().unwrap_or("no reason given");
                match self.db.fail_payment(payment.id, Some(entity.id.clone())).await? {
                    Some(_) => {
                        info!("🪝️ Payment #{} for [{}] failed: {reason}", payment.id, payment.order_id);
                        Ok(WebhookOutcome::Applied)
                    },
                    None => Ok(WebhookOutcome::AlreadyApplied),
                }
            },
            WebhookEventType::TransferProcessed => {
                let Some(entity) = payload.transfer.as_ref().map(|w| &w.entity) else {
                    return Ok(ignore("No transfer entity in the payload"));
                };
                let Some(payment) = self.payment_for_gateway_payment(entity.source.as_deref()).await? else {
                    return Ok(ignore(&format!("Transfer {} is not linked to any of our payments", entity.id)));
                };
                match self.db.mark_payment_transferred(payment.id).await? {
                    Some(_) => {
                        info!("🪝️ Payout {} for payment #{} processed", entity.id, payment.id);
                        Ok(WebhookOutcome::Applied)
                    },
                    None => Ok(WebhookOutcome::AlreadyApplied),
                }
            },
            WebhookEventType::TransferFailed => {
                let Some(entity) = payload.transfer.as_ref().map(|w| &w.entity) else {
                    return Ok(ignore("No transfer entity in the payload"));
                };
                let Some(payment) = self.payment_for_gateway_payment(entity.source.as_deref()).await? else {
                    return Ok(ignore(&format!("Transfer {} is not linked to any of our payments", entity.id)));
                };
                match self.db.flag_manual_transfer(payment.id).await? {
                    Some(_) => {
                        warn!("🪝️ Payout {} for payment #{} failed. Flagged for a manual transfer.", entity.id, payment.id);
                        Ok(WebhookOutcome::Applied)
                    },
                    None => Ok(WebhookOutcome::AlreadyApplied),
                }
            },
            WebhookEventType::RefundProcessed => {
                let Some(entity) = payload.refund.as_ref().map(|w| &w.entity) else {
                    return Ok(ignore("No refund entity in the payload"));
                };
                let Some(payment) = self.payment_for_gateway_payment(Some(entity.payment_id.as_str())).await? else {
                    return Ok(ignore(&format!("Refund {} is not linked to any of our payments", entity.id)));
                };
                match self.db.refund_payment(payment.id).await? {
                    Some(_) => {
                        info!("🪝️ Payment #{} for [{}] refunded ({})", payment.id, payment.order_id, entity.id);
                        Ok(WebhookOutcome::Applied)
                    },
                    None => Ok(WebhookOutcome::AlreadyApplied),
                }
            },
            WebhookEventType::RefundFailed => {
                let Some(entity) = payload.refund.as_ref().map(|w| &w.entity) else {
                    return Ok(ignore("No refund entity in the payload"));
                };
                let Some(payment) = self.payment_for_gateway_payment(Some(entity.payment_id.as_str())).await? else {
                    return Ok(ignore(&format!("Refund {} is not linked to any of our payments", entity.id)));
                };
                match self.db.flag_payment_for_review(payment.id).await? {
                    Some(_) => {
                        error!("🪝️ Refund {} for payment #{} failed. Flagged for review.", entity.id, payment.id);
                        Ok(WebhookOutcome::Applied)
                    },
                    None => Ok(WebhookOutcome::AlreadyApplied),
                }
            },
            WebhookEventType::Unknown(event) => Ok(ignore(&format!("Unhandled event type {event}"))),
        }
    }

    /// Payments for an order, for one of its parties or an admin.
    pub async fn payments_for_order(
        &self,
        caller: &UserId,
        is_admin: bool,
        order_id: &OrderId,
    ) -> Result<Vec<Payment>, SettlementError> {
        let order = self.fetch_order(order_id).await?;
        if !is_admin && !order.is_party(caller) {
            return Err(SettlementError::NotAuthorized(format!("{caller} is not a party to order {order_id}")));
        }
        Ok(self.db.fetch_payments_for_order(order_id).await?)
    }

    pub async fn payments_awaiting_transfer(&self) -> Result<Vec<Payment>, SettlementError> {
        Ok(self.db.fetch_payments_awaiting_transfer().await?)
    }

    /// Records that an admin has paid the freelancer by hand.
    pub async fn complete_manual_transfer(&self, admin: &UserId, payment_id: i64) -> Result<Payment, SettlementError> {
        let payment = self
            .db
            .fetch_payment(payment_id)
            .await?
            .ok_or_else(|| SettlementError::PaymentNotFound(format!("#{payment_id}")))?;
        match self.db.complete_manual_transfer(payment.id).await? {
            Some(p) => {
                info!("💳️ {admin} marked the payout for payment #{payment_id} as done");
                Ok(p)
            },
            None => Err(SettlementError::InvalidRequest(format!(
                "Payment #{payment_id} is not waiting for a manual transfer"
            ))),
        }
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, SettlementError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| SettlementError::OrderNotFound(order_id.clone()))
    }

    async fn payment_for_gateway_order(&self, gateway_order_id: Option<&str>) -> Result<Option<Payment>, SettlementError> {
        match gateway_order_id {
            Some(id) => Ok(self.db.fetch_payment_by_gateway_order_id(id).await?),
            None => Ok(None),
        }
    }

    async fn payment_for_gateway_payment(
        &self,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<Payment>, SettlementError> {
        match gateway_payment_id {
            Some(id) => Ok(self.db.fetch_payment_by_gateway_payment_id(id).await?),
            None => Ok(None),
        }
    }
}

fn checkout_notes(order: &Order) -> HashMap<String, String> {
    [
        ("order_id", order.order_id.to_string()),
        ("client_id", order.client_id.to_string()),
        ("freelancer_id", order.freelancer_id.to_string()),
        ("plan_tier", order.plan_tier.clone()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn ignore(reason: &str) -> WebhookOutcome {
    info!("🪝️ Webhook acknowledged without changes. {reason}");
    WebhookOutcome::Ignored(reason.to_string())
}
