use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, OrderId, Payment},
    traits::SettlementDatabaseError,
};

pub async fn insert_payment(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, SettlementDatabaseError> {
    let gateway_order_id = payment.gateway_order_id.clone();
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, amount, platform_fee, freelancer_amount, currency, gateway_order_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(payment.platform_fee)
    .bind(payment.freelancer_amount)
    .bind(payment.currency)
    .bind(payment.gateway_order_id)
    .fetch_all(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            SettlementDatabaseError::PaymentAlreadyExists(gateway_order_id)
        },
        _ => SettlementDatabaseError::from(e),
    })?
    .into_iter()
    .next()
    .ok_or(SettlementDatabaseError::from(sqlx::Error::RowNotFound))?;
    debug!("🗃️ Payment #{} for order [{}] saved. Gateway order {}", payment.id, payment.order_id, payment.gateway_order_id);
    Ok(payment)
}

pub async fn fetch_payment(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_all(conn).await?.into_iter().next();
    Ok(payment)
}

pub async fn fetch_payment_by_gateway_order_id(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE gateway_order_id = $1")
        .bind(gateway_order_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    Ok(payment)
}

pub async fn fetch_payment_by_gateway_payment_id(
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE gateway_payment_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(gateway_payment_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    Ok(payment)
}

pub async fn fetch_payments_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// `Pending | Failed -> Completed`. A failed attempt can still be captured later, e.g. after a bank retry.
pub async fn complete_payment(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET status = 'Completed', gateway_payment_id = $1, updated_at = CURRENT_TIMESTAMP
        WHERE gateway_order_id = $2 AND status IN ('Pending', 'Failed')
        RETURNING *;
        "#,
    )
    .bind(gateway_payment_id)
    .bind(gateway_order_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(payment)
}

pub async fn fail_payment(
    id: i64,
    gateway_payment_id: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET
            status = 'Failed',
            gateway_payment_id = COALESCE($1, gateway_payment_id),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status = 'Pending'
        RETURNING *;
        "#,
    )
    .bind(gateway_payment_id)
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(payment)
}

pub async fn refund_payment(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET status = 'Refunded', updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND status = 'Completed'
        RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(payment)
}

/// Marks the freelancer as paid. If `only_if_flagged` is set, only payments waiting on a manual payout match.
pub async fn mark_transferred(
    id: i64,
    only_if_flagged: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET
            transferred_to_freelancer = 1,
            manual_transfer_pending = 0,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND transferred_to_freelancer = 0 AND ($2 = 0 OR manual_transfer_pending = 1)
        RETURNING *;
        "#,
    )
    .bind(id)
    .bind(only_if_flagged)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(payment)
}

pub async fn flag_manual_transfer(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET manual_transfer_pending = 1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND transferred_to_freelancer = 0 AND manual_transfer_pending = 0
        RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(payment)
}

pub async fn flag_for_review(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET needs_review = 1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $1 AND needs_review = 0
        RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(payment)
}

pub async fn fetch_payments_awaiting_transfer(conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as(
        r#"
        SELECT * FROM payments
        WHERE status = 'Completed' AND manual_transfer_pending = 1 AND transferred_to_freelancer = 0
        ORDER BY updated_at ASC, id ASC
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(payments)
}
