use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, UserId},
    traits::SettlementDatabaseError,
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// New orders always start out as `Pending`.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SettlementDatabaseError> {
    let order_id = order.order_id.clone();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                client_id,
                freelancer_id,
                service_id,
                plan_tier,
                price,
                currency,
                accept_deadline
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.client_id)
    .bind(order.freelancer_id)
    .bind(order.service_id)
    .bind(order.plan_tier)
    .bind(order.price)
    .bind(order.currency)
    .bind(order.accept_deadline)
    .fetch_all(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => SettlementDatabaseError::OrderAlreadyExists(order_id),
        _ => SettlementDatabaseError::from(e),
    })?
    .into_iter()
    .next()
    .ok_or(SettlementDatabaseError::from(sqlx::Error::RowNotFound))?;
    debug!("🗃️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    Ok(order)
}

/// Orders in which the user is either party, newest first.
pub async fn fetch_orders_for_user(user: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE client_id = $1 OR freelancer_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user.as_str())
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn accept_order(
    order_id: &OrderId,
    payment_deadline: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET status = 'Accepted', payment_deadline = $1, updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $2 AND status = 'Pending'
        RETURNING *;
        "#,
    )
    .bind(payment_deadline)
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(order)
}

/// Moves the order into the `to` state, but only if it is currently in one of the `from` states.
/// Returns `None` if no row was updated.
pub async fn transition_order_status(
    order_id: &OrderId,
    from: &[OrderStatusType],
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    if from.is_empty() {
        return Ok(None);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(to.to_string());
    builder.push(" WHERE order_id = ");
    builder.push_bind(order_id.as_str());
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in from {
        statuses.push_bind(status.to_string());
    }
    builder.push(") RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_all(conn).await?.into_iter().next();
    if let Some(o) = &order {
        debug!("🗃️ Order [{}] is now {}", o.order_id, o.status);
    }
    Ok(order)
}
