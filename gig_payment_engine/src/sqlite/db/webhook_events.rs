use sqlx::SqliteConnection;

pub async fn event_exists(event_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let found: Option<(String,)> = sqlx::query_as("SELECT event_id FROM webhook_events WHERE event_id = $1")
        .bind(event_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    Ok(found.is_some())
}

/// Returns false if the event was already recorded.
pub async fn record_event(event_id: &str, event_type: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT OR IGNORE INTO webhook_events (event_id, event_type) VALUES ($1, $2)")
        .bind(event_id)
        .bind(event_type)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
