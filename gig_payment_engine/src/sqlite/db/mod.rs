//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Single-row queries are drained with `fetch_all` rather than `fetch_one`/`fetch_optional`. A statement that is
//! abandoned after its first row is not reset, which keeps its implicit transaction open on the pooled connection, so
//! the write is invisible to every other connection in the pool.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod orders;
pub mod payments;
pub mod webhook_events;

const SQLITE_DB_URL: &str = "sqlite://data/gig_store.db";

pub fn db_url() -> String {
    let result = env::var("GIG_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ GIG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
