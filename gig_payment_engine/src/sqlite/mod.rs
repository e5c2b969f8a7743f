//! SQLite backend for the settlement engine.
//!
//! Schema migrations live in `migrations/` and are embedded with `sqlx::migrate!`.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
