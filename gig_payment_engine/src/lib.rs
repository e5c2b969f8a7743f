//! GigPay Settlement Engine
//!
//! The settlement engine takes care of the money side of a freelance marketplace order: a client buys a service plan
//! tier from a freelancer, the platform collects payment through a hosted payment gateway, keeps its commission plus
//! GST on that commission, and pays the rest out to the freelancer.
//!
//! The library is divided into these sections:
//! 1. Fee calculation ([`mod@fees`]). A pure function from a service price to the commission, tax, total and payout.
//! 2. Storage ([`mod@traits`] and the SQLite backend). You should never need to access the database directly. Use
//!    the public APIs instead. The data types stored in the database are defined in [`mod@db_types`] and are public.
//! 3. The engine's public API ([`OrderFlowApi`] and [`SettlementApi`]). These are generic over the storage backend
//!    and the payment gateway, so that both can be swapped out or mocked.
//! 4. Gateway signature helpers ([`mod@helpers`]) for checkout results and webhook deliveries.
pub mod db_types;
pub mod fees;
pub mod helpers;
pub mod traits;

mod gpe_api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use fees::{FeeBreakdown, FeeError, FeeSchedule};
pub use gpe_api::{
    errors::SettlementError,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_objects,
    settlement_api::SettlementApi,
    webhook_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db, SqliteDatabase};
