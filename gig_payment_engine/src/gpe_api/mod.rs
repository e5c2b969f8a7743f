//! # Settlement engine public API
//!
//! * [`order_flow_api`] moves orders through their lifecycle: placement, acceptance, delivery, completion and
//!   cancellation.
//! * [`settlement_api`] handles the money: fee previews, checkout initiation, checkout verification, gateway
//!   webhooks and payout reconciliation.
//!
//! Both APIs are created by supplying a backend that implements [`crate::traits::SettlementDatabase`]. The
//! settlement API additionally needs a [`crate::traits::PaymentGateway`].
//!
//! ```rust,ignore
//! use gig_payment_engine::{FeeSchedule, SettlementApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = SettlementApi::new(db, gateway, FeeSchedule::default(), "INR");
//! let checkout = api.initiate_payment(&client_id, &order_id).await?;
//! ```
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_objects;
pub mod settlement_api;
pub mod webhook_objects;
