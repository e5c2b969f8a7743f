//! # Backend contracts
//!
//! The settlement APIs are generic over two collaborators:
//!
//! * [`SettlementDatabase`] stores orders, payments and the webhook event ledger. [`crate::SqliteDatabase`] is the
//!   bundled implementation.
//! * [`PaymentGateway`] creates gateway orders and checks checkout signatures. The HTTP implementation lives in the
//!   server crate; tests use mocks.
mod data_objects;
mod payment_gateway;
mod settlement_database;

pub use data_objects::{GatewayOrder, GatewayOrderRequest, PaymentCompletion};
pub use payment_gateway::{PaymentGateway, PaymentGatewayError};
pub use settlement_database::{SettlementDatabase, SettlementDatabaseError};
