//! A typed client for the parts of the Razorpay REST API the settlement server uses: minting payment orders for
//! hosted checkout, and looking up payments.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::RazorpayApi;
pub use config::RazorpayConfig;
pub use data_objects::{NewRazorpayOrder, RazorpayOrder, RazorpayPayment};
pub use error::RazorpayApiError;
