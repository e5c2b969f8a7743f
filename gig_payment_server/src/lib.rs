//! # GigPay payment server
//! This crate hosts the HTTP server for the GigPay settlement engine. It is responsible for:
//! * Starting checkouts for accepted orders, by minting a Razorpay order for the amount due.
//! * Confirming checkouts from the signed result that Razorpay hands the client.
//! * Receiving Razorpay webhooks (captures, failures, payouts and refunds) and reconciling them idempotently.
//! * The order lifecycle around payment, and the admin endpoints for payout reconciliation.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/razorpay`: Razorpay webhook deliveries. Signed with the webhook secret.
//! * `/api/...`: Everything else. Requires a bearer access token from the marketplace's auth provider.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
