//! # Gateway signatures
//!
//! The payment gateway authenticates two kinds of message with HMAC-SHA256, hex-encoded:
//!
//! * The checkout result handed to the client's browser. The message is `{gateway_order_id}|{gateway_payment_id}` and
//!   the key is the API key secret.
//! * Webhook deliveries. The message is the raw request body, exactly as received, and the key is the webhook secret
//!   configured on the gateway dashboard.
//!
//! Comparisons are constant-time: the candidate signature is hex-decoded and handed to [`Mac::verify_slice`].
//! Callers never see the expected digest.
use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("No signing secret has been configured")]
    MissingSecret,
    #[error("The signature is not valid hex")]
    MalformedSignature,
    #[error("The signature does not match")]
    Mismatch,
}

/// Returns the lowercase hex HMAC-SHA256 digest of `message` under `secret`.
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret).unwrap_or_else(|_| unreachable!());
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks `signature` (hex) against the HMAC-SHA256 of `message` under `secret`, in constant time.
///
/// An empty secret always fails.
pub fn verify_hmac_sha256_hex(secret: &[u8], message: &[u8], signature: &str) -> Result<(), SignatureError> {
    if secret.is_empty() {
        warn!("🔐️ Refusing to verify a signature without a secret");
        return Err(SignatureError::MissingSecret);
    }
    let candidate = hex::decode(signature.trim()).map_err(|_| SignatureError::MalformedSignature)?;
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret).map_err(|_| SignatureError::MissingSecret)?;
    mac.update(message);
    mac.verify_slice(&candidate).map_err(|_| SignatureError::Mismatch)
}

/// The message the gateway signs when it hands a completed checkout back to the client.
pub fn checkout_payload(gateway_order_id: &str, gateway_payment_id: &str) -> String {
    format!("{gateway_order_id}|{gateway_payment_id}")
}

pub fn sign_checkout(key_secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    hmac_sha256_hex(key_secret.as_bytes(), checkout_payload(gateway_order_id, gateway_payment_id).as_bytes())
}

pub fn verify_checkout_signature(
    key_secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let payload = checkout_payload(gateway_order_id, gateway_payment_id);
    verify_hmac_sha256_hex(key_secret.as_bytes(), payload.as_bytes(), signature)
}

pub fn sign_webhook(webhook_secret: &str, body: &[u8]) -> String {
    hmac_sha256_hex(webhook_secret.as_bytes(), body)
}

pub fn verify_webhook_signature(webhook_secret: &str, body: &[u8], signature: &str) -> Result<(), SignatureError> {
    verify_hmac_sha256_hex(webhook_secret.as_bytes(), body, signature)
}
