mod signatures;

pub use signatures::{
    checkout_payload,
    hmac_sha256_hex,
    sign_checkout,
    sign_webhook,
    verify_checkout_signature,
    verify_hmac_sha256_hex,
    verify_webhook_signature,
    SignatureError,
};
