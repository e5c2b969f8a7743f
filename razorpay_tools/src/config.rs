use std::time::Duration;

use gig_common::Secret;
use log::*;

pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com";
pub const DEFAULT_RAZORPAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    /// Base url of the REST API, without the `/v1` suffix.
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::default(),
            key_secret: Secret::default(),
            api_url: DEFAULT_RAZORPAY_API_URL.to_string(),
            timeout: DEFAULT_RAZORPAY_TIMEOUT,
        }
    }
}

impl RazorpayConfig {
    pub fn new_from_env_or_default() -> Self {
        let key_id = std::env::var("GIG_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("🪛️ GIG_RAZORPAY_KEY_ID not set. Calls to Razorpay will be rejected.");
            String::default()
        });
        let key_secret = Secret::new(std::env::var("GIG_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ GIG_RAZORPAY_KEY_SECRET not set. Calls to Razorpay will be rejected and checkouts cannot be verified.");
            String::default()
        }));
        let api_url = std::env::var("GIG_RAZORPAY_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                info!("🪛️ GIG_RAZORPAY_API_URL not set, using {DEFAULT_RAZORPAY_API_URL}");
                DEFAULT_RAZORPAY_API_URL.to_string()
            });
        let timeout = parse_timeout(std::env::var("GIG_RAZORPAY_TIMEOUT_SECS").ok());
        Self { key_id, key_secret, api_url, timeout }
    }
}

fn parse_timeout(value: Option<String>) -> Duration {
    match value.map(|s| s.trim().parse::<u64>()) {
        Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
        Some(_) => {
            warn!(
                "🪛️ GIG_RAZORPAY_TIMEOUT_SECS is not a positive number of seconds. Using {}s",
                DEFAULT_RAZORPAY_TIMEOUT.as_secs()
            );
            DEFAULT_RAZORPAY_TIMEOUT
        },
        None => DEFAULT_RAZORPAY_TIMEOUT,
    }
}
