use std::env;

use chrono::Duration;
use gig_common::{parse_boolean_flag, Secret, DEFAULT_CURRENCY_CODE};
use gig_payment_engine::{order_objects::OrderWindows, FeeSchedule};
use log::*;
use rand::RngCore;
use razorpay_tools::RazorpayConfig;
use rust_decimal::Decimal;

const DEFAULT_GIG_HOST: &str = "127.0.0.1";
const DEFAULT_GIG_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/gig_store.db";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 25;
const DEFAULT_JWT_AUDIENCE: &str = "authenticated";
const DEFAULT_ACCEPT_WINDOW: Duration = Duration::hours(48);
const DEFAULT_PAYMENT_WINDOW: Duration = Duration::hours(24);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// Log the client address from `X-Forwarded-For`/`Forwarded` rather than the peer. Only set this behind a proxy.
    pub use_x_forwarded_for: bool,
    pub auth: AuthConfig,
    /// REST credentials for the gateway. The key secret also verifies checkout signatures.
    pub razorpay: RazorpayConfig,
    /// Shared secret for webhook signatures. If it is blank, every webhook is rejected.
    pub webhook_secret: Secret<String>,
    pub currency: String,
    pub fees: FeeSchedule,
    pub order_windows: OrderWindows,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GIG_HOST.to_string(),
            port: DEFAULT_GIG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            use_x_forwarded_for: false,
            auth: AuthConfig::default(),
            razorpay: RazorpayConfig::default(),
            webhook_secret: Secret::default(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            fees: FeeSchedule::default(),
            order_windows: OrderWindows::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("GIG_HOST").ok().unwrap_or_else(|| DEFAULT_GIG_HOST.into());
        let port = env::var("GIG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for GIG_PORT. {e} Using the default, {DEFAULT_GIG_PORT}, instead."
                    );
                    DEFAULT_GIG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_GIG_PORT);
        let database_url = env::var("GIG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ GIG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_db_connections = env::var("GIG_MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for GIG_MAX_DB_CONNECTIONS. {e}"))
                    .ok()
            })
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_DB_CONNECTIONS);
        let use_x_forwarded_for = parse_boolean_flag(env::var("GIG_USE_X_FORWARDED_FOR").ok(), false);
        let auth = AuthConfig::from_env_or_default();
        let razorpay = RazorpayConfig::new_from_env_or_default();
        let webhook_secret = Secret::new(env::var("GIG_RAZORPAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ GIG_RAZORPAY_WEBHOOK_SECRET is not set. Every webhook will be rejected until it is set to the \
                 secret configured on the Razorpay dashboard."
            );
            String::default()
        }));
        let currency = env::var("GIG_CURRENCY")
            .map(|s| s.trim().to_ascii_uppercase())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        let fees = configure_fees(env::var("GIG_COMMISSION_RATE").ok(), env::var("GIG_TAX_RATE").ok());
        let order_windows = OrderWindows {
            accept_window: parse_hours("GIG_ACCEPT_WINDOW_HOURS", env::var("GIG_ACCEPT_WINDOW_HOURS").ok())
                .unwrap_or(DEFAULT_ACCEPT_WINDOW),
            payment_window: parse_hours("GIG_PAYMENT_WINDOW_HOURS", env::var("GIG_PAYMENT_WINDOW_HOURS").ok())
                .unwrap_or(DEFAULT_PAYMENT_WINDOW),
        };
        Self {
            host,
            port,
            database_url,
            max_db_connections,
            use_x_forwarded_for,
            auth,
            razorpay,
            webhook_secret,
            currency,
            fees,
            order_windows,
        }
    }
}

/// Reads the commission and tax rates (in percent). A rate that is missing or invalid falls back to the default.
fn configure_fees(commission: Option<String>, tax: Option<String>) -> FeeSchedule {
    let defaults = FeeSchedule::default();
    let commission_rate = parse_rate("GIG_COMMISSION_RATE", commission).unwrap_or(defaults.commission_rate());
    let tax_rate = parse_rate("GIG_TAX_RATE", tax).unwrap_or(defaults.tax_rate());
    let fees = FeeSchedule::new(commission_rate, tax_rate).unwrap_or_else(|e| {
        error!("🪛️ {e}. Using the default fee schedule instead.");
        defaults
    });
    info!("🪛️ Platform commission is {}%, with {}% tax on the commission", fees.commission_rate(), fees.tax_rate());
    fees
}

fn parse_rate(name: &str, value: Option<String>) -> Option<Decimal> {
    let value = value?;
    match value.trim().parse::<Decimal>() {
        Ok(rate) if rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED => Some(rate),
        Ok(rate) => {
            error!("🪛️ {name} must be a percentage between 0 and 100, but was {rate}. Using the default.");
            None
        },
        Err(e) => {
            error!("🪛️ Invalid configuration value for {name}. {e}. Using the default.");
            None
        },
    }
}

fn parse_hours(name: &str, value: Option<String>) -> Option<Duration> {
    let value = value.or_else(|| {
        info!("🪛️ {name} is not set. Using the default.");
        None
    })?;
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}"))
        .ok()
        .filter(|&h| {
            if h <= 0 {
                warn!("🪛️ {name} must be a positive number of hours.");
            }
            h > 0
        })
        .map(Duration::hours)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 key shared with the auth provider that issues access tokens.
    pub jwt_secret: Secret<String>,
    /// Tokens must carry this `aud` claim.
    pub audience: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. No access token \
             issued by the auth provider will be accepted. Set GIG_JWT_SECRET. 🚨️🚨️🚨️"
        );
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self { jwt_secret: Secret::new(hex::encode(key)), audience: DEFAULT_JWT_AUDIENCE.to_string() }
    }
}

impl AuthConfig {
    pub fn new(jwt_secret: &str, audience: &str) -> Self {
        Self { jwt_secret: Secret::new(jwt_secret.to_string()), audience: audience.to_string() }
    }

    pub fn from_env_or_default() -> Self {
        let audience = env::var("GIG_JWT_AUDIENCE").ok().unwrap_or_else(|| {
            info!("🪛️ GIG_JWT_AUDIENCE is not set. Using '{DEFAULT_JWT_AUDIENCE}'.");
            DEFAULT_JWT_AUDIENCE.to_string()
        });
        match env::var("GIG_JWT_SECRET").ok().filter(|s| !s.trim().is_empty()) {
            Some(secret) => Self { jwt_secret: Secret::new(secret), audience },
            None => Self { audience, ..Self::default() },
        }
    }
}
