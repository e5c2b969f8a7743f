//! # Platform fee calculator
//!
//! The platform keeps a commission on every order, and collects GST on that commission (and only on the commission)
//! from the client. The freelancer's price is never taxed by the platform.
//!
//! | quantity             | formula                         |
//! |----------------------|---------------------------------|
//! | `commission`         | `price * commission_rate / 100` |
//! | `tax_on_commission`  | `commission * tax_rate / 100`   |
//! | `total`              | `price + tax_on_commission`     |
//! | `freelancer_net`     | `price - commission`            |
//! | `platform_retained`  | `commission + tax_on_commission`|
//!
//! All arithmetic is carried out on exact decimals. Each figure is rounded to two decimal places, half away from zero,
//! only once the exact values are known.
use gig_common::Paise;
use log::trace;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 14%
pub const DEFAULT_COMMISSION_RATE: Decimal = Decimal::from_parts(14, 0, 0, false, 0);
/// 18% GST, charged on the commission
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 0);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeeError {
    #[error("Invalid amount: {0}. Prices must be greater than zero.")]
    InvalidAmount(Decimal),
    #[error("Invalid rate: {0}%. Rates must be between 0 and 100.")]
    InvalidRate(Decimal),
    #[error("The fee calculation overflowed for a price of {0}")]
    Overflow(Decimal),
}

/// The commission and tax rates, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    commission_rate: Decimal,
    tax_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self { commission_rate: DEFAULT_COMMISSION_RATE, tax_rate: DEFAULT_TAX_RATE }
    }
}

impl FeeSchedule {
    pub fn new(commission_rate: Decimal, tax_rate: Decimal) -> Result<Self, FeeError> {
        for rate in [commission_rate, tax_rate] {
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                return Err(FeeError::InvalidRate(rate));
            }
        }
        Ok(Self { commission_rate, tax_rate })
    }

    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Calculates the fee breakdown for a service priced at `price` (in major units).
    pub fn calculate(&self, price: Decimal) -> Result<FeeBreakdown, FeeError> {
        if price <= Decimal::ZERO {
            return Err(FeeError::InvalidAmount(price));
        }
        let overflow = || FeeError::Overflow(price);
        let commission = price
            .checked_mul(self.commission_rate)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(overflow)?;
        let tax_on_commission = commission
            .checked_mul(self.tax_rate)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(overflow)?;
        let total = price.checked_add(tax_on_commission).ok_or_else(overflow)?;
        let freelancer_net = price.checked_sub(commission).ok_or_else(overflow)?;
        let platform_retained = commission.checked_add(tax_on_commission).ok_or_else(overflow)?;
        let breakdown = FeeBreakdown {
            price: round(price),
            commission: round(commission),
            tax_on_commission: round(tax_on_commission),
            total: round(total),
            freelancer_net: round(freelancer_net),
            platform_retained: round(platform_retained),
        };
        trace!("🧮️ Fee breakdown for {price}: {breakdown:?}");
        Ok(breakdown)
    }

    /// Convenience wrapper around [`Self::calculate`] for prices already held in minor units.
    pub fn calculate_for(&self, price: Paise) -> Result<FeeBreakdown, FeeError> {
        self.calculate(price.to_major())
    }
}

/// Rounds to the paisa and fixes the scale at two places, so that `1025.2` is always shown as `1025.20`.
fn round(v: Decimal) -> Decimal {
    let mut rounded = v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Money figures serialize as strings with two decimal places (e.g. `"1025.20"`), so they reach clients exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub price: Decimal,
    pub commission: Decimal,
    pub tax_on_commission: Decimal,
    pub total: Decimal,
    pub freelancer_net: Decimal,
    pub platform_retained: Decimal,
}

impl FeeBreakdown {
    /// The amount to charge the client, in the minor unit the gateway expects.
    pub fn total_minor_units(&self) -> Result<Paise, FeeError> {
        Paise::try_from(self.total).map_err(|_| FeeError::Overflow(self.price))
    }

    pub fn platform_retained_minor_units(&self) -> Result<Paise, FeeError> {
        Paise::try_from(self.platform_retained).map_err(|_| FeeError::Overflow(self.price))
    }

    pub fn freelancer_net_minor_units(&self) -> Result<Paise, FeeError> {
        Paise::try_from(self.freelancer_net).map_err(|_| FeeError::Overflow(self.price))
    }
}
