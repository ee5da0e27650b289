//! Store configuration
//!
//! Pricing and persistence knobs for the storefront core, with defaults
//! matching the brand site (USD, $50 free-shipping threshold, $5 flat rate,
//! 8% tax) and a YAML loader for overrides.

use std::time::Duration;

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML payload could not be parsed.
    #[error(transparent)]
    Parse(#[from] serde_norway::Error),

    /// The configured currency code is not a known ISO 4217 code.
    #[error("unknown currency code {0}")]
    UnknownCurrency(String),

    /// A configured amount could not be represented in minor units.
    #[error("invalid amount {0}")]
    InvalidAmount(String),

    /// A configured percentage could not be parsed.
    #[error("invalid percentage {0}")]
    InvalidPercentage(String),
}

/// Runtime configuration for the storefront core.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Currency every price in the store is denominated in.
    pub currency: &'static Currency,

    /// Order subtotals at or above this amount ship free.
    pub free_shipping_threshold: Money<'static, Currency>,

    /// Flat shipping rate charged below the free-shipping threshold.
    pub flat_shipping_rate: Money<'static, Currency>,

    /// Sales tax rate applied to the discounted subtotal.
    pub tax_rate: Percentage,

    /// Key the persisted cart blob is stored under.
    pub storage_key: String,

    /// How long product detail lookups stay cached.
    pub product_cache_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            currency: iso::USD,
            free_shipping_threshold: Money::from_minor(5_000, iso::USD),
            flat_shipping_rate: Money::from_minor(500, iso::USD),
            tax_rate: Percentage::from(0.08),
            storage_key: "storefront_cart".to_owned(),
            product_cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// On-disk shape of the configuration file; absent fields keep defaults.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    currency: Option<String>,
    free_shipping_threshold: Option<String>,
    flat_shipping_rate: Option<String>,
    tax_rate: Option<String>,
    storage_key: Option<String>,
    product_cache_ttl_secs: Option<u64>,
}

impl StoreConfig {
    /// Load configuration from YAML, keeping defaults for absent fields.
    ///
    /// Amounts are decimal strings (e.g. `"50.00"`); the tax rate accepts
    /// `"8%"` or `"0.08"`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the YAML is malformed, the currency
    /// code is unknown, or an amount or percentage cannot be parsed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_norway::from_str(yaml)?;
        let base = Self::default();

        let currency = match file.currency {
            Some(code) => iso::find(&code).ok_or(ConfigError::UnknownCurrency(code))?,
            None => base.currency,
        };

        let free_shipping_threshold = match file.free_shipping_threshold {
            Some(raw) => parse_amount(&raw, currency)?,
            None => Money::from_minor(base.free_shipping_threshold.to_minor_units(), currency),
        };

        let flat_shipping_rate = match file.flat_shipping_rate {
            Some(raw) => parse_amount(&raw, currency)?,
            None => Money::from_minor(base.flat_shipping_rate.to_minor_units(), currency),
        };

        let tax_rate = match file.tax_rate {
            Some(raw) => parse_percentage(&raw)?,
            None => base.tax_rate,
        };

        Ok(Self {
            currency,
            free_shipping_threshold,
            flat_shipping_rate,
            tax_rate,
            storage_key: file.storage_key.unwrap_or(base.storage_key),
            product_cache_ttl: file
                .product_cache_ttl_secs
                .map_or(base.product_cache_ttl, Duration::from_secs),
        })
    }
}

/// Parse a decimal amount string (e.g. "50.00") into money.
fn parse_amount(
    raw: &str,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, ConfigError> {
    let amount = raw
        .trim()
        .parse::<Decimal>()
        .map_err(|_err| ConfigError::InvalidAmount(raw.to_owned()))?;

    let minor = amount
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| ConfigError::InvalidAmount(raw.to_owned()))?;

    Ok(Money::from_minor(minor, currency))
}

/// Parse a percentage string: "8%" for 8%, or "0.08" as a plain decimal.
fn parse_percentage(raw: &str) -> Result<Percentage, ConfigError> {
    let trimmed = raw.trim();

    if let Some(percent) = trimmed.strip_suffix('%') {
        let value = percent
            .trim()
            .parse::<f64>()
            .map_err(|_err| ConfigError::InvalidPercentage(raw.to_owned()))?;

        Ok(Percentage::from(value / 100.0))
    } else {
        let value = trimmed
            .parse::<f64>()
            .map_err(|_err| ConfigError::InvalidPercentage(raw.to_owned()))?;

        Ok(Percentage::from(value))
    }
}
