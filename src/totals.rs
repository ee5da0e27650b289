//! Order totals
//!
//! Pure derivation of the amounts shown in the cart summary and checkout.
//! Holds no state of its own: every figure is recomputable from the inputs
//! alone, so callers may re-derive on every render and memoize as they see
//! fit.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::cart::LineItem;

/// Errors raised while deriving order totals.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotalsError {
    /// A line's currency differs from the store currency (line index, line
    /// currency, store currency).
    #[error("line {0} has currency {1}, but the store uses {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// The shipping cost currency differs from the store currency.
    #[error("shipping cost has currency {0}, but the store uses {1}")]
    ShippingCurrencyMismatch(&'static str, &'static str),

    /// The promo discount currency differs from the store currency.
    #[error("promo discount has currency {0}, but the store uses {1}")]
    DiscountCurrencyMismatch(&'static str, &'static str),

    /// An amount overflowed minor units or could not be converted.
    #[error("amount conversion overflowed or was not representable")]
    Conversion,
}

/// Everything the cart summary and checkout need to display an order's cost.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    /// Sum of unit price times quantity over all lines.
    pub subtotal: Money<'static, Currency>,

    /// Promo discount, clamped to the subtotal.
    pub discount: Money<'static, Currency>,

    /// Shipping charged; zero once the free-shipping threshold is met.
    pub shipping: Money<'static, Currency>,

    /// Tax on the discounted subtotal.
    pub tax: Money<'static, Currency>,

    /// Grand total: subtotal − discount + tax + shipping.
    pub total: Money<'static, Currency>,

    /// Units across all lines.
    pub item_count: u32,

    /// Whether the subtotal met the free-shipping threshold.
    pub free_shipping_eligible: bool,

    /// Remaining spend before shipping becomes free; zero once eligible.
    pub amount_to_free_shipping: Money<'static, Currency>,
}

/// Derive order totals from the cart lines and pricing inputs.
///
/// The free-shipping comparison is inclusive: a subtotal exactly at the
/// threshold ships free. The discount is clamped to `[0, subtotal]`, so the
/// taxable amount is never negative. Tax is rounded to whole minor units,
/// half away from zero.
///
/// # Errors
///
/// Returns a [`TotalsError`] when any input is denominated in a currency
/// other than the threshold's, or when an amount leaves the representable
/// minor-unit range.
pub fn order_totals(
    items: &[LineItem],
    promo_discount: Option<Money<'static, Currency>>,
    shipping_cost: Money<'static, Currency>,
    tax_rate: Percentage,
    free_shipping_threshold: Money<'static, Currency>,
) -> Result<OrderTotals, TotalsError> {
    let currency = free_shipping_threshold.currency();

    if shipping_cost.currency() != currency {
        return Err(TotalsError::ShippingCurrencyMismatch(
            shipping_cost.currency().iso_alpha_code,
            currency.iso_alpha_code,
        ));
    }

    if let Some(discount) = promo_discount {
        if discount.currency() != currency {
            return Err(TotalsError::DiscountCurrencyMismatch(
                discount.currency().iso_alpha_code,
                currency.iso_alpha_code,
            ));
        }
    }

    let mut subtotal_minor = 0_i64;
    let mut item_count = 0_u32;

    for (index, line) in items.iter().enumerate() {
        let line_currency = line.unit_price.currency();

        if line_currency != currency {
            return Err(TotalsError::CurrencyMismatch(
                index,
                line_currency.iso_alpha_code,
                currency.iso_alpha_code,
            ));
        }

        let line_minor = line
            .unit_price
            .to_minor_units()
            .checked_mul(i64::from(line.quantity))
            .ok_or(TotalsError::Conversion)?;

        subtotal_minor = subtotal_minor
            .checked_add(line_minor)
            .ok_or(TotalsError::Conversion)?;

        item_count = item_count.saturating_add(line.quantity);
    }

    let discount_minor = promo_discount
        .map_or(0, |discount| discount.to_minor_units())
        .clamp(0, subtotal_minor);

    let taxable_minor = subtotal_minor - discount_minor;
    let tax_minor = percent_of_minor(tax_rate, taxable_minor)?;

    let threshold_minor = free_shipping_threshold.to_minor_units();
    let free_shipping_eligible = subtotal_minor >= threshold_minor;

    let shipping_minor = if free_shipping_eligible {
        0
    } else {
        shipping_cost.to_minor_units()
    };

    let total_minor = taxable_minor
        .checked_add(tax_minor)
        .and_then(|value| value.checked_add(shipping_minor))
        .ok_or(TotalsError::Conversion)?;

    let to_free_minor = threshold_minor.saturating_sub(subtotal_minor).max(0);

    Ok(OrderTotals {
        subtotal: Money::from_minor(subtotal_minor, currency),
        discount: Money::from_minor(discount_minor, currency),
        shipping: Money::from_minor(shipping_minor, currency),
        tax: Money::from_minor(tax_minor, currency),
        total: Money::from_minor(total_minor, currency),
        item_count,
        free_shipping_eligible,
        amount_to_free_shipping: Money::from_minor(to_free_minor, currency),
    })
}

/// Percentage of a minor-unit amount, rounded half away from zero.
fn percent_of_minor(percent: Percentage, minor: i64) -> Result<i64, TotalsError> {
    let minor = Decimal::from_i64(minor).ok_or(TotalsError::Conversion)?;

    (percent * Decimal::ONE) // decimal_percentage doesn't expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(TotalsError::Conversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(TotalsError::Conversion)
}
