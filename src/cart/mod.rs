//! Cart
//!
//! The cart's pure state core: line items, promo state, per-item loading
//! flags, and the command reducer every mutation flows through. Side effects
//! (remote sync, persistence, logging) live in [`store`].

use std::fmt;

use rustc_hash::FxHashMap;
use rusty_money::{Money, MoneyError, iso::Currency};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{Product, ProductId, Variant, VariantId};

pub mod store;

/// Errors related to cart contents.
#[derive(Debug, Error)]
pub enum CartError {
    /// The requested variant does not exist on the product.
    #[error("product {0} has no variant {1}")]
    UnknownVariant(ProductId, VariantId),

    /// A line total or subtotal overflowed minor units.
    #[error("cart amount overflowed minor units")]
    AmountOverflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Identifier for one cart line, assigned when the line is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(Uuid);

impl LineItemId {
    /// Generate a fresh line id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One row in the cart: a product variant and quantity, with the display
/// snapshot taken at add-time.
#[derive(Debug, Clone)]
pub struct LineItem {
    /// Line identifier, assigned at creation.
    pub id: LineItemId,

    /// Catalog product reference.
    pub product_id: ProductId,

    /// Catalog variant reference.
    pub variant_id: VariantId,

    /// Product name snapshot.
    pub name: String,

    /// Display image snapshot.
    pub image: String,

    /// Variant label snapshot (e.g. "2-Pack").
    pub variant_label: String,

    /// Units of the variant, always at least one.
    pub quantity: u32,

    /// Variant price snapshot taken at add-time.
    pub unit_price: Money<'static, Currency>,
}

impl LineItem {
    /// Snapshot a product variant into a new cart line.
    pub fn snapshot(product: &Product, variant: &Variant, quantity: u32) -> Self {
        Self {
            id: LineItemId::generate(),
            product_id: product.id.clone(),
            variant_id: variant.id.clone(),
            name: product.name.clone(),
            image: product.primary_image().to_owned(),
            variant_label: variant.label.clone(),
            quantity,
            unit_price: variant.price,
        }
    }

    /// Price of the line: unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::AmountOverflow`] if the multiplication leaves
    /// the minor-unit range.
    pub fn line_total(&self) -> Result<Money<'static, Currency>, CartError> {
        let minor = self
            .unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
            .ok_or(CartError::AmountOverflow)?;

        Ok(Money::from_minor(minor, self.unit_price.currency()))
    }
}

/// A promo code together with the discount the remote validator granted it.
///
/// The pairing makes the code/discount consistency invariant structural: a
/// discount cannot exist without its code.
#[derive(Debug, Clone, PartialEq)]
pub struct Promo {
    /// The code as entered by the shopper.
    pub code: String,

    /// Monetary discount off the subtotal.
    pub discount: Money<'static, Currency>,
}

/// Cart state: what the shopper intends to buy, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    items: SmallVec<[LineItem; 4]>,
    promo: Option<Promo>,
    loading: FxHashMap<LineItemId, bool>,
}

impl CartState {
    /// Lines in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Look up a line by id.
    pub fn item(&self, id: LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|line| line.id == id)
    }

    /// The applied promo, if any.
    pub fn promo(&self) -> Option<&Promo> {
        self.promo.as_ref()
    }

    /// Whether a line has an in-flight mutation.
    pub fn is_item_loading(&self, id: LineItemId) -> bool {
        self.loading.get(&id).copied().unwrap_or(false)
    }

    /// Whether a loading entry exists for the line at all. Entries are
    /// pruned, not set to `false`, once an operation resolves.
    pub fn has_loading_flag(&self, id: LineItemId) -> bool {
        self.loading.contains_key(&id)
    }

    /// Whether the cart has neither items nor a promo. An empty cart is not
    /// mirrored to durable storage.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.promo.is_none()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .map(|line| line.quantity)
            .fold(0, u32::saturating_add)
    }

    /// Sum of line totals, zero for an empty cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] on minor-unit overflow or currency mismatch.
    pub fn subtotal(
        &self,
        currency: &'static Currency,
    ) -> Result<Money<'static, Currency>, CartError> {
        self.items
            .iter()
            .try_fold(Money::from_minor(0, currency), |acc, line| {
                Ok(acc.add(line.line_total()?)?)
            })
    }

    /// Subtotal less the promo discount. Shipping and tax are derived by the
    /// totals calculator, not here.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] on minor-unit overflow or currency mismatch.
    pub fn total_after_discount(
        &self,
        currency: &'static Currency,
    ) -> Result<Money<'static, Currency>, CartError> {
        let subtotal = self.subtotal(currency)?;

        match &self.promo {
            Some(promo) => Ok(subtotal.sub(promo.discount)?),
            None => Ok(subtotal),
        }
    }
}

/// Commands applied by [`apply`]; every cart mutation is expressed as one.
#[derive(Debug, Clone)]
pub enum CartCommand {
    /// Replace the whole cart, e.g. from the remote snapshot or the durable
    /// local copy.
    Replace {
        /// Lines for the new cart.
        items: Vec<LineItem>,
        /// Promo for the new cart.
        promo: Option<Promo>,
    },

    /// Add a line, merging quantity into an existing line for the same
    /// `(product, variant)` pair.
    Add(LineItem),

    /// Set the quantity of an existing line; unknown ids are ignored.
    SetQuantity {
        /// Line to change.
        id: LineItemId,
        /// New quantity.
        quantity: u32,
    },

    /// Remove a line, pruning its loading entry.
    Remove(LineItemId),

    /// Mark or clear a line's in-flight mutation flag. Clearing prunes the
    /// entry.
    SetLoading {
        /// Line to flag.
        id: LineItemId,
        /// Whether a mutation is in flight.
        loading: bool,
    },

    /// Store a remote-validated promo.
    SetPromo(Promo),

    /// Drop the promo.
    ClearPromo,

    /// Reset to the empty cart.
    Clear,
}

/// The cart transition function. Pure: no I/O, no logging, total over all
/// commands.
#[must_use]
pub fn apply(mut state: CartState, command: CartCommand) -> CartState {
    match command {
        CartCommand::Replace { items, promo } => {
            state.items = SmallVec::from_vec(items);
            state.promo = promo;
            state.loading.clear();
        }

        CartCommand::Add(incoming) => {
            let existing = state.items.iter_mut().find(|line| {
                line.product_id == incoming.product_id && line.variant_id == incoming.variant_id
            });

            match existing {
                Some(line) => line.quantity = line.quantity.saturating_add(incoming.quantity),
                None => state.items.push(incoming),
            }
        }

        CartCommand::SetQuantity { id, quantity } => {
            if let Some(line) = state.items.iter_mut().find(|line| line.id == id) {
                line.quantity = quantity;
            }
        }

        CartCommand::Remove(id) => {
            state.items.retain(|line| line.id != id);
            state.loading.remove(&id);
        }

        CartCommand::SetLoading { id, loading } => {
            if loading {
                state.loading.insert(id, true);
            } else {
                state.loading.remove(&id);
            }
        }

        CartCommand::SetPromo(promo) => state.promo = Some(promo),

        CartCommand::ClearPromo => state.promo = None,

        CartCommand::Clear => state = CartState::default(),
    }

    state
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    fn line(product: &str, variant: &str, quantity: u32, unit_minor: i64) -> LineItem {
        LineItem {
            id: LineItemId::generate(),
            product_id: ProductId::new(product),
            variant_id: VariantId::new(variant),
            name: "Odor Pack".to_owned(),
            image: "/images/main.jpg".to_owned(),
            variant_label: variant.to_owned(),
            quantity,
            unit_price: Money::from_minor(unit_minor, USD),
        }
    }

    #[test]
    fn add_merges_quantity_for_same_product_and_variant() {
        let mut state = CartState::default();

        state = apply(state, CartCommand::Add(line("odor-pack", "single", 1, 2_499)));
        state = apply(state, CartCommand::Add(line("odor-pack", "single", 2, 2_499)));
        state = apply(state, CartCommand::Add(line("odor-pack", "single", 3, 2_499)));

        assert_eq!(state.items().len(), 1);
        assert_eq!(state.items().first().map(|l| l.quantity), Some(6));
    }

    #[test]
    fn add_keeps_distinct_variants_separate() {
        let mut state = CartState::default();

        state = apply(state, CartCommand::Add(line("odor-pack", "single", 1, 2_499)));
        state = apply(state, CartCommand::Add(line("odor-pack", "double", 1, 4_499)));

        assert_eq!(state.items().len(), 2);
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut state = CartState::default();

        state = apply(state, CartCommand::Add(line("odor-pack", "double", 1, 4_499)));
        state = apply(state, CartCommand::Add(line("odor-pack", "single", 1, 2_499)));

        let variants: Vec<&str> = state
            .items()
            .iter()
            .map(|l| l.variant_id.as_str())
            .collect();

        assert_eq!(variants, vec!["double", "single"]);
    }

    #[test]
    fn set_quantity_changes_only_the_target_line() {
        let first = line("odor-pack", "single", 1, 2_499);
        let first_id = first.id;

        let mut state = apply(CartState::default(), CartCommand::Add(first));
        state = apply(state, CartCommand::Add(line("odor-pack", "double", 1, 4_499)));
        state = apply(
            state,
            CartCommand::SetQuantity {
                id: first_id,
                quantity: 5,
            },
        );

        assert_eq!(state.item(first_id).map(|l| l.quantity), Some(5));
        assert_eq!(state.items().len(), 2);
    }

    #[test]
    fn set_quantity_ignores_unknown_ids() {
        let state = apply(CartState::default(), CartCommand::Add(line("odor-pack", "single", 1, 2_499)));

        let after = apply(
            state.clone(),
            CartCommand::SetQuantity {
                id: LineItemId::generate(),
                quantity: 5,
            },
        );

        assert_eq!(after.items().first().map(|l| l.quantity), Some(1));
    }

    #[test]
    fn remove_prunes_line_and_loading_entry() {
        let item = line("odor-pack", "single", 1, 2_499);
        let id = item.id;

        let mut state = apply(CartState::default(), CartCommand::Add(item));
        state = apply(state, CartCommand::SetLoading { id, loading: true });
        state = apply(state, CartCommand::Remove(id));

        assert!(state.items().is_empty());
        assert!(!state.has_loading_flag(id));
    }

    #[test]
    fn clearing_loading_flag_prunes_the_entry() {
        let item = line("odor-pack", "single", 1, 2_499);
        let id = item.id;

        let mut state = apply(CartState::default(), CartCommand::Add(item));
        state = apply(state, CartCommand::SetLoading { id, loading: true });

        assert!(state.is_item_loading(id));
        assert!(state.has_loading_flag(id));

        state = apply(state, CartCommand::SetLoading { id, loading: false });

        assert!(!state.is_item_loading(id));
        assert!(!state.has_loading_flag(id));
    }

    #[test]
    fn replace_resets_loading_entries() {
        let item = line("odor-pack", "single", 1, 2_499);
        let id = item.id;

        let mut state = apply(CartState::default(), CartCommand::Add(item));
        state = apply(state, CartCommand::SetLoading { id, loading: true });
        state = apply(
            state,
            CartCommand::Replace {
                items: vec![line("odor-pack", "double", 2, 4_499)],
                promo: None,
            },
        );

        assert!(!state.has_loading_flag(id));
        assert_eq!(state.item_count(), 2);
    }

    #[test]
    fn clear_resets_to_the_empty_cart() {
        let mut state = apply(CartState::default(), CartCommand::Add(line("odor-pack", "single", 1, 2_499)));
        state = apply(
            state,
            CartCommand::SetPromo(Promo {
                code: "FRESH10".to_owned(),
                discount: Money::from_minor(1_000, USD),
            }),
        );

        state = apply(state, CartCommand::Clear);

        assert!(state.is_empty());
        assert!(state.promo().is_none());
    }

    #[test]
    fn subtotal_and_count_derive_from_lines() -> TestResult {
        let mut state = apply(CartState::default(), CartCommand::Add(line("odor-pack", "single", 2, 2_499)));
        state = apply(state, CartCommand::Add(line("odor-pack", "double", 1, 4_499)));

        assert_eq!(state.item_count(), 3);
        assert_eq!(state.subtotal(USD)?, Money::from_minor(9_497, USD));

        Ok(())
    }

    #[test]
    fn total_after_discount_subtracts_promo() -> TestResult {
        let mut state = apply(CartState::default(), CartCommand::Add(line("odor-pack", "double", 1, 4_499)));
        state = apply(
            state,
            CartCommand::SetPromo(Promo {
                code: "FRESH10".to_owned(),
                discount: Money::from_minor(500, USD),
            }),
        );

        assert_eq!(state.total_after_discount(USD)?, Money::from_minor(3_999, USD));

        Ok(())
    }

    #[test]
    fn empty_cart_subtotal_is_zero() -> TestResult {
        let state = CartState::default();

        assert_eq!(state.subtotal(USD)?, Money::from_minor(0, USD));

        Ok(())
    }

    #[test]
    fn promo_alone_makes_cart_non_empty() {
        let state = apply(
            CartState::default(),
            CartCommand::SetPromo(Promo {
                code: "FRESH10".to_owned(),
                discount: Money::from_minor(1_000, USD),
            }),
        );

        assert!(!state.is_empty());
    }

    #[test]
    fn line_total_multiplies_unit_price() -> TestResult {
        let item = line("odor-pack", "single", 3, 2_499);

        assert_eq!(item.line_total()?, Money::from_minor(7_497, USD));

        Ok(())
    }
}
