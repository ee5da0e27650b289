//! Cart store
//!
//! Orchestrates the pure cart reducer: optimistic local mutation first, then
//! best-effort remote sync and a mirror write to durable local storage.
//! Transient sync failures are logged and swallowed; the promo validator is
//! the one remote call whose failure reaches the caller.

use rusty_money::{Money, iso::Currency};
use tracing::{debug, warn};

use crate::api::{ApiError, CommerceApi, NewCartItem};
use crate::cart::{CartCommand, CartError, CartState, LineItem, LineItemId, Promo, apply};
use crate::catalog::{Product, VariantId};
use crate::config::StoreConfig;
use crate::storage::{CartStorage, StoredCart};

/// Single source of truth for the shopping cart.
///
/// One instance exists per application session. All mutation flows through
/// [`apply`]; the store only sequences commands, remote sync, and
/// persistence around the pure core, so a stricter sync policy (e.g.
/// rollback on failure) can be swapped in without touching call sites.
#[derive(Debug)]
pub struct CartStore<A, S> {
    api: A,
    storage: S,
    currency: &'static Currency,
    state: CartState,
}

impl<A: CommerceApi, S: CartStorage> CartStore<A, S> {
    /// Restore the cart: the remote source of truth first, the durable
    /// local copy as the guest fallback, empty otherwise.
    pub async fn initialize(api: A, storage: S, config: &StoreConfig) -> Self {
        let mut store = Self {
            api,
            storage,
            currency: config.currency,
            state: CartState::default(),
        };

        match store.api.get_cart().await {
            Ok(snapshot) => store.dispatch(CartCommand::Replace {
                items: snapshot.items,
                promo: snapshot.promo,
            }),
            Err(error) => {
                debug!(%error, "remote cart unavailable, falling back to local copy");

                match store.storage.load() {
                    Ok(Some(stored)) => match stored.revive() {
                        Some((items, promo)) => {
                            store.dispatch(CartCommand::Replace { items, promo });
                        }
                        None => warn!("stored cart had an unknown currency, starting empty"),
                    },
                    Ok(None) => {}
                    Err(error) => warn!(%error, "failed to read stored cart"),
                }
            }
        }

        store
    }

    /// Current cart state.
    pub fn state(&self) -> &CartState {
        &self.state
    }

    /// The storage backend, for inspection.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Currency the store is denominated in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.state.item_count()
    }

    /// Sum of line totals.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] on minor-unit overflow or currency mismatch.
    pub fn subtotal(&self) -> Result<Money<'static, Currency>, CartError> {
        self.state.subtotal(self.currency)
    }

    /// Subtotal less the promo discount.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] on minor-unit overflow or currency mismatch.
    pub fn total_after_discount(&self) -> Result<Money<'static, Currency>, CartError> {
        self.state.total_after_discount(self.currency)
    }

    fn dispatch(&mut self, command: CartCommand) {
        self.state = apply(std::mem::take(&mut self.state), command);
        self.persist();
    }

    /// Mirror the cart into durable storage: written while it has items or a
    /// promo, deleted once it has neither.
    fn persist(&self) {
        let result = if self.state.is_empty() {
            self.storage.clear()
        } else {
            self.storage
                .save(&StoredCart::snapshot(&self.state, self.currency))
        };

        if let Err(error) = result {
            warn!(%error, "failed to mirror cart to local storage");
        }
    }

    /// Add `quantity` units of a product variant, merging into an existing
    /// line for the same `(product, variant)` pair.
    ///
    /// The local mutation lands before the remote sync is attempted; a sync
    /// failure keeps the optimistic state and is only logged. A quantity
    /// below one is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownVariant`] when the product has no such
    /// variant.
    pub async fn add_item(
        &mut self,
        product: &Product,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        let variant = product.variant(variant_id).ok_or_else(|| {
            CartError::UnknownVariant(product.id.clone(), variant_id.clone())
        })?;

        if quantity < 1 {
            return Ok(());
        }

        let line = LineItem::snapshot(product, variant, quantity);
        let request = NewCartItem {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            quantity,
        };

        self.dispatch(CartCommand::Add(line));

        if let Err(error) = self.api.add_item(&request).await {
            warn!(%error, "cart add failed to sync, keeping optimistic state");
        }

        Ok(())
    }

    /// Set a line's quantity. Quantities below one and unknown lines are
    /// ignored. The line carries a loading flag until the sync resolves,
    /// success or failure; remote failure does not roll back.
    pub async fn update_quantity(&mut self, id: LineItemId, quantity: u32) {
        if quantity < 1 || self.state.item(id).is_none() {
            return;
        }

        self.dispatch(CartCommand::SetLoading { id, loading: true });
        self.dispatch(CartCommand::SetQuantity { id, quantity });

        if let Err(error) = self.api.update_quantity(id, quantity).await {
            warn!(%error, "quantity update failed to sync, keeping optimistic state");
        }

        self.dispatch(CartCommand::SetLoading { id, loading: false });
    }

    /// Remove a line. The removal lands locally before the sync; remote
    /// failure does not resurrect the line.
    pub async fn remove_item(&mut self, id: LineItemId) {
        if self.state.item(id).is_none() {
            return;
        }

        self.dispatch(CartCommand::SetLoading { id, loading: true });
        self.dispatch(CartCommand::Remove(id));

        if let Err(error) = self.api.remove_item(id).await {
            warn!(%error, "cart remove failed to sync");
        }

        self.dispatch(CartCommand::SetLoading { id, loading: false });
    }

    /// Validate a promo code against the remote service and apply it.
    ///
    /// Not optimistic: the discount only lands once the remote validator
    /// confirms it, so an unconfirmed discount can never distort checkout
    /// totals.
    ///
    /// # Errors
    ///
    /// The remote rejection is returned to the caller; prior promo state is
    /// unchanged.
    pub async fn apply_promo_code(&mut self, code: &str) -> Result<(), ApiError> {
        let discount = self.api.apply_promo(code).await?;

        self.dispatch(CartCommand::SetPromo(Promo {
            code: code.to_owned(),
            discount,
        }));

        Ok(())
    }

    /// Drop the promo locally and fire a best-effort remote removal.
    pub async fn remove_promo(&mut self) {
        self.dispatch(CartCommand::ClearPromo);

        if let Err(error) = self.api.remove_promo().await {
            warn!(%error, "promo removal failed to sync");
        }
    }

    /// Empty the cart and erase the persisted copy. Used after an order
    /// completes.
    pub fn clear(&mut self) {
        self.dispatch(CartCommand::Clear);
    }
}
