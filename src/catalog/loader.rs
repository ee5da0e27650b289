//! Product loader
//!
//! Fetch-through-cache for product details with stale-response suppression.
//! Each fetch is stamped with a generation token; a completion observed
//! after a newer fetch began is discarded rather than applied, so a slow
//! response can never overwrite state the caller has moved on from.

use std::cell::Cell;
use std::time::Duration;

use crate::api::{ApiError, CommerceApi};
use crate::catalog::{Product, ProductCache, ProductId};

/// Token identifying one in-flight product fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken(u64);

/// Loads product details through the TTL cache.
#[derive(Debug)]
pub struct ProductLoader<A> {
    api: A,
    cache: ProductCache,
    generation: Cell<u64>,
}

impl<A: CommerceApi> ProductLoader<A> {
    /// Create a loader whose cache entries expire after `ttl`.
    pub fn new(api: A, ttl: Duration) -> Self {
        Self {
            api,
            cache: ProductCache::new(ttl),
            generation: Cell::new(0),
        }
    }

    /// Begin a new fetch, superseding any fetch still in flight.
    pub fn begin(&self) -> FetchToken {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        FetchToken(next)
    }

    /// Whether `token` still identifies the newest fetch.
    pub fn is_current(&self, token: FetchToken) -> bool {
        self.generation.get() == token.0
    }

    /// Resolve a fetch begun with [`begin`](Self::begin).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Stale`] when a newer fetch began while this one
    /// was suspended; the response is discarded and never cached. Remote
    /// failures are passed through.
    pub async fn fetch(&mut self, token: FetchToken, id: &ProductId) -> Result<Product, ApiError> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit.clone());
        }

        let product = self.api.get_product(id).await?;

        if !self.is_current(token) {
            return Err(ApiError::Stale);
        }

        self.cache.insert(product.clone());
        Ok(product)
    }

    /// Load a product detail snapshot, consulting the cache first.
    ///
    /// # Errors
    ///
    /// See [`fetch`](Self::fetch).
    pub async fn load(&mut self, id: &ProductId) -> Result<Product, ApiError> {
        let token = self.begin();
        self.fetch(token, id).await
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::USD};
    use testresult::TestResult;

    use crate::api::mock::MockCommerceApi;
    use crate::catalog::{Variant, VariantId};

    use super::*;

    fn test_product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: "Odor Pack".to_owned(),
            images: vec!["/images/main.jpg".to_owned()],
            variants: vec![Variant {
                id: VariantId::new("single"),
                label: "Single Pair".to_owned(),
                price: Money::from_minor(2_499, USD),
                compare_price: None,
                in_stock: true,
            }],
        }
    }

    #[tokio::test]
    async fn load_fetches_and_caches() -> TestResult {
        let api = MockCommerceApi::new(USD).with_product(test_product("odor-pack"));
        let mut loader = ProductLoader::new(api.clone(), Duration::from_secs(300));

        let product = loader.load(&ProductId::new("odor-pack")).await?;
        assert_eq!(product.name, "Odor Pack");

        // A second load is served from the cache even if the remote is down.
        api.set_offline(true);
        let cached = loader.load(&ProductId::new("odor-pack")).await?;
        assert_eq!(cached.name, "Odor Pack");

        Ok(())
    }

    #[tokio::test]
    async fn superseded_fetch_is_discarded() {
        let api = MockCommerceApi::new(USD).with_product(test_product("odor-pack"));
        let mut loader = ProductLoader::new(api, Duration::from_secs(300));

        let first = loader.begin();
        let second = loader.begin();

        assert!(!loader.is_current(first));
        assert!(loader.is_current(second));

        let result = loader.fetch(first, &ProductId::new("odor-pack")).await;

        assert!(matches!(result, Err(ApiError::Stale)));
        assert!(loader.cache.is_empty());
    }

    #[tokio::test]
    async fn remote_failure_is_passed_through() {
        let api = MockCommerceApi::new(USD);
        api.set_offline(true);
        let mut loader = ProductLoader::new(api, Duration::from_secs(300));

        let result = loader.load(&ProductId::new("odor-pack")).await;

        assert!(matches!(result, Err(ApiError::Unavailable)));
    }
}
