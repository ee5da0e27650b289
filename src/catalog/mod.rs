//! Catalog
//!
//! Product and variant snapshots as delivered by the remote catalog, plus a
//! small TTL cache for product detail lookups.

use std::fmt;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};

pub mod loader;

/// Catalog reference to a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    /// Wrap a raw catalog reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw catalog reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog reference to a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantId(String);

impl VariantId {
    /// Wrap a raw catalog reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw catalog reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A purchasable configuration of a product, with its own price.
#[derive(Debug, Clone)]
pub struct Variant {
    /// Catalog variant reference.
    pub id: VariantId,

    /// Display label (e.g. "2-Pack").
    pub label: String,

    /// Current price of the variant.
    pub price: Money<'static, Currency>,

    /// Struck-through comparison price, if the variant is discounted.
    pub compare_price: Option<Money<'static, Currency>>,

    /// Whether the variant can currently be purchased.
    pub in_stock: bool,
}

/// A product as snapshotted from the remote catalog.
#[derive(Debug, Clone)]
pub struct Product {
    /// Catalog product reference.
    pub id: ProductId,

    /// Product name.
    pub name: String,

    /// Gallery image URLs, primary first.
    pub images: Vec<String>,

    /// Purchasable variants.
    pub variants: Vec<Variant>,
}

impl Product {
    /// Look up a variant by id.
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|variant| &variant.id == id)
    }

    /// The image used for cart line snapshots: the first gallery image, or
    /// an empty string when the product has none.
    pub fn primary_image(&self) -> &str {
        self.images.first().map_or("", String::as_str)
    }
}

/// TTL cache for product detail lookups.
///
/// Entries are pruned on read once they outlive the configured duration;
/// there is no background eviction.
#[derive(Debug)]
pub struct ProductCache {
    ttl: Duration,
    entries: FxHashMap<ProductId, CacheEntry>,
}

#[derive(Debug)]
struct CacheEntry {
    fetched_at: Instant,
    product: Product,
}

impl ProductCache {
    /// Create a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: FxHashMap::default(),
        }
    }

    /// Look up a product, pruning the entry if it has expired.
    pub fn get(&mut self, id: &ProductId) -> Option<&Product> {
        let expired = self
            .entries
            .get(id)
            .is_some_and(|entry| entry.fetched_at.elapsed() > self.ttl);

        if expired {
            self.entries.remove(id);
        }

        self.entries.get(id).map(|entry| &entry.product)
    }

    /// Store a freshly fetched product.
    pub fn insert(&mut self, product: Product) {
        self.insert_at(Instant::now(), product);
    }

    fn insert_at(&mut self, fetched_at: Instant, product: Product) {
        self.entries
            .insert(product.id.clone(), CacheEntry { fetched_at, product });
    }

    /// Number of cached products, expired entries included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
