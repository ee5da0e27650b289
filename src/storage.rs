//! Durable cart storage
//!
//! The cart mirrors itself into a single JSON blob under a fixed key
//! whenever it is non-empty or holds a promo, and deletes the entry
//! otherwise. There is no versioning or migration scheme; unreadable
//! payloads are logged and treated as absent.

use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rusty_money::{Money, iso};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::cart::{CartState, LineItem, LineItemId, Promo};
use crate::catalog::{ProductId, VariantId};

/// Errors raised by cart storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The cart could not be encoded.
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

/// Persisted shape of one cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLineItem {
    /// Line identifier.
    pub id: LineItemId,
    /// Catalog product reference.
    pub product_id: ProductId,
    /// Catalog variant reference.
    pub variant_id: VariantId,
    /// Product name snapshot.
    pub name: String,
    /// Display image snapshot.
    pub image: String,
    /// Variant label snapshot.
    pub variant_label: String,
    /// Units of the variant.
    pub quantity: u32,
    /// Unit price in minor units.
    pub unit_price_minor: i64,
}

/// The JSON blob written to durable local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCart {
    /// ISO 4217 code every amount is denominated in.
    pub currency: String,
    /// Persisted lines.
    pub items: Vec<StoredLineItem>,
    /// Applied promo code, if any.
    pub promo_code: Option<String>,
    /// Promo discount in minor units; zero when no promo is applied.
    pub promo_discount_minor: i64,
}

impl StoredCart {
    /// Capture the persistable portion of the cart.
    #[must_use]
    pub fn snapshot(state: &CartState, currency: &'static iso::Currency) -> Self {
        Self {
            currency: currency.iso_alpha_code.to_owned(),
            items: state
                .items()
                .iter()
                .map(|line| StoredLineItem {
                    id: line.id,
                    product_id: line.product_id.clone(),
                    variant_id: line.variant_id.clone(),
                    name: line.name.clone(),
                    image: line.image.clone(),
                    variant_label: line.variant_label.clone(),
                    quantity: line.quantity,
                    unit_price_minor: line.unit_price.to_minor_units(),
                })
                .collect(),
            promo_code: state.promo().map(|promo| promo.code.clone()),
            promo_discount_minor: state
                .promo()
                .map_or(0, |promo| promo.discount.to_minor_units()),
        }
    }

    /// Revive the stored blob into cart contents.
    ///
    /// Returns `None` when the stored currency code is not a known ISO 4217
    /// code, the defensive stance for a blob written by a different schema.
    #[must_use]
    pub fn revive(self) -> Option<(Vec<LineItem>, Option<Promo>)> {
        let currency = iso::find(&self.currency)?;

        let items = self
            .items
            .into_iter()
            .map(|stored| LineItem {
                id: stored.id,
                product_id: stored.product_id,
                variant_id: stored.variant_id,
                name: stored.name,
                image: stored.image,
                variant_label: stored.variant_label,
                quantity: stored.quantity,
                unit_price: Money::from_minor(stored.unit_price_minor, currency),
            })
            .collect();

        let promo = self.promo_code.map(|code| Promo {
            code,
            discount: Money::from_minor(self.promo_discount_minor, currency),
        });

        Some((items, promo))
    }
}

/// Durable local storage for the persisted cart blob.
pub trait CartStorage {
    /// Read the stored cart. Absent and unreadable entries both yield
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] only for I/O failures other than the entry
    /// being absent.
    fn load(&self) -> Result<Option<StoredCart>, StorageError>;

    /// Write the blob, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when encoding or writing fails.
    fn save(&self, cart: &StoredCart) -> Result<(), StorageError>;

    /// Delete the entry. Deleting an absent entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] for I/O failures.
    fn clear(&self) -> Result<(), StorageError>;
}

/// File-backed storage: one JSON file named after the storage key.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Storage rooted at `dir`, keyed by `key`.
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    /// Path of the blob file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<StoredCart>, StorageError> {
        let payload = match fs::read_to_string(&self.path) {
            Ok(payload) => payload,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        match serde_json::from_str(&payload) {
            Ok(stored) => Ok(Some(stored)),
            Err(error) => {
                warn!(%error, "stored cart was unreadable, treating as absent");
                Ok(None)
            }
        }
    }

    fn save(&self, cart: &StoredCart) -> Result<(), StorageError> {
        let payload = serde_json::to_string(cart)?;
        fs::write(&self.path, payload)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entry: RefCell<Option<StoredCart>>,
}

impl MemoryStorage {
    /// Empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an entry is currently stored.
    pub fn has_entry(&self) -> bool {
        self.entry.borrow().is_some()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self) -> Result<Option<StoredCart>, StorageError> {
        Ok(self.entry.borrow().clone())
    }

    fn save(&self, cart: &StoredCart) -> Result<(), StorageError> {
        *self.entry.borrow_mut() = Some(cart.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.entry.borrow_mut() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::cart::{CartCommand, apply};

    use super::*;

    fn seeded_state() -> CartState {
        let line = LineItem {
            id: LineItemId::generate(),
            product_id: ProductId::new("odor-pack"),
            variant_id: VariantId::new("double"),
            name: "Odor Pack".to_owned(),
            image: "/images/main.jpg".to_owned(),
            variant_label: "2-Pack".to_owned(),
            quantity: 2,
            unit_price: Money::from_minor(4_499, USD),
        };

        let state = apply(CartState::default(), CartCommand::Add(line));
        apply(
            state,
            CartCommand::SetPromo(Promo {
                code: "FRESH10".to_owned(),
                discount: Money::from_minor(1_000, USD),
            }),
        )
    }

    #[test]
    fn snapshot_and_revive_round_trip() {
        let stored = StoredCart::snapshot(&seeded_state(), USD);

        let Some((items, promo)) = stored.revive() else {
            panic!("expected the snapshot to revive");
        };

        assert_eq!(items.len(), 1);
        assert_eq!(
            items.first().map(|l| (l.quantity, l.unit_price)),
            Some((2, Money::from_minor(4_499, USD)))
        );
        assert_eq!(
            promo,
            Some(Promo {
                code: "FRESH10".to_owned(),
                discount: Money::from_minor(1_000, USD),
            })
        );
    }

    #[test]
    fn revive_rejects_unknown_currency() {
        let mut stored = StoredCart::snapshot(&seeded_state(), USD);
        stored.currency = "???".to_owned();

        assert!(stored.revive().is_none());
    }

    #[test]
    fn file_storage_round_trips() -> TestResult {
        let dir = tempfile::tempdir()?;
        let storage = JsonFileStorage::new(dir.path(), "storefront_cart");

        assert!(storage.load()?.is_none());

        storage.save(&StoredCart::snapshot(&seeded_state(), USD))?;

        let loaded = storage.load()?;
        assert_eq!(loaded.map(|cart| cart.items.len()), Some(1));

        storage.clear()?;
        assert!(storage.load()?.is_none());

        Ok(())
    }

    #[test]
    fn file_storage_clear_is_idempotent() -> TestResult {
        let dir = tempfile::tempdir()?;
        let storage = JsonFileStorage::new(dir.path(), "storefront_cart");

        storage.clear()?;
        storage.clear()?;

        Ok(())
    }

    #[test]
    fn corrupt_payload_is_treated_as_absent() -> TestResult {
        let dir = tempfile::tempdir()?;
        let storage = JsonFileStorage::new(dir.path(), "storefront_cart");

        fs::write(storage.path(), "{not json")?;

        assert!(storage.load()?.is_none());

        Ok(())
    }

    #[test]
    fn memory_storage_round_trips() -> TestResult {
        let storage = MemoryStorage::new();

        storage.save(&StoredCart::snapshot(&seeded_state(), USD))?;
        assert!(storage.has_entry());

        storage.clear()?;
        assert!(!storage.has_entry());

        Ok(())
    }
}
