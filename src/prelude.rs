//! Satchel prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    api::{
        ApiError, CartSnapshot, CommerceApi, NewCartItem, mock::MockCommerceApi,
        notify::SessionNotifying,
    },
    cart::{
        CartCommand, CartError, CartState, LineItem, LineItemId, Promo, store::CartStore,
    },
    catalog::{
        Product, ProductCache, ProductId, Variant, VariantId,
        loader::{FetchToken, ProductLoader},
    },
    checkout::{
        AddressUpdate, CheckoutCommand, CheckoutFlow, CheckoutState, CheckoutStep, OrderId,
        OrderPayload, ShippingAddress, ShippingRate,
        validate::{AddressField, ValidationErrors, validate_shipping_address},
    },
    config::{ConfigError, StoreConfig},
    session::{AuthStore, Credentials, Registration, SessionEvent, SessionEvents, User},
    storage::{
        CartStorage, JsonFileStorage, MemoryStorage, StorageError, StoredCart, StoredLineItem,
    },
    totals::{OrderTotals, TotalsError, order_totals},
};
