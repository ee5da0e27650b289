//! Remote commerce API boundary
//!
//! The storefront treats the commerce backend as an opaque collaborator:
//! every call is asynchronous and fallible, and a 401-class failure is
//! broadcast as a session-expired event (see [`notify`]) rather than handled
//! at each call site.

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::cart::{LineItem, LineItemId, Promo};
use crate::catalog::{Product, ProductId, VariantId};
use crate::checkout::{OrderId, OrderPayload, ShippingAddress, ShippingRate};
use crate::session::{Credentials, Registration, User};

pub mod mock;
pub mod notify;

/// Errors surfaced by the remote boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// 401-class failure: no session, or the session expired.
    #[error("session expired or unauthenticated")]
    Unauthorized,

    /// The remote understood and refused the request.
    #[error("{0}")]
    Rejected(String),

    /// The remote could not be reached.
    #[error("remote service unavailable")]
    Unavailable,

    /// The response was superseded by a newer request and discarded.
    #[error("response superseded by a newer request")]
    Stale,
}

/// Cart contents as reported by the remote source of truth.
#[derive(Debug, Clone, Default)]
pub struct CartSnapshot {
    /// Lines in the remote cart.
    pub items: Vec<LineItem>,

    /// Applied promo, if any.
    pub promo: Option<Promo>,
}

/// Request payload for adding a line to the remote cart.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    /// Catalog product reference.
    pub product_id: ProductId,

    /// Catalog variant reference.
    pub variant_id: VariantId,

    /// Units requested.
    pub quantity: u32,
}

/// The remote commerce backend.
///
/// Implementations decide transport; [`mock::MockCommerceApi`] is the
/// in-memory stand-in used by tests and demos.
pub trait CommerceApi {
    /// Fetch the authenticated shopper's cart.
    async fn get_cart(&self) -> Result<CartSnapshot, ApiError>;

    /// Append a line to the remote cart.
    async fn add_item(&self, item: &NewCartItem) -> Result<(), ApiError>;

    /// Change a remote line's quantity.
    async fn update_quantity(&self, id: LineItemId, quantity: u32) -> Result<(), ApiError>;

    /// Delete a remote line.
    async fn remove_item(&self, id: LineItemId) -> Result<(), ApiError>;

    /// Validate a promo code; returns the discount it grants.
    async fn apply_promo(&self, code: &str) -> Result<Money<'static, Currency>, ApiError>;

    /// Drop the promo from the remote cart.
    async fn remove_promo(&self) -> Result<(), ApiError>;

    /// Check the cart is still orderable (stock, prices).
    async fn validate_cart(&self) -> Result<(), ApiError>;

    /// Quote shipping rates for an address.
    async fn get_shipping_rates(
        &self,
        address: &ShippingAddress,
    ) -> Result<Vec<ShippingRate>, ApiError>;

    /// Compute tax for an address.
    async fn calculate_tax(
        &self,
        address: &ShippingAddress,
    ) -> Result<Money<'static, Currency>, ApiError>;

    /// Create an order from the payload.
    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderId, ApiError>;

    /// Fetch a product detail snapshot.
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError>;

    /// Current session, if any.
    async fn get_session(&self) -> Result<Option<User>, ApiError>;

    /// Authenticate with credentials.
    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError>;

    /// Create an account and session.
    async fn register(&self, registration: &Registration) -> Result<User, ApiError>;

    /// End the session.
    async fn logout(&self) -> Result<(), ApiError>;
}
