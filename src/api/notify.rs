//! Session-expiry notification
//!
//! Wraps any [`CommerceApi`] so every [`ApiError::Unauthorized`] response
//! also raises the process-wide session-expired signal. The auth store
//! subscribes to the signal; the cart and checkout call sites stay free of
//! auth concerns.

use rusty_money::{Money, iso::Currency};

use crate::api::{ApiError, CartSnapshot, CommerceApi, NewCartItem};
use crate::cart::LineItemId;
use crate::catalog::{Product, ProductId};
use crate::checkout::{OrderId, OrderPayload, ShippingAddress, ShippingRate};
use crate::session::{Credentials, Registration, SessionEvents, User};

/// A [`CommerceApi`] decorator that broadcasts session expiry.
#[derive(Debug, Clone)]
pub struct SessionNotifying<A> {
    inner: A,
    events: SessionEvents,
}

impl<A> SessionNotifying<A> {
    /// Wrap an API client with the given event channel.
    pub fn new(inner: A, events: SessionEvents) -> Self {
        Self { inner, events }
    }

    fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if matches!(result, Err(ApiError::Unauthorized)) {
            self.events.notify_expired();
        }
        result
    }
}

impl<A: CommerceApi> CommerceApi for SessionNotifying<A> {
    async fn get_cart(&self) -> Result<CartSnapshot, ApiError> {
        let result = self.inner.get_cart().await;
        self.observe(result)
    }

    async fn add_item(&self, item: &NewCartItem) -> Result<(), ApiError> {
        let result = self.inner.add_item(item).await;
        self.observe(result)
    }

    async fn update_quantity(&self, id: LineItemId, quantity: u32) -> Result<(), ApiError> {
        let result = self.inner.update_quantity(id, quantity).await;
        self.observe(result)
    }

    async fn remove_item(&self, id: LineItemId) -> Result<(), ApiError> {
        let result = self.inner.remove_item(id).await;
        self.observe(result)
    }

    async fn apply_promo(&self, code: &str) -> Result<Money<'static, Currency>, ApiError> {
        let result = self.inner.apply_promo(code).await;
        self.observe(result)
    }

    async fn remove_promo(&self) -> Result<(), ApiError> {
        let result = self.inner.remove_promo().await;
        self.observe(result)
    }

    async fn validate_cart(&self) -> Result<(), ApiError> {
        let result = self.inner.validate_cart().await;
        self.observe(result)
    }

    async fn get_shipping_rates(
        &self,
        address: &ShippingAddress,
    ) -> Result<Vec<ShippingRate>, ApiError> {
        let result = self.inner.get_shipping_rates(address).await;
        self.observe(result)
    }

    async fn calculate_tax(
        &self,
        address: &ShippingAddress,
    ) -> Result<Money<'static, Currency>, ApiError> {
        let result = self.inner.calculate_tax(address).await;
        self.observe(result)
    }

    async fn create_order(&self, payload: &OrderPayload) -> Result<OrderId, ApiError> {
        let result = self.inner.create_order(payload).await;
        self.observe(result)
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let result = self.inner.get_product(id).await;
        self.observe(result)
    }

    async fn get_session(&self) -> Result<Option<User>, ApiError> {
        let result = self.inner.get_session().await;
        self.observe(result)
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let result = self.inner.login(credentials).await;
        self.observe(result)
    }

    async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        let result = self.inner.register(registration).await;
        self.observe(result)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let result = self.inner.logout().await;
        self.observe(result)
    }
}
