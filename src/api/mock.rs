//! Mock commerce API
//!
//! In-memory stand-in for the remote backend: a promo table, canned
//! shipping rates, a fixed tax quote, sequential order ids, and switches for
//! failure and 401 injection. Used by tests and frontend-only demos.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};

use crate::api::{ApiError, CartSnapshot, CommerceApi, NewCartItem};
use crate::cart::LineItemId;
use crate::catalog::{Product, ProductId};
use crate::checkout::{OrderId, OrderPayload, ShippingAddress, ShippingRate};
use crate::session::{Credentials, Registration, User};

/// In-memory mock of the remote commerce backend.
///
/// Clones share one underlying state, so a test can keep a handle for
/// injecting failures while the store under test owns another.
#[derive(Debug, Clone)]
pub struct MockCommerceApi {
    state: Rc<RefCell<MockState>>,
}

#[derive(Debug)]
struct MockState {
    offline: bool,
    force_unauthorized: bool,
    authenticated: Option<User>,
    accounts: Vec<Registration>,
    remote_cart: CartSnapshot,
    products: FxHashMap<ProductId, Product>,
    promos: FxHashMap<String, Money<'static, Currency>>,
    rates: Vec<ShippingRate>,
    tax: Money<'static, Currency>,
    next_order: u32,
    calls: Vec<&'static str>,
}

impl MockCommerceApi {
    /// A mock with default canned rates and zero tax, denominated in
    /// `currency`.
    pub fn new(currency: &'static Currency) -> Self {
        let rates = vec![
            ShippingRate {
                id: "standard".to_owned(),
                label: "Standard".to_owned(),
                price: Money::from_minor(500, currency),
                delivery_window: "5–7 business days".to_owned(),
            },
            ShippingRate {
                id: "express".to_owned(),
                label: "Express".to_owned(),
                price: Money::from_minor(1_500, currency),
                delivery_window: "1–2 business days".to_owned(),
            },
        ];

        Self {
            state: Rc::new(RefCell::new(MockState {
                offline: false,
                force_unauthorized: false,
                authenticated: None,
                accounts: Vec::new(),
                remote_cart: CartSnapshot::default(),
                products: FxHashMap::default(),
                promos: FxHashMap::default(),
                rates,
                tax: Money::from_minor(0, currency),
                next_order: 0,
                calls: Vec::new(),
            })),
        }
    }

    /// Seed a catalog product.
    #[must_use]
    pub fn with_product(self, product: Product) -> Self {
        self.state
            .borrow_mut()
            .products
            .insert(product.id.clone(), product);
        self
    }

    /// Seed a promo code and the discount it grants.
    #[must_use]
    pub fn with_promo(self, code: &str, discount: Money<'static, Currency>) -> Self {
        self.state
            .borrow_mut()
            .promos
            .insert(code.to_owned(), discount);
        self
    }

    /// Start with an authenticated session.
    #[must_use]
    pub fn with_session(self, user: User) -> Self {
        self.state.borrow_mut().authenticated = Some(user);
        self
    }

    /// Seed a registered account that can later sign in.
    #[must_use]
    pub fn with_account(self, registration: Registration) -> Self {
        self.state.borrow_mut().accounts.push(registration);
        self
    }

    /// Seed the server-side cart returned by `get_cart`.
    #[must_use]
    pub fn with_remote_cart(self, snapshot: CartSnapshot) -> Self {
        self.state.borrow_mut().remote_cart = snapshot;
        self
    }

    /// Set the tax amount quoted by `calculate_tax`.
    #[must_use]
    pub fn with_tax(self, tax: Money<'static, Currency>) -> Self {
        self.state.borrow_mut().tax = tax;
        self
    }

    /// Make every call fail with [`ApiError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// Make every call fail with [`ApiError::Unauthorized`].
    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.state.borrow_mut().force_unauthorized = unauthorized;
    }

    /// Names of the calls received so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }

    fn guard(&self, name: &'static str) -> Result<(), ApiError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(name);

        if state.offline {
            return Err(ApiError::Unavailable);
        }

        if state.force_unauthorized {
            return Err(ApiError::Unauthorized);
        }

        Ok(())
    }
}

impl CommerceApi for MockCommerceApi {
    async fn get_cart(&self) -> Result<CartSnapshot, ApiError> {
        self.guard("get_cart")?;
        let state = self.state.borrow();

        // Guests have no server cart; the store falls back to local storage.
        if state.authenticated.is_none() {
            return Err(ApiError::Unauthorized);
        }

        Ok(state.remote_cart.clone())
    }

    async fn add_item(&self, _item: &NewCartItem) -> Result<(), ApiError> {
        self.guard("add_item")
    }

    async fn update_quantity(&self, _id: LineItemId, _quantity: u32) -> Result<(), ApiError> {
        self.guard("update_quantity")
    }

    async fn remove_item(&self, _id: LineItemId) -> Result<(), ApiError> {
        self.guard("remove_item")
    }

    async fn apply_promo(&self, code: &str) -> Result<Money<'static, Currency>, ApiError> {
        self.guard("apply_promo")?;

        self.state
            .borrow()
            .promos
            .get(code)
            .copied()
            .ok_or_else(|| ApiError::Rejected("Invalid promo code".to_owned()))
    }

    async fn remove_promo(&self) -> Result<(), ApiError> {
        self.guard("remove_promo")
    }

    async fn validate_cart(&self) -> Result<(), ApiError> {
        self.guard("validate_cart")
    }

    async fn get_shipping_rates(
        &self,
        _address: &ShippingAddress,
    ) -> Result<Vec<ShippingRate>, ApiError> {
        self.guard("get_shipping_rates")?;
        Ok(self.state.borrow().rates.clone())
    }

    async fn calculate_tax(
        &self,
        _address: &ShippingAddress,
    ) -> Result<Money<'static, Currency>, ApiError> {
        self.guard("calculate_tax")?;
        Ok(self.state.borrow().tax)
    }

    async fn create_order(&self, _payload: &OrderPayload) -> Result<OrderId, ApiError> {
        self.guard("create_order")?;

        let mut state = self.state.borrow_mut();
        state.next_order += 1;
        Ok(OrderId::new(format!("ORD-{:06}", state.next_order)))
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.guard("get_product")?;

        self.state
            .borrow()
            .products
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::Rejected(format!("unknown product {id}")))
    }

    async fn get_session(&self) -> Result<Option<User>, ApiError> {
        self.guard("get_session")?;
        Ok(self.state.borrow().authenticated.clone())
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.guard("login")?;

        let mut state = self.state.borrow_mut();

        let account = state
            .accounts
            .iter()
            .find(|account| {
                account.email == credentials.email && account.password == credentials.password
            })
            .ok_or_else(|| ApiError::Rejected("Invalid email or password".to_owned()))?;

        let user = User {
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
        };

        state.authenticated = Some(user.clone());
        Ok(user)
    }

    async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        self.guard("register")?;

        let mut state = self.state.borrow_mut();

        if state
            .accounts
            .iter()
            .any(|account| account.email == registration.email)
        {
            return Err(ApiError::Rejected("Email already registered".to_owned()));
        }

        let user = User {
            first_name: registration.first_name.clone(),
            last_name: registration.last_name.clone(),
            email: registration.email.clone(),
        };

        state.accounts.push(registration.clone());
        state.authenticated = Some(user.clone());
        Ok(user)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.guard("logout")?;
        self.state.borrow_mut().authenticated = None;
        Ok(())
    }
}
