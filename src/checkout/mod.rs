//! Checkout
//!
//! Step state machine for the checkout flow: shipping address capture and
//! validation, rate selection, remote tax and order operations, and the pure
//! reducer every transition flows through.

use std::collections::BTreeSet;
use std::fmt;

use rusty_money::{Money, iso::Currency};

use crate::api::{ApiError, CommerceApi};
use crate::cart::{CartState, LineItem};
use crate::totals::OrderTotals;

pub mod validate;

use validate::{ValidationErrors, validate_shipping_address};

/// Steps of the checkout flow, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckoutStep {
    /// Shipping address capture.
    #[default]
    Shipping,
    /// Payment details.
    Payment,
    /// Final review before the order is placed.
    Review,
}

impl CheckoutStep {
    /// Zero-based position in the flow.
    pub fn index(self) -> usize {
        match self {
            CheckoutStep::Shipping => 0,
            CheckoutStep::Payment => 1,
            CheckoutStep::Review => 2,
        }
    }

    /// The step before this one, if any.
    pub fn previous(self) -> Option<Self> {
        match self {
            CheckoutStep::Shipping => None,
            CheckoutStep::Payment => Some(CheckoutStep::Shipping),
            CheckoutStep::Review => Some(CheckoutStep::Payment),
        }
    }
}

/// The shipping address form model. All fields are free-form strings; the
/// format rules live in [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingAddress {
    /// Shopper's first name.
    pub first_name: String,
    /// Shopper's last name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
    /// Street address.
    pub address1: String,
    /// Apartment, suite, etc.
    pub address2: String,
    /// City.
    pub city: String,
    /// State or province.
    pub state: String,
    /// ZIP or postal code.
    pub zip_code: String,
    /// Country code.
    pub country: String,
}

impl Default for ShippingAddress {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            address1: String::new(),
            address2: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            country: "US".to_owned(),
        }
    }
}

/// Partial update to the address form; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct AddressUpdate {
    /// New first name.
    pub first_name: Option<String>,
    /// New last name.
    pub last_name: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// New phone number.
    pub phone: Option<String>,
    /// New street address.
    pub address1: Option<String>,
    /// New second address line.
    pub address2: Option<String>,
    /// New city.
    pub city: Option<String>,
    /// New state or province.
    pub state: Option<String>,
    /// New ZIP or postal code.
    pub zip_code: Option<String>,
    /// New country code.
    pub country: Option<String>,
}

impl ShippingAddress {
    fn merge(&mut self, update: AddressUpdate) {
        let AddressUpdate {
            first_name,
            last_name,
            email,
            phone,
            address1,
            address2,
            city,
            state,
            zip_code,
            country,
        } = update;

        merge_field(&mut self.first_name, first_name);
        merge_field(&mut self.last_name, last_name);
        merge_field(&mut self.email, email);
        merge_field(&mut self.phone, phone);
        merge_field(&mut self.address1, address1);
        merge_field(&mut self.address2, address2);
        merge_field(&mut self.city, city);
        merge_field(&mut self.state, state);
        merge_field(&mut self.zip_code, zip_code);
        merge_field(&mut self.country, country);
    }
}

fn merge_field(target: &mut String, update: Option<String>) {
    if let Some(value) = update {
        *target = value;
    }
}

/// A shipping option quoted for an address.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingRate {
    /// Carrier service identifier.
    pub id: String,

    /// Display label (e.g. "Standard").
    pub label: String,

    /// Price charged for this service.
    pub price: Money<'static, Currency>,

    /// Delivery window shown to the shopper (e.g. "5–7 business days").
    pub delivery_window: String,
}

/// Identifier of a created order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap a raw order reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw order reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload submitted to order creation.
#[derive(Debug, Clone)]
pub struct OrderPayload {
    /// Lines being purchased.
    pub items: Vec<LineItem>,

    /// Where the order ships.
    pub shipping_address: ShippingAddress,

    /// The shopper's chosen shipping service, if one was selected.
    pub shipping_rate: Option<ShippingRate>,

    /// Grand total charged.
    pub total: Money<'static, Currency>,
}

/// Checkout state. Created fresh per checkout session and reset after a
/// completed order or explicit cancellation.
#[derive(Debug, Clone, Default)]
pub struct CheckoutState {
    current_step: CheckoutStep,
    completed_steps: BTreeSet<CheckoutStep>,
    shipping_address: ShippingAddress,
    shipping_rates: Vec<ShippingRate>,
    selected_rate: Option<ShippingRate>,
    tax: Option<Money<'static, Currency>>,
    errors: ValidationErrors,
    order_id: Option<OrderId>,
}

impl CheckoutState {
    /// The step the shopper is on.
    pub fn current_step(&self) -> CheckoutStep {
        self.current_step
    }

    /// Whether a step has been validated and completed.
    pub fn is_step_completed(&self, step: CheckoutStep) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Number of completed steps.
    pub fn completed_step_count(&self) -> usize {
        self.completed_steps.len()
    }

    /// The address form model.
    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    /// Rates quoted for the captured address.
    pub fn shipping_rates(&self) -> &[ShippingRate] {
        &self.shipping_rates
    }

    /// The shopper's chosen rate, if any.
    pub fn selected_rate(&self) -> Option<&ShippingRate> {
        self.selected_rate.as_ref()
    }

    /// The selected rate's price, the shipping cost fed into totals.
    pub fn shipping_cost(&self) -> Option<Money<'static, Currency>> {
        self.selected_rate.as_ref().map(|rate| rate.price)
    }

    /// Authoritative tax from the remote, once calculated.
    pub fn tax(&self) -> Option<Money<'static, Currency>> {
        self.tax
    }

    /// Field errors from the last failed submission.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// The created order's id; its presence marks the flow as done.
    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }
}

/// Commands applied by [`apply`]; every checkout transition is expressed as
/// one.
#[derive(Debug, Clone)]
pub enum CheckoutCommand {
    /// Move to a step.
    GoToStep(CheckoutStep),

    /// Record a step as validated; recording twice is a no-op.
    CompleteStep(CheckoutStep),

    /// Merge a partial update into the address form.
    UpdateAddress(AddressUpdate),

    /// Store quoted shipping rates.
    SetRates(Vec<ShippingRate>),

    /// Record the shopper's rate choice.
    SelectRate(ShippingRate),

    /// Store the authoritative tax amount.
    SetTax(Money<'static, Currency>),

    /// Replace the field error map.
    SetErrors(ValidationErrors),

    /// Record the created order.
    SetOrderId(OrderId),

    /// Return to the initial state.
    Reset,
}

/// The checkout transition function. Pure and total.
#[must_use]
pub fn apply(mut state: CheckoutState, command: CheckoutCommand) -> CheckoutState {
    match command {
        CheckoutCommand::GoToStep(step) => state.current_step = step,

        CheckoutCommand::CompleteStep(step) => {
            state.completed_steps.insert(step);
        }

        CheckoutCommand::UpdateAddress(update) => state.shipping_address.merge(update),

        CheckoutCommand::SetRates(rates) => state.shipping_rates = rates,

        CheckoutCommand::SelectRate(rate) => state.selected_rate = Some(rate),

        CheckoutCommand::SetTax(tax) => state.tax = Some(tax),

        CheckoutCommand::SetErrors(errors) => state.errors = errors,

        CheckoutCommand::SetOrderId(id) => state.order_id = Some(id),

        CheckoutCommand::Reset => state = CheckoutState::default(),
    }

    state
}

/// Drives the checkout flow against the remote commerce API.
///
/// One instance exists per checkout session; all mutation flows through
/// [`apply`].
#[derive(Debug)]
pub struct CheckoutFlow<A> {
    api: A,
    state: CheckoutState,
}

impl<A: CommerceApi> CheckoutFlow<A> {
    /// Start a fresh checkout session.
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: CheckoutState::default(),
        }
    }

    /// Current checkout state.
    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    fn dispatch(&mut self, command: CheckoutCommand) {
        self.state = apply(std::mem::take(&mut self.state), command);
    }

    /// Merge a partial update into the address form. Any update clears all
    /// current field errors.
    pub fn update_shipping_address(&mut self, update: AddressUpdate) {
        self.dispatch(CheckoutCommand::UpdateAddress(update));
        self.dispatch(CheckoutCommand::SetErrors(ValidationErrors::default()));
    }

    /// Validate the address and advance to the payment step.
    ///
    /// # Errors
    ///
    /// On validation failure the field errors are stored for the form, the
    /// flow stays on the shipping step, and the same errors are returned.
    pub fn submit_shipping_address(&mut self) -> Result<(), ValidationErrors> {
        let errors = validate_shipping_address(self.state.shipping_address());

        if !errors.is_empty() {
            self.dispatch(CheckoutCommand::SetErrors(errors.clone()));
            return Err(errors);
        }

        self.dispatch(CheckoutCommand::CompleteStep(CheckoutStep::Shipping));
        self.dispatch(CheckoutCommand::GoToStep(CheckoutStep::Payment));
        Ok(())
    }

    /// Record the shopper's shipping choice; does not change steps.
    pub fn select_rate(&mut self, rate: ShippingRate) {
        self.dispatch(CheckoutCommand::SelectRate(rate));
    }

    /// Jump directly to a step.
    pub fn go_to_step(&mut self, step: CheckoutStep) {
        self.dispatch(CheckoutCommand::GoToStep(step));
    }

    /// Step back; a no-op on the first step.
    pub fn go_back(&mut self) {
        if let Some(previous) = self.state.current_step().previous() {
            self.dispatch(CheckoutCommand::GoToStep(previous));
        }
    }

    /// Return to the initial state, e.g. after the cart became invalid or an
    /// order completed.
    pub fn reset(&mut self) {
        self.dispatch(CheckoutCommand::Reset);
    }

    /// Quote shipping rates for the captured address and store them.
    ///
    /// # Errors
    ///
    /// Remote failures are returned to the caller; state is unchanged.
    pub async fn fetch_shipping_rates(&mut self) -> Result<&[ShippingRate], ApiError> {
        let address = self.state.shipping_address().clone();
        let rates = self.api.get_shipping_rates(&address).await?;

        self.dispatch(CheckoutCommand::SetRates(rates));
        Ok(self.state.shipping_rates())
    }

    /// Fetch the authoritative tax amount for the captured address and store
    /// it.
    ///
    /// # Errors
    ///
    /// Remote failures are returned to the caller; state is unchanged.
    pub async fn calculate_tax(&mut self) -> Result<Money<'static, Currency>, ApiError> {
        let address = self.state.shipping_address().clone();
        let tax = self.api.calculate_tax(&address).await?;

        self.dispatch(CheckoutCommand::SetTax(tax));
        Ok(tax)
    }

    /// Submit the order: remote cart validation, then creation.
    ///
    /// Success records the order id in state; acting on it (navigation,
    /// clearing the cart) is the caller's responsibility — the flow does not
    /// transition on its own.
    ///
    /// # Errors
    ///
    /// Remote validation or creation failures are returned to the caller for
    /// inline presentation; no order id is recorded.
    pub async fn submit_order(
        &mut self,
        cart: &CartState,
        totals: &OrderTotals,
    ) -> Result<OrderId, ApiError> {
        self.api.validate_cart().await?;

        let payload = OrderPayload {
            items: cart.items().to_vec(),
            shipping_address: self.state.shipping_address().clone(),
            shipping_rate: self.state.selected_rate().cloned(),
            total: totals.total,
        };

        let order_id = self.api.create_order(&payload).await?;
        self.dispatch(CheckoutCommand::SetOrderId(order_id.clone()));
        Ok(order_id)
    }
}
