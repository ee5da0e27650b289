//! Integration tests for the checkout flow: step progression, address
//! validation, rate and tax lookups, and order submission end to end.

use rusty_money::{Money, iso::USD};
use testresult::TestResult;

use satchel::cart::{CartCommand, apply};
use satchel::prelude::*;

fn filled_address() -> AddressUpdate {
    AddressUpdate {
        first_name: Some("Ada".to_owned()),
        last_name: Some("Lovelace".to_owned()),
        email: Some("ada@example.com".to_owned()),
        phone: Some("212-555-0100".to_owned()),
        address1: Some("1 Analytical Way".to_owned()),
        address2: None,
        city: Some("New York".to_owned()),
        state: Some("NY".to_owned()),
        zip_code: Some("10001".to_owned()),
        country: None,
    }
}

fn cart_with_double_pack() -> CartState {
    let product = Product {
        id: ProductId::new("odor-pack"),
        name: "Odor Pack".to_owned(),
        images: vec!["/images/product-main.jpg".to_owned()],
        variants: vec![Variant {
            id: VariantId::new("double"),
            label: "2-Pack".to_owned(),
            price: Money::from_minor(4_499, USD),
            compare_price: None,
            in_stock: true,
        }],
    };

    let Some(variant) = product.variant(&VariantId::new("double")) else {
        panic!("fixture variant missing");
    };

    apply(
        CartState::default(),
        CartCommand::Add(LineItem::snapshot(&product, variant, 2)),
    )
}

fn totals_for(cart: &CartState) -> Result<OrderTotals, TotalsError> {
    let config = StoreConfig::default();

    order_totals(
        cart.items(),
        cart.promo().map(|promo| promo.discount),
        config.flat_shipping_rate,
        config.tax_rate,
        config.free_shipping_threshold,
    )
}

#[tokio::test]
async fn invalid_submission_reports_field_errors_and_stays() {
    let mut flow = CheckoutFlow::new(MockCommerceApi::new(USD));

    flow.update_shipping_address(AddressUpdate {
        email: Some("bad".to_owned()),
        city: Some("NYC".to_owned()),
        last_name: Some("Lovelace".to_owned()),
        address1: Some("1 Analytical Way".to_owned()),
        state: Some("NY".to_owned()),
        zip_code: Some("10001".to_owned()),
        ..AddressUpdate::default()
    });

    let Err(errors) = flow.submit_shipping_address() else {
        panic!("expected validation to fail");
    };

    assert_eq!(
        errors.message(AddressField::FirstName),
        Some("First name is required")
    );
    assert_eq!(
        errors.message(AddressField::Email),
        Some("Invalid email address")
    );
    assert_eq!(flow.state().current_step(), CheckoutStep::Shipping);
    assert_eq!(flow.state().completed_step_count(), 0);
    assert_eq!(flow.state().errors().len(), 2);
}

#[tokio::test]
async fn address_edit_clears_previous_errors() {
    let mut flow = CheckoutFlow::new(MockCommerceApi::new(USD));

    let _ = flow.submit_shipping_address();
    assert!(!flow.state().errors().is_empty());

    flow.update_shipping_address(AddressUpdate {
        first_name: Some("Ada".to_owned()),
        ..AddressUpdate::default()
    });

    assert!(flow.state().errors().is_empty());
}

#[tokio::test]
async fn valid_submission_advances_to_payment() -> TestResult {
    let mut flow = CheckoutFlow::new(MockCommerceApi::new(USD));
    flow.update_shipping_address(filled_address());

    flow.submit_shipping_address()?;

    assert_eq!(flow.state().current_step(), CheckoutStep::Payment);
    assert!(flow.state().is_step_completed(CheckoutStep::Shipping));

    Ok(())
}

#[tokio::test]
async fn resubmission_completes_the_step_exactly_once() -> TestResult {
    let mut flow = CheckoutFlow::new(MockCommerceApi::new(USD));
    flow.update_shipping_address(filled_address());

    flow.submit_shipping_address()?;
    flow.go_back();
    flow.submit_shipping_address()?;

    assert_eq!(flow.state().completed_step_count(), 1);
    assert_eq!(flow.state().current_step(), CheckoutStep::Payment);

    Ok(())
}

#[tokio::test]
async fn go_back_is_a_no_op_on_the_first_step() {
    let mut flow = CheckoutFlow::new(MockCommerceApi::new(USD));

    flow.go_back();

    assert_eq!(flow.state().current_step(), CheckoutStep::Shipping);
}

#[tokio::test]
async fn rates_are_quoted_selected_and_priced() -> TestResult {
    let mut flow = CheckoutFlow::new(MockCommerceApi::new(USD));
    flow.update_shipping_address(filled_address());

    let rates = flow.fetch_shipping_rates().await?.to_vec();
    assert_eq!(rates.len(), 2);

    let Some(standard) = rates.first() else {
        panic!("expected a quoted rate");
    };

    flow.select_rate(standard.clone());

    assert_eq!(flow.state().shipping_cost(), Some(Money::from_minor(500, USD)));
    // Selecting a rate does not advance the flow by itself.
    assert_eq!(flow.state().current_step(), CheckoutStep::Shipping);

    Ok(())
}

#[tokio::test]
async fn remote_tax_is_stored_on_state() -> TestResult {
    let api = MockCommerceApi::new(USD).with_tax(Money::from_minor(560, USD));
    let mut flow = CheckoutFlow::new(api);
    flow.update_shipping_address(filled_address());

    let tax = flow.calculate_tax().await?;

    assert_eq!(tax, Money::from_minor(560, USD));
    assert_eq!(flow.state().tax(), Some(Money::from_minor(560, USD)));

    Ok(())
}

#[tokio::test]
async fn submitted_order_records_its_id() -> TestResult {
    let cart = cart_with_double_pack();
    let totals = totals_for(&cart)?;

    let mut flow = CheckoutFlow::new(MockCommerceApi::new(USD));
    flow.update_shipping_address(filled_address());
    flow.submit_shipping_address()?;

    let order_id = flow.submit_order(&cart, &totals).await?;

    assert_eq!(order_id.as_str(), "ORD-000001");
    assert_eq!(flow.state().order_id(), Some(&order_id));
    // The flow does not transition on its own after an order lands.
    assert_eq!(flow.state().current_step(), CheckoutStep::Payment);

    Ok(())
}

#[tokio::test]
async fn failed_order_submission_records_nothing() -> TestResult {
    let cart = cart_with_double_pack();
    let totals = totals_for(&cart)?;

    let api = MockCommerceApi::new(USD);
    api.set_offline(true);

    let mut flow = CheckoutFlow::new(api);
    let result = flow.submit_order(&cart, &totals).await;

    assert!(matches!(result, Err(ApiError::Unavailable)));
    assert!(flow.state().order_id().is_none());

    Ok(())
}

#[tokio::test]
async fn reset_returns_the_flow_to_its_initial_state() -> TestResult {
    let cart = cart_with_double_pack();
    let totals = totals_for(&cart)?;

    let mut flow = CheckoutFlow::new(MockCommerceApi::new(USD));
    flow.update_shipping_address(filled_address());
    flow.submit_shipping_address()?;
    flow.submit_order(&cart, &totals).await?;

    flow.reset();

    assert_eq!(flow.state().current_step(), CheckoutStep::Shipping);
    assert_eq!(flow.state().completed_step_count(), 0);
    assert!(flow.state().order_id().is_none());
    assert_eq!(flow.state().shipping_address().first_name, "");

    Ok(())
}

#[tokio::test]
async fn order_completion_clears_the_cart_and_its_mirror() -> TestResult {
    let api = MockCommerceApi::new(USD);
    let config = StoreConfig::default();

    let product = Product {
        id: ProductId::new("odor-pack"),
        name: "Odor Pack".to_owned(),
        images: Vec::new(),
        variants: vec![Variant {
            id: VariantId::new("double"),
            label: "2-Pack".to_owned(),
            price: Money::from_minor(4_499, USD),
            compare_price: None,
            in_stock: true,
        }],
    };

    let mut cart = CartStore::initialize(api.clone(), MemoryStorage::new(), &config).await;
    cart.add_item(&product, &VariantId::new("double"), 2).await?;

    let totals = order_totals(
        cart.state().items(),
        None,
        config.flat_shipping_rate,
        config.tax_rate,
        config.free_shipping_threshold,
    )?;

    let mut flow = CheckoutFlow::new(api);
    flow.update_shipping_address(filled_address());
    flow.submit_shipping_address()?;
    flow.submit_order(cart.state(), &totals).await?;

    // The caller reacts to the recorded order id: empty the cart, reset the
    // flow.
    cart.clear();
    flow.reset();

    assert!(cart.state().is_empty());
    assert!(!cart.storage().has_entry());
    assert_eq!(flow.state().current_step(), CheckoutStep::Shipping);

    Ok(())
}
