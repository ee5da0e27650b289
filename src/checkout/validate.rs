//! Shipping address validation
//!
//! Purely local, format-level checks; no network round-trip is needed to
//! advance past the shipping step. Failures come back keyed by field so the
//! form can render each message next to its input.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::checkout::ShippingAddress;

/// Shape check for `local@domain.tld`.
static EMAIL_SHAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Fields of the shipping address form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AddressField {
    /// Shopper's first name.
    FirstName,
    /// Shopper's last name.
    LastName,
    /// Contact email.
    Email,
    /// Contact phone number (optional).
    Phone,
    /// Street address.
    Address1,
    /// Apartment, suite, etc. (optional).
    Address2,
    /// City.
    City,
    /// State or province.
    State,
    /// ZIP or postal code.
    ZipCode,
    /// Country code.
    Country,
}

impl AddressField {
    /// Form identifier for the field.
    pub fn key(self) -> &'static str {
        match self {
            AddressField::FirstName => "first_name",
            AddressField::LastName => "last_name",
            AddressField::Email => "email",
            AddressField::Phone => "phone",
            AddressField::Address1 => "address1",
            AddressField::Address2 => "address2",
            AddressField::City => "city",
            AddressField::State => "state",
            AddressField::ZipCode => "zip_code",
            AddressField::Country => "country",
        }
    }
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Field-keyed validation failures for the shipping address form. Empty
/// means the address passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("shipping address failed validation")]
pub struct ValidationErrors(BTreeMap<AddressField, String>);

impl ValidationErrors {
    /// Whether every check passed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The message for a failing field, if that field failed.
    pub fn message(&self, field: AddressField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Iterate failing fields and messages in display order.
    pub fn iter(&self) -> impl Iterator<Item = (AddressField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn require(&mut self, field: AddressField, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.0.insert(field, message.to_owned());
        }
    }

    fn reject(&mut self, field: AddressField, message: &str) {
        self.0.insert(field, message.to_owned());
    }
}

/// Validate the shipping address.
///
/// Required after trimming: first name, last name, email, address line 1,
/// city, state, and ZIP code. The email must additionally look like
/// `local@domain.tld`. Phone, the second address line, and country are not
/// validated here.
#[must_use]
pub fn validate_shipping_address(address: &ShippingAddress) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    errors.require(
        AddressField::FirstName,
        &address.first_name,
        "First name is required",
    );
    errors.require(
        AddressField::LastName,
        &address.last_name,
        "Last name is required",
    );

    let email = address.email.trim();
    if email.is_empty() {
        errors.reject(AddressField::Email, "Email is required");
    } else if !email_shape_ok(email) {
        errors.reject(AddressField::Email, "Invalid email address");
    }

    errors.require(AddressField::Address1, &address.address1, "Address is required");
    errors.require(AddressField::City, &address.city, "City is required");
    errors.require(AddressField::State, &address.state, "State is required");
    errors.require(
        AddressField::ZipCode,
        &address.zip_code,
        "ZIP code is required",
    );

    errors
}

fn email_shape_ok(email: &str) -> bool {
    EMAIL_SHAPE
        .as_ref()
        .is_some_and(|shape| shape.is_match(email))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            phone: String::new(),
            address1: "1 Analytical Way".to_owned(),
            address2: String::new(),
            city: "New York".to_owned(),
            state: "NY".to_owned(),
            zip_code: "10001".to_owned(),
            country: "US".to_owned(),
        }
    }

    #[test]
    fn complete_address_passes() {
        let errors = validate_shipping_address(&valid_address());

        assert!(errors.is_empty());
    }

    #[test]
    fn missing_required_fields_are_each_reported() {
        let errors = validate_shipping_address(&ShippingAddress::default());

        assert_eq!(errors.len(), 7);
        assert_eq!(
            errors.message(AddressField::FirstName),
            Some("First name is required")
        );
        assert_eq!(errors.message(AddressField::Email), Some("Email is required"));
        assert_eq!(
            errors.message(AddressField::ZipCode),
            Some("ZIP code is required")
        );
    }

    #[test]
    fn whitespace_only_fields_count_as_missing() {
        let mut address = valid_address();
        address.city = "   ".to_owned();

        let errors = validate_shipping_address(&address);

        assert_eq!(errors.message(AddressField::City), Some("City is required"));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut address = valid_address();
        address.email = "bad".to_owned();

        let errors = validate_shipping_address(&address);

        assert_eq!(
            errors.message(AddressField::Email),
            Some("Invalid email address")
        );
    }

    #[test]
    fn email_without_tld_is_rejected() {
        let mut address = valid_address();
        address.email = "ada@example".to_owned();

        let errors = validate_shipping_address(&address);

        assert_eq!(
            errors.message(AddressField::Email),
            Some("Invalid email address")
        );
    }

    #[test]
    fn phone_and_second_line_are_optional() {
        let mut address = valid_address();
        address.phone = String::new();
        address.address2 = String::new();

        assert!(validate_shipping_address(&address).is_empty());
    }

    #[test]
    fn errors_iterate_in_field_order() {
        let mut address = valid_address();
        address.first_name = String::new();
        address.zip_code = String::new();

        let errors = validate_shipping_address(&address);
        let fields: Vec<AddressField> = errors.iter().map(|(field, _)| field).collect();

        assert_eq!(fields, vec![AddressField::FirstName, AddressField::ZipCode]);
    }
}
