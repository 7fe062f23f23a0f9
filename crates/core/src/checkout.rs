//! Simulated checkout.
//!
//! There is no payment step. Checkout is three calls against a visitor's
//! cart:
//!
//! 1. [`begin_checkout`] - the shopper leaves the cart page.
//! 2. [`submit_checkout`] - contact and shipping details are validated and
//!    stored under [`keys::CHECKOUT_DETAILS`].
//! 3. [`complete_checkout`] - the success step consumes the stored details,
//!    reports the purchase, empties the cart and deletes the blob.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::{self, AnalyticsEvent, MaskedContact};
use crate::cart::{CartItem, CartStore};
use crate::storage::{self, KeyValueStore, keys};
use crate::types::{Email, EmailError, OrderId};

/// Orders strictly above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Flat shipping fee below the threshold ($5.99).
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(599, 0, 0, false, 2);

/// Sales tax rate (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Errors that stop a checkout step.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("no order to complete")]
    NothingToComplete,
}

/// Money breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Shipping, tax and total for a subtotal.
    #[must_use]
    pub fn for_subtotal(subtotal: Decimal) -> Self {
        let shipping = shipping_for(subtotal);
        let tax = (subtotal * TAX_RATE).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }

    /// Pre-tax estimate shown on the cart page.
    #[must_use]
    pub fn estimated_total(&self) -> Decimal {
        self.subtotal + self.shipping
    }

    #[must_use]
    pub fn ships_free(&self) -> bool {
        self.shipping.is_zero()
    }
}

/// Shipping fee for a subtotal.
#[must_use]
pub fn shipping_for(subtotal: Decimal) -> Decimal {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING
    }
}

/// Contact details of the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Where the order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
}

/// Totals and lines captured at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub totals: OrderTotals,
    pub items: Vec<CartItem>,
}

/// The transient checkout blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub customer: CustomerDetails,
    pub shipping: ShippingAddress,
    pub order: OrderSummary,
}

/// Raw checkout form input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub apartment: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
}

impl CheckoutForm {
    /// Validate into customer and shipping details.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidEmail`] for a malformed email, or
    /// [`CheckoutError::MissingField`] naming the first blank required field.
    pub fn validate(&self) -> Result<(CustomerDetails, ShippingAddress), CheckoutError> {
        let email = Email::parse(&self.email)?;
        let customer = CustomerDetails {
            email,
            phone: optional(&self.phone),
            first_name: required(&self.first_name, "first_name")?,
            last_name: required(&self.last_name, "last_name")?,
        };
        let shipping = ShippingAddress {
            address: required(&self.address, "address")?,
            apartment: optional(&self.apartment),
            city: required(&self.city, "city")?,
            state: required(&self.state, "state")?,
            zip: required(&self.zip, "zip")?,
        };
        Ok((customer, shipping))
    }
}

fn required(value: &str, field: &'static str) -> Result<String, CheckoutError> {
    optional(value).ok_or(CheckoutError::MissingField(field))
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// What the success page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
    pub totals: OrderTotals,
    /// Total recorded at submission when available, else the recomputed one.
    pub display_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingAddress>,
}

/// Report that the shopper started checking out.
///
/// # Errors
///
/// [`CheckoutError::EmptyCart`] when there is nothing to buy.
pub fn begin_checkout<S: KeyValueStore>(cart: &CartStore<S>) -> Result<OrderTotals, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let totals = cart.totals();
    analytics::dispatch(
        cart.sink(),
        AnalyticsEvent::initiate_checkout(cart.items(), totals.total),
    );
    Ok(totals)
}

/// Validate the form and store the checkout blob.
///
/// # Errors
///
/// [`CheckoutError::EmptyCart`], or any validation error from
/// [`CheckoutForm::validate`].
pub fn submit_checkout<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    form: &CheckoutForm,
) -> Result<CheckoutDetails, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let (customer, shipping) = form.validate()?;
    let details = CheckoutDetails {
        customer,
        shipping,
        order: OrderSummary {
            totals: cart.totals(),
            items: cart.items().to_vec(),
        },
    };

    storage::save_json(cart.store_mut(), keys::CHECKOUT_DETAILS, &details);
    analytics::dispatch(
        cart.sink(),
        AnalyticsEvent::initiate_checkout(cart.items(), details.order.totals.total),
    );
    tracing::info!(
        lines = details.order.items.len(),
        total = %details.order.totals.total,
        "Checkout submitted"
    );
    Ok(details)
}

/// Finish the order: report the purchase, empty the cart, drop the blob.
///
/// Lines come from the cart, or from the stored blob if the cart is already
/// empty. A corrupt blob is ignored.
///
/// # Errors
///
/// [`CheckoutError::NothingToComplete`] when both the cart and the blob are
/// empty.
pub fn complete_checkout<S: KeyValueStore>(
    cart: &mut CartStore<S>,
    order_id: OrderId,
    placed_at: DateTime<Utc>,
) -> Result<OrderConfirmation, CheckoutError> {
    let details: Option<CheckoutDetails> = storage::load_json(cart.store(), keys::CHECKOUT_DETAILS);

    let items = if cart.is_empty() {
        details
            .as_ref()
            .map(|d| d.order.items.clone())
            .unwrap_or_default()
    } else {
        cart.items().to_vec()
    };
    if items.is_empty() {
        return Err(CheckoutError::NothingToComplete);
    }

    let totals = OrderTotals::for_subtotal(items.iter().map(CartItem::line_total).sum());
    let display_total = details.as_ref().map_or(totals.total, |d| d.order.totals.total);
    let contact = details
        .as_ref()
        .map(|d| MaskedContact::from_customer(&d.customer));

    analytics::dispatch(
        cart.sink(),
        AnalyticsEvent::purchase(&items, display_total, order_id.clone(), contact),
    );

    cart.clear_cart();
    cart.store_mut().remove(keys::CHECKOUT_DETAILS);
    tracing::info!(order_id = %order_id, total = %display_total, "Order completed");

    Ok(OrderConfirmation {
        order_id,
        placed_at,
        items,
        totals,
        display_total,
        customer: details.as_ref().map(|d| d.customer.clone()),
        shipping: details.map(|d| d.shipping),
    })
}
