//! Analytics event model and the sink capability injected into state
//! containers.
//!
//! Events mirror the standard pixel events (`AddToCart`, `Purchase`, ...).
//! Dispatch is fire-and-forget: [`dispatch`] logs a failed
//! [`AnalyticsSink::track`] and returns, so a broken tracker can never undo
//! or block a cart mutation.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::cart::{self, CartItem};
use crate::catalog::Product;
use crate::checkout::CustomerDetails;
use crate::types::{CategoryId, CurrencyCode, OrderId, ProductId};

/// Brand attached to every content line.
pub const BRAND: &str = "Moo Deng";

/// Errors a sink may report. Callers never propagate these.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The tracker is not running or its queue is closed.
    #[error("analytics sink unavailable: {0}")]
    Unavailable(String),

    /// The tracker refused the event.
    #[error("analytics event rejected: {0}")]
    Rejected(String),
}

/// Standard event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    AddToCart,
    RemoveFromCart,
    InitiateCheckout,
    Purchase,
    ViewContent,
}

impl EventName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddToCart => "AddToCart",
            Self::RemoveFromCart => "RemoveFromCart",
            Self::InitiateCheckout => "InitiateCheckout",
            Self::Purchase => "Purchase",
            Self::ViewContent => "ViewContent",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line inside an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ProductId,
    pub quantity: u32,
    pub item_price: Decimal,
    pub name: String,
    pub category: CategoryId,
    /// Selected color, empty when none.
    pub variant: String,
    pub brand: String,
    /// Selected size, empty when none.
    pub size: String,
}

impl From<&CartItem> for ContentItem {
    fn from(line: &CartItem) -> Self {
        Self {
            id: line.product.id.clone(),
            quantity: line.quantity,
            item_price: line.product.price,
            name: line.product.name.clone(),
            category: line.product.category.clone(),
            variant: line.color.clone().unwrap_or_default(),
            brand: BRAND.to_string(),
            size: line.size.clone().unwrap_or_default(),
        }
    }
}

/// Customer contact fields hashed for advanced matching.
///
/// Each field is the SHA-256 hex digest of the trimmed, lower-cased value
/// (phone numbers keep digits only). Raw contact data never leaves the
/// process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub em: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<String>,
    #[serde(rename = "fn", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "ln", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl MaskedContact {
    /// Hash the contact fields of a checkout customer.
    #[must_use]
    pub fn from_customer(customer: &CustomerDetails) -> Self {
        let phone_digits: String = customer
            .phone
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();

        Self {
            em: Some(hash_field(&customer.email.normalized())),
            ph: (!phone_digits.is_empty()).then(|| hash_field(&phone_digits)),
            first_name: non_blank(&customer.first_name).map(hash_field),
            last_name: non_blank(&customer.last_name).map(hash_field),
        }
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// SHA-256 hex of the trimmed, lower-cased value.
#[must_use]
pub fn hash_field(value: &str) -> String {
    hex::encode(Sha256::digest(value.trim().to_lowercase().as_bytes()))
}

/// A tracked event with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub name: EventName,
    pub content_ids: Vec<ProductId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_category: Option<CategoryId>,
    pub content_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub contents: Vec<ContentItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_items: Option<u32>,
    pub value: Decimal,
    pub currency: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<MaskedContact>,
}

impl AnalyticsEvent {
    fn product_event(name: EventName, product: &Product, value: Decimal) -> Self {
        Self {
            name,
            content_ids: vec![product.id.clone()],
            content_name: Some(product.name.clone()),
            content_category: Some(product.category.clone()),
            content_type: "product".to_string(),
            contents: Vec::new(),
            num_items: None,
            value,
            currency: CurrencyCode::USD,
            order_id: None,
            user_data: None,
        }
    }

    fn lines_event(name: EventName, lines: &[CartItem], value: Decimal) -> Self {
        Self {
            name,
            content_ids: lines.iter().map(|l| l.product.id.clone()).collect(),
            content_name: None,
            content_category: None,
            content_type: "product".to_string(),
            contents: lines.iter().map(ContentItem::from).collect(),
            num_items: Some(cart::total_quantity(lines)),
            value,
            currency: CurrencyCode::USD,
            order_id: None,
            user_data: None,
        }
    }

    /// A product detail view.
    #[must_use]
    pub fn view_content(product: &Product) -> Self {
        Self::product_event(EventName::ViewContent, product, product.price)
    }

    /// Units of a product added to the cart; value is the added line value.
    #[must_use]
    pub fn add_to_cart(
        product: &Product,
        quantity: u32,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Self {
        let mut event = Self::product_event(
            EventName::AddToCart,
            product,
            product.price * Decimal::from(quantity),
        );
        event.contents.push(ContentItem {
            id: product.id.clone(),
            quantity,
            item_price: product.price,
            name: product.name.clone(),
            category: product.category.clone(),
            variant: color.unwrap_or_default().to_string(),
            brand: BRAND.to_string(),
            size: size.unwrap_or_default().to_string(),
        });
        event
    }

    /// A cart line removed; value is the line value before removal.
    #[must_use]
    pub fn remove_from_cart(line: &CartItem) -> Self {
        let mut event =
            Self::product_event(EventName::RemoveFromCart, &line.product, line.line_total());
        event.contents.push(ContentItem::from(line));
        event
    }

    /// Checkout started with the given lines and order total.
    #[must_use]
    pub fn initiate_checkout(lines: &[CartItem], total: Decimal) -> Self {
        Self::lines_event(EventName::InitiateCheckout, lines, total)
    }

    /// Order placed.
    #[must_use]
    pub fn purchase(
        lines: &[CartItem],
        total: Decimal,
        order_id: OrderId,
        contact: Option<MaskedContact>,
    ) -> Self {
        let mut event = Self::lines_event(EventName::Purchase, lines, total);
        event.order_id = Some(order_id);
        event.user_data = contact;
        event
    }
}

/// Destination for analytics events.
///
/// Implementations must not block on the network; queue and return.
pub trait AnalyticsSink: Send + Sync {
    /// Hand an event to the tracker.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalyticsError`] when the event could not be accepted.
    fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError>;
}

/// Track an event, logging and swallowing any sink failure.
pub fn dispatch(sink: &dyn AnalyticsSink, event: AnalyticsEvent) {
    let name = event.name;
    if let Err(e) = sink.track(event) {
        tracing::warn!(event = %name, error = %e, "Analytics tracking failed");
    }
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn track(&self, _event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

/// Sink that keeps events in memory, for tests and local debugging.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AnalyticsEvent>>,
    fail: bool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records each event and then reports it as unavailable.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            events: Mutex::default(),
            fail: true,
        }
    }

    /// Snapshot of recorded events in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of recorded events in arrival order.
    #[must_use]
    pub fn names(&self) -> Vec<EventName> {
        self.events().iter().map(|e| e.name).collect()
    }
}

impl AnalyticsSink for RecordingSink {
    fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        if self.fail {
            return Err(AnalyticsError::Unavailable("recording sink set to fail".to_string()));
        }
        Ok(())
    }
}
