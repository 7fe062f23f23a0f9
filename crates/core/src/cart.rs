//! Shopping cart state container.
//!
//! A cart line is identified by `(product id, size, color)`. Adding the same
//! triple again merges into the existing line; any difference in size or
//! color starts a new line. Every line always has a quantity of at least 1.
//!
//! The container writes the complete line list to its [`KeyValueStore`]
//! after every mutation and reads it back once in [`CartStore::load`].

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{self, AnalyticsEvent, AnalyticsSink};
use crate::catalog::Product;
use crate::checkout::OrderTotals;
use crate::storage::{self, KeyValueStore, keys};
use crate::types::ProductId;

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CartItem {
    /// Whether this line has the given identity triple.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, size: Option<&str>, color: Option<&str>) -> bool {
        &self.product.id == product_id && self.size.as_deref() == size && self.color.as_deref() == color
    }

    /// Unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Cart bound to one visitor's storage.
pub struct CartStore<S: KeyValueStore> {
    store: S,
    sink: Arc<dyn AnalyticsSink>,
    items: Vec<CartItem>,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Restore the cart from `store`.
    ///
    /// A missing or unparseable entry yields an empty cart. Lines that were
    /// persisted with quantity 0 are dropped.
    pub fn load(store: S, sink: Arc<dyn AnalyticsSink>) -> Self {
        let mut items: Vec<CartItem> = storage::load_json(&store, keys::CART).unwrap_or_default();
        items.retain(|line| line.quantity > 0);
        Self { store, sink, items }
    }

    /// Current lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines, saturating at `u32::MAX`.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        total_quantity(&self.items)
    }

    /// Σ price × quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Shipping, tax and grand total for the current subtotal.
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::for_subtotal(self.subtotal())
    }

    /// Add `quantity` units of a product variant.
    ///
    /// Merges into the line with the same `(id, size, color)` if one exists.
    /// The cart never holds more than `u32::MAX` units in total; anything
    /// beyond that is dropped. A quantity of 0 changes nothing.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: u32,
        size: Option<&str>,
        color: Option<&str>,
    ) {
        let quantity = quantity.min(u32::MAX - self.item_count());
        if quantity == 0 {
            return;
        }

        analytics::dispatch(
            self.sink.as_ref(),
            AnalyticsEvent::add_to_cart(product, quantity, size, color),
        );

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.matches(&product.id, size, color))
        {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem {
                product: product.clone(),
                quantity,
                size: size.map(str::to_owned),
                color: color.map(str::to_owned),
            });
        }

        tracing::debug!(product_id = %product.id, quantity, "Added to cart");
        self.persist();
    }

    /// Remove every line for a product, whatever its size or color.
    ///
    /// Returns the number of lines removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> usize {
        self.remove_where(|line| &line.product.id == product_id)
    }

    /// Remove only the line with this exact `(id, size, color)`.
    ///
    /// Returns whether a line was removed.
    pub fn remove_line(
        &mut self,
        product_id: &ProductId,
        size: Option<&str>,
        color: Option<&str>,
    ) -> bool {
        self.remove_where(|line| line.matches(product_id, size, color)) > 0
    }

    fn remove_where(&mut self, pred: impl Fn(&CartItem) -> bool) -> usize {
        let (removed, kept): (Vec<_>, Vec<_>) = self.items.drain(..).partition(|line| pred(line));
        self.items = kept;

        for line in &removed {
            analytics::dispatch(self.sink.as_ref(), AnalyticsEvent::remove_from_cart(line));
        }
        if !removed.is_empty() {
            self.persist();
        }
        removed.len()
    }

    /// Set the quantity of every line for a product.
    ///
    /// Quantities below 1 are ignored rather than treated as a removal.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        self.set_quantity_where(quantity, |line| &line.product.id == product_id);
    }

    /// Set the quantity of one `(id, size, color)` line, with the same floor
    /// rule as [`CartStore::update_quantity`].
    pub fn update_line_quantity(
        &mut self,
        product_id: &ProductId,
        size: Option<&str>,
        color: Option<&str>,
        quantity: i64,
    ) {
        self.set_quantity_where(quantity, |line| line.matches(product_id, size, color));
    }

    fn set_quantity_where(&mut self, quantity: i64, pred: impl Fn(&CartItem) -> bool) {
        if quantity < 1 {
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let mut touched = false;
        for line in self.items.iter_mut().filter(|line| pred(line)) {
            line.quantity = quantity;
            touched = true;
        }
        if touched {
            self.persist();
        }
    }

    /// Empty the cart.
    pub fn clear_cart(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the backing store, for sibling entries such as the
    /// checkout blob.
    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give back the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn sink(&self) -> &dyn AnalyticsSink {
        self.sink.as_ref()
    }

    fn persist(&mut self) {
        storage::save_json(&mut self.store, keys::CART, &self.items);
    }
}

/// Sum of line quantities, saturating instead of overflowing.
#[must_use]
pub fn total_quantity(lines: &[CartItem]) -> u32 {
    lines
        .iter()
        .fold(0_u32, |total, line| total.saturating_add(line.quantity))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analytics::{EventName, NoopSink, RecordingSink};
    use crate::catalog::tests::product;
    use crate::storage::MemoryStore;

    fn cart() -> CartStore<MemoryStore> {
        CartStore::load(MemoryStore::new(), Arc::new(NoopSink))
    }

    #[test]
    fn test_same_variant_merges() {
        let x = product("x", 20, "shirts");
        let mut cart = cart();

        cart.add_item(&x, 2, Some("M"), Some("Black"));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);

        cart.add_item(&x, 1, Some("M"), Some("Black"));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);

        cart.add_item(&x, 1, Some("L"), Some("Black"));
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[1].quantity, 1);
        assert_eq!(cart.item_count(), 4);
    }

    #[test]
    fn test_different_color_is_new_line() {
        let x = product("x", 20, "shirts");
        let mut cart = cart();
        cart.add_item(&x, 1, Some("M"), Some("Black"));
        cart.add_item(&x, 1, Some("M"), Some("White"));
        cart.add_item(&x, 1, None, None);
        assert_eq!(cart.items().len(), 3);
    }

    #[test]
    fn test_huge_quantities_do_not_overflow_count() {
        let x = product("x", 20, "shirts");
        let mut cart = cart();

        cart.add_item(&x, u32::MAX, Some("M"), None);
        cart.add_item(&x, 1, Some("L"), None);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), u32::MAX);

        cart.update_quantity(&x.id, i64::from(u32::MAX));
        cart.add_item(&x, 1, Some("M"), None);
        assert_eq!(cart.item_count(), u32::MAX);
    }

    #[test]
    fn test_total_quantity_saturates() {
        let x = product("x", 20, "shirts");
        let line = |size: &str| CartItem {
            product: x.clone(),
            quantity: u32::MAX,
            size: Some(size.to_string()),
            color: None,
        };
        assert_eq!(total_quantity(&[line("M"), line("L")]), u32::MAX);
        assert_eq!(total_quantity(&[]), 0);
    }

    #[test]
    fn test_zero_quantity_add_is_noop() {
        let mut cart = cart();
        cart.add_item(&product("x", 20, "a"), 0, None, None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_floor() {
        let x = product("x", 20, "a");
        let mut cart = cart();
        cart.add_item(&x, 2, None, None);

        cart.update_quantity(&x.id, 0);
        assert_eq!(cart.items()[0].quantity, 2);
        cart.update_quantity(&x.id, -1);
        assert_eq!(cart.items()[0].quantity, 2);

        cart.update_quantity(&x.id, 5);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_update_quantity_sets_every_line_of_product() {
        let x = product("x", 10, "a");
        let mut cart = cart();
        cart.add_item(&x, 1, Some("S"), None);
        cart.add_item(&x, 4, Some("L"), None);

        cart.update_quantity(&x.id, 2);
        assert!(cart.items().iter().all(|l| l.quantity == 2));

        cart.update_line_quantity(&x.id, Some("L"), None, 7);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.items()[1].quantity, 7);

        cart.update_line_quantity(&x.id, Some("L"), None, 0);
        assert_eq!(cart.items()[1].quantity, 7);
    }

    #[test]
    fn test_remove_item_drops_all_variants() {
        let x = product("x", 10, "a");
        let y = product("y", 10, "a");
        let mut cart = cart();
        cart.add_item(&x, 1, Some("S"), None);
        cart.add_item(&y, 1, None, None);
        cart.add_item(&x, 1, Some("L"), None);

        assert_eq!(cart.remove_item(&x.id), 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product.id, y.id);
        assert_eq!(cart.remove_item(&x.id), 0);
    }

    #[test]
    fn test_remove_line_is_scoped() {
        let x = product("x", 10, "a");
        let mut cart = cart();
        cart.add_item(&x, 1, Some("S"), Some("Red"));
        cart.add_item(&x, 1, Some("L"), Some("Red"));

        assert!(cart.remove_line(&x.id, Some("S"), Some("Red")));
        assert!(!cart.remove_line(&x.id, Some("S"), Some("Red")));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].size.as_deref(), Some("L"));
    }

    #[test]
    fn test_count_and_subtotal() {
        let mut cart = cart();
        cart.add_item(&product("a", 20, "c"), 2, None, None);
        cart.add_item(&product("b", 35, "c"), 1, Some("M"), None);
        cart.add_item(&product("b", 35, "c"), 3, Some("L"), None);

        assert_eq!(cart.item_count(), 6);
        assert_eq!(cart.subtotal(), Decimal::from(20 * 2 + 35 * 4));

        cart.clear_cart();
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn test_persists_every_mutation() {
        let x = product("x", 12, "a");
        let mut cart = cart();
        cart.add_item(&x, 2, Some("M"), None);
        cart.update_quantity(&x.id, 4);

        let store = cart.into_store();
        let reloaded = CartStore::load(store, Arc::new(NoopSink));
        assert_eq!(reloaded.items().len(), 1);
        assert_eq!(reloaded.items()[0].quantity, 4);
        assert_eq!(reloaded.items()[0].size.as_deref(), Some("M"));
    }

    #[test]
    fn test_corrupt_storage_loads_empty() {
        let mut store = MemoryStore::new();
        store.set(keys::CART, "{definitely not a cart".to_string());
        let cart = CartStore::load(store, Arc::new(NoopSink));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_stored_zero_quantity_lines_are_dropped() {
        let line = CartItem {
            product: product("x", 1, "a"),
            quantity: 0,
            size: None,
            color: None,
        };
        let mut store = MemoryStore::new();
        store.set(keys::CART, serde_json::to_string(&vec![line]).unwrap());
        assert!(CartStore::load(store, Arc::new(NoopSink)).is_empty());
    }

    #[test]
    fn test_analytics_events_and_failures() {
        let sink = Arc::new(RecordingSink::failing());
        let mut cart = CartStore::load(MemoryStore::new(), sink.clone());
        let x = product("x", 15, "a");

        cart.add_item(&x, 2, None, Some("Navy"));
        cart.remove_item(&x.id);

        // The failing sink did not block either mutation.
        assert!(cart.is_empty());
        let events = sink.events();
        assert_eq!(sink.names(), vec![EventName::AddToCart, EventName::RemoveFromCart]);
        assert_eq!(events[0].value, Decimal::from(30));
        assert_eq!(events[1].value, Decimal::from(30));
        assert_eq!(events[1].contents[0].quantity, 2);
    }
}
