//! Wishlist state container: a persisted set of products keyed by id.

use crate::catalog::Product;
use crate::storage::{self, KeyValueStore, keys};
use crate::types::ProductId;

/// Wishlist bound to one visitor's storage.
#[derive(Debug)]
pub struct WishlistStore<S: KeyValueStore> {
    store: S,
    items: Vec<Product>,
}

impl<S: KeyValueStore> WishlistStore<S> {
    /// Restore the wishlist from `store`; corrupt data yields an empty list.
    ///
    /// Duplicate ids in stored data are collapsed to their first occurrence.
    pub fn load(store: S) -> Self {
        let stored: Vec<Product> = storage::load_json(&store, keys::WISHLIST).unwrap_or_default();
        let mut items: Vec<Product> = Vec::with_capacity(stored.len());
        for product in stored {
            if !items.iter().any(|p| p.id == product.id) {
                items.push(product);
            }
        }
        Self { store, items }
    }

    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|p| &p.id == product_id)
    }

    /// Add a product unless it is already saved.
    pub fn add_item(&mut self, product: &Product) {
        if self.is_in_wishlist(&product.id) {
            return;
        }
        self.items.push(product.clone());
        self.persist();
    }

    /// Remove a product if it is saved.
    pub fn remove_item(&mut self, product_id: &ProductId) {
        let before = self.items.len();
        self.items.retain(|p| &p.id != product_id);
        if self.items.len() != before {
            self.persist();
        }
    }

    /// Flip membership; returns whether the product is saved afterwards.
    pub fn toggle(&mut self, product: &Product) -> bool {
        if self.is_in_wishlist(&product.id) {
            self.remove_item(&product.id);
            false
        } else {
            self.add_item(product);
            true
        }
    }

    pub fn clear_wishlist(&mut self) {
        self.items.clear();
        self.persist();
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn persist(&mut self) {
        storage::save_json(&mut self.store, keys::WISHLIST, &self.items);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;
    use crate::storage::MemoryStore;

    #[test]
    fn test_add_is_idempotent() {
        let mut wishlist = WishlistStore::load(MemoryStore::new());
        let p = product("1", 10, "a");
        wishlist.add_item(&p);
        wishlist.add_item(&p);
        assert_eq!(wishlist.item_count(), 1);
        assert!(wishlist.is_in_wishlist(&p.id));
    }

    #[test]
    fn test_remove_and_toggle() {
        let mut wishlist = WishlistStore::load(MemoryStore::new());
        let a = product("a", 10, "c");
        let b = product("b", 10, "c");

        assert!(wishlist.toggle(&a));
        wishlist.add_item(&b);
        assert!(!wishlist.toggle(&a));
        assert!(!wishlist.is_in_wishlist(&a.id));

        wishlist.remove_item(&ProductId::new("missing"));
        assert_eq!(wishlist.item_count(), 1);

        wishlist.clear_wishlist();
        assert_eq!(wishlist.item_count(), 0);
    }

    #[test]
    fn test_persists_and_reloads() {
        let mut wishlist = WishlistStore::load(MemoryStore::new());
        wishlist.add_item(&product("1", 10, "a"));
        wishlist.add_item(&product("2", 10, "a"));
        wishlist.remove_item(&ProductId::new("1"));

        let reloaded = WishlistStore::load(wishlist.into_store());
        let ids: Vec<_> = reloaded.items().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn test_corrupt_and_duplicate_storage() {
        let mut store = MemoryStore::new();
        store.set(keys::WISHLIST, "not json".to_string());
        assert_eq!(WishlistStore::load(store).item_count(), 0);

        let p = product("1", 10, "a");
        let mut store = MemoryStore::new();
        store.set(keys::WISHLIST, serde_json::to_string(&vec![p.clone(), p]).unwrap());
        assert_eq!(WishlistStore::load(store).item_count(), 1);
    }
}
