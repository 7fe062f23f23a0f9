//! Recently viewed products, most recent first.

use crate::catalog::{Catalog, Product};
use crate::storage::{self, KeyValueStore, keys};
use crate::types::ProductId;

/// How many product ids are remembered.
pub const MAX_RECENT_ITEMS: usize = 6;

/// Recently viewed list bound to one visitor's storage.
#[derive(Debug)]
pub struct RecentlyViewed<S: KeyValueStore> {
    store: S,
    ids: Vec<ProductId>,
}

impl<S: KeyValueStore> RecentlyViewed<S> {
    pub fn load(store: S) -> Self {
        let mut ids: Vec<ProductId> =
            storage::load_json(&store, keys::RECENTLY_VIEWED).unwrap_or_default();
        ids.truncate(MAX_RECENT_ITEMS);
        Self { store, ids }
    }

    /// Move `product_id` to the front, dropping the oldest beyond the limit.
    pub fn record(&mut self, product_id: &ProductId) {
        self.ids.retain(|id| id != product_id);
        self.ids.insert(0, product_id.clone());
        self.ids.truncate(MAX_RECENT_ITEMS);
        storage::save_json(&mut self.store, keys::RECENTLY_VIEWED, &self.ids);
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    /// Resolve ids against the catalog, skipping ones that no longer exist.
    #[must_use]
    pub fn products<'c>(&self, catalog: &'c Catalog) -> Vec<&'c Product> {
        self.ids.iter().filter_map(|id| catalog.product(id)).collect()
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::{category, product};
    use crate::storage::MemoryStore;

    fn ids(list: &RecentlyViewed<MemoryStore>) -> Vec<&str> {
        list.ids().iter().map(ProductId::as_str).collect()
    }

    #[test]
    fn test_most_recent_first_without_duplicates() {
        let mut recent = RecentlyViewed::load(MemoryStore::new());
        for id in ["1", "2", "3", "2"] {
            recent.record(&ProductId::new(id));
        }
        assert_eq!(ids(&recent), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_caps_at_limit() {
        let mut recent = RecentlyViewed::load(MemoryStore::new());
        for n in 0..10 {
            recent.record(&ProductId::new(n.to_string()));
        }
        assert_eq!(recent.ids().len(), MAX_RECENT_ITEMS);
        assert_eq!(ids(&recent).first(), Some(&"9"));

        let reloaded = RecentlyViewed::load(recent.into_store());
        assert_eq!(ids(&reloaded), vec!["9", "8", "7", "6", "5", "4"]);
    }

    #[test]
    fn test_products_skips_unknown_ids() {
        let catalog = Catalog::new(vec![category("a")], vec![product("1", 5, "a")]).unwrap();
        let mut recent = RecentlyViewed::load(MemoryStore::new());
        recent.record(&ProductId::new("1"));
        recent.record(&ProductId::new("gone"));

        let products = recent.products(&catalog);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "1");
    }

    #[test]
    fn test_corrupt_storage_is_empty() {
        let mut store = MemoryStore::new();
        store.set(keys::RECENTLY_VIEWED, "[1, 2".to_string());
        assert!(RecentlyViewed::load(store).ids().is_empty());
    }
}
