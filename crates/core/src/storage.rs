//! Per-visitor key/value storage contract.
//!
//! State containers persist themselves as JSON strings under fixed keys. The
//! storefront backs this with the visitor's session; tests use
//! [`MemoryStore`]. Reads are best effort: a value that fails to parse is
//! treated as absent.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Storage keys used by the state containers.
pub mod keys {
    /// Cart line list.
    pub const CART: &str = "cart";

    /// Wishlist product list.
    pub const WISHLIST: &str = "wishlist";

    /// Transient checkout blob, written at submission and deleted on success.
    pub const CHECKOUT_DETAILS: &str = "checkoutDetails";

    /// Most recently viewed product ids.
    pub const RECENTLY_VIEWED: &str = "recently-viewed-products";
}

/// String-keyed, string-valued store owned by one visitor.
pub trait KeyValueStore {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: String);

    /// Delete `key` if present.
    fn remove(&mut self, key: &str);
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        (**self).set(key, value);
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key);
    }
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Read and parse the JSON stored under `key`.
///
/// Missing keys and unparseable values both yield `None`; the latter is
/// logged.
pub fn load_json<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unparseable stored value");
            None
        }
    }
}

/// Serialize `value` as JSON and store it under `key`.
///
/// Serialization of the container types cannot fail in practice; if it
/// does, the previous value is kept and the failure is logged.
pub fn save_json<T: Serialize + ?Sized>(store: &mut impl KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => store.set(key, json),
        Err(e) => tracing::error!(key, error = %e, "Failed to serialize value for storage"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("k", "v".to_string());
        assert_eq!(store.get("k").as_deref(), Some("v"));
        assert_eq!(store.len(), 1);

        store.remove("k");
        assert!(store.get("k").is_none());
    }

    #[test]
    fn test_load_json_treats_garbage_as_absent() {
        let mut store = MemoryStore::new();
        store.set(keys::CART, "[{\"oops\"".to_string());

        let loaded: Option<Vec<u32>> = load_json(&store, keys::CART);
        assert!(loaded.is_none());
        assert!(load_json::<Vec<u32>>(&store, "missing").is_none());
    }

    #[test]
    fn test_save_json_then_load() {
        let mut store = MemoryStore::new();
        save_json(&mut store, "ids", &vec![3_u32, 1, 2]);

        assert_eq!(store.get("ids").as_deref(), Some("[3,1,2]"));
        assert_eq!(load_json::<Vec<u32>>(&store, "ids"), Some(vec![3, 1, 2]));
    }

    #[test]
    fn test_mut_ref_is_a_store() {
        fn put(mut store: impl KeyValueStore) {
            store.set("a", "1".to_string());
        }

        let mut store = MemoryStore::new();
        put(&mut store);
        assert_eq!(store.get("a").as_deref(), Some("1"));
    }
}
