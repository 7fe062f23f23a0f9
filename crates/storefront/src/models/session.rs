//! Per-visitor storage backed by the HTTP session.
//!
//! Core state containers read and write a synchronous
//! [`KeyValueStore`]; tower-sessions is async. A request loads a
//! [`SessionStorage`] snapshot up front, hands it to the containers, and
//! flushes the touched keys back before responding.

use std::collections::{BTreeMap, HashMap};

use moodeng_core::storage::{KeyValueStore, keys};
use tower_sessions::Session;

/// Every visitor key a request may touch.
pub const VISITOR_KEYS: &[&str] = &[
    keys::CART,
    keys::WISHLIST,
    keys::CHECKOUT_DETAILS,
    keys::RECENTLY_VIEWED,
];

/// Snapshot of a visitor's storage entries.
#[derive(Debug, Default)]
pub struct SessionStorage {
    values: HashMap<String, String>,
    /// Pending writes; `None` deletes the key.
    changes: BTreeMap<String, Option<String>>,
}

impl SessionStorage {
    /// Read the visitor keys out of the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        let mut values = HashMap::new();
        for key in VISITOR_KEYS {
            if let Some(value) = session.get::<String>(key).await? {
                values.insert((*key).to_string(), value);
            }
        }
        Ok(Self {
            values,
            changes: BTreeMap::new(),
        })
    }

    /// Whether anything was written since loading.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Write pending changes back to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects a write.
    pub async fn flush(self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        for (key, value) in self.changes {
            match value {
                Some(value) => session.insert(&key, value).await?,
                None => {
                    session.remove::<String>(&key).await?;
                }
            }
        }
        Ok(())
    }
}

impl KeyValueStore for SessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value.clone());
        self.changes.insert(key.to_string(), Some(value));
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
        self.changes.insert(key.to_string(), None);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flush_round_trips_through_session() {
        let session = session();

        let mut storage = SessionStorage::load(&session).await.unwrap();
        assert!(!storage.is_dirty());
        storage.set(keys::CART, "[]".to_string());
        storage.set(keys::WISHLIST, "[1]".to_string());
        storage.remove(keys::WISHLIST);
        assert!(storage.is_dirty());
        storage.flush(&session).await.unwrap();

        let reloaded = SessionStorage::load(&session).await.unwrap();
        assert_eq!(reloaded.get(keys::CART).as_deref(), Some("[]"));
        assert_eq!(reloaded.get(keys::WISHLIST), None);
    }

    #[tokio::test]
    async fn test_remove_deletes_session_entry() {
        let session = session();
        session.insert(keys::CHECKOUT_DETAILS, "{}".to_string()).await.unwrap();

        let mut storage = SessionStorage::load(&session).await.unwrap();
        assert!(storage.get(keys::CHECKOUT_DETAILS).is_some());
        storage.remove(keys::CHECKOUT_DETAILS);
        storage.flush(&session).await.unwrap();

        assert_eq!(
            session.get::<String>(keys::CHECKOUT_DETAILS).await.unwrap(),
            None
        );
    }
}
