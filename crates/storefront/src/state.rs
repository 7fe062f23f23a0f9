//! Application state shared across handlers.

use std::sync::Arc;

use moodeng_core::analytics::AnalyticsSink;
use moodeng_core::catalog::Catalog;

use crate::config::StorefrontConfig;
use crate::middleware::VisitorLocks;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// catalog, configuration, analytics sink and per-visitor request locks.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    sink: Arc<dyn AnalyticsSink>,
    visitor_locks: VisitorLocks,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, catalog: Catalog, sink: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                sink,
                visitor_locks: VisitorLocks::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a handle to the analytics sink.
    #[must_use]
    pub fn sink(&self) -> Arc<dyn AnalyticsSink> {
        Arc::clone(&self.inner.sink)
    }

    /// Locks that serialize requests sharing a session.
    #[must_use]
    pub fn visitor_locks(&self) -> &VisitorLocks {
        &self.inner.visitor_locks
    }
}
