//! Per-visitor request serialization.
//!
//! Every handler reads the visitor's session record, changes it, and the
//! session layer writes the whole record back after the response is built.
//! Two overlapping requests from the same visitor would each write their own
//! copy and the later one would erase the other's change. This middleware
//! sits outside the session layer and holds a per-session lock from before
//! the record is loaded until after it is saved.
//!
//! Requests without a session cookie cannot share a record, so they are not
//! serialized.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use axum::{
    extract::{Request, State},
    http::header::COOKIE,
    middleware::Next,
    response::Response,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::middleware::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Map size at which dead entries are swept.
const SWEEP_THRESHOLD: usize = 1024;

/// One async lock per live session id.
///
/// Entries are held weakly and disappear once no request holds or waits for
/// the lock.
#[derive(Debug, Default)]
pub struct VisitorLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl VisitorLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one visitor's session.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(session_id).lock_owned().await
    }

    fn lock_for(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(lock) = locks.get(session_id).and_then(Weak::upgrade) {
            return lock;
        }

        if locks.len() >= SWEEP_THRESHOLD {
            locks.retain(|_, lock| lock.strong_count() > 0);
        }

        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(session_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Number of tracked session ids, live or not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Session cookie value from the request, if any.
fn session_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Run one request at a time per session cookie.
pub async fn visitor_lock_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(id) = session_id(&request) else {
        return next.run(request).await;
    };

    let _guard = state.visitor_locks().acquire(&id).await;
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;

    use super::*;

    fn request_with_cookie(cookie: &str) -> Request {
        axum::http::Request::builder()
            .uri("/")
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let request = request_with_cookie("theme=dark; md_session=abc123; other=1");
        assert_eq!(session_id(&request).as_deref(), Some("abc123"));

        let request = request_with_cookie("theme=dark");
        assert_eq!(session_id(&request), None);

        let request = request_with_cookie("md_session=");
        assert_eq!(session_id(&request), None);
    }

    #[tokio::test]
    async fn test_same_visitor_waits() {
        let locks = VisitorLocks::new();
        let held = locks.acquire("a").await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire("a")).await;
        assert!(blocked.is_err());

        // Other visitors are not affected.
        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire("b")).await;
        assert!(other.is_ok());

        drop(held);
        let free = tokio::time::timeout(Duration::from_millis(50), locks.acquire("a")).await;
        assert!(free.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_reused_or_swept() {
        let locks = VisitorLocks::new();
        drop(locks.acquire("a").await);
        drop(locks.acquire("a").await);
        assert_eq!(locks.len(), 1);

        for i in 0..SWEEP_THRESHOLD {
            drop(locks.acquire(&format!("visitor-{i}")).await);
        }
        assert!(locks.len() <= SWEEP_THRESHOLD);
    }
}
