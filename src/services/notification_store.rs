//! Bounded rolling log of recent notifications.
//!
//! The log keeps the most recent `capacity` messages in append order and
//! persists them to the backing cache under a single fixed key with a TTL.
//! Cache failures never surface to callers: any error degrades the store
//! to the in-process backend and the in-flight operation lands there.

use crate::services::cache::{self, CacheBackend};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Fixed cache key for the backlog entry.
pub const CACHE_KEY: &str = "recent_notifications";

#[derive(Clone)]
pub struct NotificationStore {
    // Backend is selected lazily on first access; `None` means not yet
    // probed. The mutex is the serialization point for appends.
    inner: Arc<Mutex<Option<CacheBackend>>>,
    candidates: Arc<Vec<String>>,
    capacity: usize,
    ttl_secs: i64,
}

impl NotificationStore {
    pub fn new(candidates: Vec<String>, capacity: usize, ttl_secs: i64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            candidates: Arc::new(candidates),
            capacity,
            ttl_secs,
        }
    }

    /// Store backed only by the in-process buffer. No endpoints are ever
    /// probed; used by tests and available as an explicit opt-out.
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(CacheBackend::Local(VecDeque::new())))),
            candidates: Arc::new(Vec::new()),
            capacity,
            ttl_secs: 0,
        }
    }

    async fn ensure_backend(&self, guard: &mut Option<CacheBackend>) {
        if guard.is_none() {
            *guard = Some(cache::select_backend(&self.candidates).await);
        }
    }

    /// Append a message, evicting the oldest entries beyond capacity.
    pub async fn append(&self, message: &str) {
        let mut guard = self.inner.lock().await;
        self.ensure_backend(&mut guard).await;

        let degraded = match guard.as_mut() {
            Some(CacheBackend::Remote(conn)) => match self.remote_append(conn, message).await {
                Ok(()) => false,
                Err(e) => {
                    warn!(error = %e, "cache append failed, degrading to in-process backlog");
                    true
                }
            },
            Some(CacheBackend::Local(buf)) => {
                buf.push_back(message.to_string());
                while buf.len() > self.capacity {
                    buf.pop_front();
                }
                false
            }
            None => false,
        };

        if degraded {
            let mut buf = VecDeque::with_capacity(self.capacity);
            buf.push_back(message.to_string());
            *guard = Some(CacheBackend::Local(buf));
        }
    }

    async fn remote_append(
        &self,
        conn: &mut ConnectionManager,
        message: &str,
    ) -> Result<(), redis::RedisError> {
        conn.rpush::<_, _, ()>(CACHE_KEY, message).await?;
        conn.ltrim::<_, ()>(CACHE_KEY, -(self.capacity as isize), -1)
            .await?;
        conn.expire::<_, ()>(CACHE_KEY, self.ttl_secs).await?;
        Ok(())
    }

    /// Snapshot of the backlog, oldest first.
    pub async fn recent(&self) -> Vec<String> {
        let mut guard = self.inner.lock().await;
        self.ensure_backend(&mut guard).await;

        let entries = match guard.as_mut() {
            Some(CacheBackend::Remote(conn)) => {
                match conn.lrange::<_, Vec<String>>(CACHE_KEY, 0, -1).await {
                    Ok(entries) => Some(entries),
                    Err(e) => {
                        warn!(error = %e, "cache read failed, degrading to in-process backlog");
                        None
                    }
                }
            }
            Some(CacheBackend::Local(buf)) => Some(buf.iter().cloned().collect()),
            None => Some(Vec::new()),
        };

        match entries {
            Some(entries) => entries,
            None => {
                *guard = Some(CacheBackend::Local(VecDeque::new()));
                Vec::new()
            }
        }
    }

    /// Whether the store is currently talking to a remote cache endpoint.
    /// Probes the candidates if no backend has been selected yet.
    pub async fn cache_connected(&self) -> bool {
        let mut guard = self.inner.lock().await;
        self.ensure_backend(&mut guard).await;
        guard.as_ref().is_some_and(CacheBackend::is_remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recent_is_empty_without_appends() {
        let store = NotificationStore::in_memory(5);
        assert!(store.recent().await.is_empty());
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let store = NotificationStore::in_memory(5);
        for msg in ["a", "b", "c"] {
            store.append(msg).await;
        }
        assert_eq!(store.recent().await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn sixth_append_evicts_oldest() {
        let store = NotificationStore::in_memory(5);
        for i in 1..=5 {
            store.append(&format!("m{i}")).await;
        }
        store.append("m6").await;

        let recent = store.recent().await;
        assert_eq!(recent.len(), 5);
        assert_eq!(recent.first().map(String::as_str), Some("m2"));
        assert_eq!(recent.last().map(String::as_str), Some("m6"));
    }

    #[tokio::test]
    async fn capacity_holds_under_many_appends() {
        let store = NotificationStore::in_memory(5);
        for i in 0..100 {
            store.append(&i.to_string()).await;
        }
        let recent = store.recent().await;
        assert_eq!(recent.len(), 5);
        assert_eq!(recent, vec!["95", "96", "97", "98", "99"]);
    }

    #[tokio::test]
    async fn recent_returns_independent_snapshot() {
        let store = NotificationStore::in_memory(5);
        store.append("first").await;

        let snapshot = store.recent().await;
        store.append("second").await;

        assert_eq!(snapshot, vec!["first"]);
        assert_eq!(store.recent().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn unreachable_endpoints_fall_back_to_local() {
        // Port 1 is closed; the probe fails and the store must degrade
        // without surfacing an error to the caller.
        let store = NotificationStore::new(vec!["redis://127.0.0.1:1".into()], 5, 3600);

        store.append("offline").await;
        assert_eq!(store.recent().await, vec!["offline"]);
        assert!(!store.cache_connected().await);
    }

    #[tokio::test]
    async fn in_memory_store_reports_cache_disconnected() {
        let store = NotificationStore::in_memory(5);
        assert!(!store.cache_connected().await);
    }
}
