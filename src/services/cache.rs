//! Backing-cache selection for the notification store.
//!
//! The store runs against one of two backends: a remote Redis endpoint or
//! an in-process buffer with the same capped-list semantics. Candidate
//! endpoints are probed in order on first use; the first one that passes a
//! trivial write+read probe wins. The degrade transition is one-way: once
//! the store is on the local backend it stays there for the process
//! lifetime.

use crate::error::AppError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

const PROBE_KEY: &str = "_health_check";
const PROBE_TTL_SECS: usize = 5;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub enum CacheBackend {
    Remote(ConnectionManager),
    Local(VecDeque<String>),
}

impl CacheBackend {
    pub fn is_remote(&self) -> bool {
        matches!(self, CacheBackend::Remote(_))
    }
}

/// Connect to a single endpoint and verify it with a short-lived probe
/// write followed by a read.
async fn connect_remote(url: &str) -> Result<ConnectionManager, AppError> {
    let client = redis::Client::open(url)?;
    let mut conn = timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
        .await
        .map_err(|_| AppError::Cache(format!("connect to {url} timed out")))??;

    timeout(CONNECT_TIMEOUT, async {
        redis::cmd("SET")
            .arg(PROBE_KEY)
            .arg("ok")
            .arg("EX")
            .arg(PROBE_TTL_SECS)
            .query_async::<_, ()>(&mut conn)
            .await?;
        let _: Option<String> = conn.get(PROBE_KEY).await?;
        Ok::<_, redis::RedisError>(())
    })
    .await
    .map_err(|_| AppError::Cache(format!("probe against {url} timed out")))??;

    Ok(conn)
}

/// Probe the candidate endpoints in order and return the first that
/// answers; fall back to the in-process buffer when none do.
pub async fn select_backend(candidates: &[String]) -> CacheBackend {
    for url in candidates {
        match connect_remote(url).await {
            Ok(conn) => {
                info!(%url, "connected to cache endpoint");
                return CacheBackend::Remote(conn);
            }
            Err(e) => {
                warn!(%url, error = %e, "cache endpoint unreachable");
            }
        }
    }

    warn!("no cache endpoint reachable, using in-process backlog");
    CacheBackend::Local(VecDeque::new())
}
