//! per-repository memoization of read results.
//!
//! an entry lives until something invalidates it: no size bound, no expiry.
//! concurrent misses on one key are not coalesced; each one fetches and the
//! last to finish wins the slot. a fetch that overlaps an invalidation hands
//! its result to the caller but does not store it.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::repositories::Result;
use crate::utils::LetChain;

/// a scope plus named, possibly absent, parameters.
///
/// renders as `scope?name=value&name=*` for logs; `*` stands for an absent
/// parameter. entries are keyed on the parameters themselves, not on the
/// rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    scope: &'static str,
    params: Vec<(&'static str, Option<String>)>,
}

impl CacheKey {
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            params: vec![],
        }
    }

    pub fn with(mut self, name: &'static str, value: Option<impl Display>) -> Self {
        self.params.push((name, value.map(|v| v.to_string())));
        self
    }

    pub fn scope(&self) -> &'static str { self.scope }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scope)?;

        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value.as_deref().unwrap_or("*"))?;
        }

        Ok(())
    }
}

pub struct QueryCache<V> {
    entries: Mutex<HashMap<CacheKey, Arc<V>>>,
    /// bumped under the `entries` lock by every invalidation
    epoch: AtomicU64,
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }
}

impl<V> QueryCache<V> {
    pub fn new() -> Self { Self::default() }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn insert(&self, key: &CacheKey, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries
            .lock()
            .await
            .insert(key.clone(), value.clone());

        value
    }

    /// hit: the stored value, without calling `fetch`.
    /// miss: `fetch`, then store what it returned. errors are not stored,
    /// and neither is a value fetched while something was invalidated.
    pub async fn get_or_fetch<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let epoch = {
            let entries = self.entries.lock().await;

            if let Some(hit) = entries.get(key) {
                tracing::debug!(%key, "cache hit");
                return Ok(hit.clone());
            }

            self.epoch.load(Ordering::SeqCst)
        };

        tracing::debug!(%key, "cache miss");
        // the lock is not held across `fetch`
        let value = Arc::new(fetch().await?);

        let mut entries = self.entries.lock().await;
        match self.epoch.load(Ordering::SeqCst) == epoch {
            true => entries.insert(key.clone(), value.clone()).let_(::core::mem::drop),
            false => tracing::debug!(%key, "invalidated while fetching, not stored"),
        }

        Ok(value)
    }

    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        let mut entries = self.entries.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);

        entries.remove(key).is_some()
    }

    /// drops every entry whose key was built with `scope`.
    pub async fn invalidate_scope(&self, scope: &str) {
        let mut entries = self.entries.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);

        entries.retain(|k, _| k.scope != scope);
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);

        entries.clear()
    }

    pub async fn len(&self) -> usize { self.entries.lock().await.len() }
}
