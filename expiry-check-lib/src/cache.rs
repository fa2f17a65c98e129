//! Memoization of expiration results per domain.
//!
//! The cache is keyed by domain alone and lives until [`ExpirationCache::clear`]
//! is called. `Unknown` results are cached like `Known` ones, so a domain with
//! no expiration data is not queried again. Each entry is a once-cell: while a
//! resolution is in flight, other requesters for the same domain wait for it
//! instead of starting their own.

use crate::types::ExpirationResult;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<ExpirationResult>>;

/// Shared, clearable domain → expiration map.
///
/// Safe to use from several tasks at once. Callers only get `get`, `put`,
/// `clear` and the resolve-through helper; entries are never exposed.
#[derive(Debug, Default)]
pub struct ExpirationCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl ExpirationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `domain`, if a resolution has completed.
    pub fn get(&self, domain: &str) -> Option<ExpirationResult> {
        self.lock()
            .get(&cache_key(domain))
            .and_then(|slot| slot.get().copied())
    }

    /// Store a result, replacing any previous entry.
    pub fn put(&self, domain: &str, result: ExpirationResult) {
        let slot = Arc::new(OnceCell::new_with(Some(result)));
        self.lock().insert(cache_key(domain), slot);
    }

    /// Drop every entry. Lookups already in flight finish normally but
    /// their results are not visible to later requests.
    pub fn clear(&self) {
        let mut entries = self.lock();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "expiration cache cleared");
    }

    /// Number of domains with a slot (completed or in flight).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Return the cached result or run `resolve` to produce it.
    ///
    /// At most one `resolve` runs per domain at a time. A successful result is
    /// stored; an error leaves the domain uncached so a later call retries.
    pub async fn get_or_try_resolve<F, Fut, E>(
        &self,
        domain: &str,
        resolve: F,
    ) -> Result<ExpirationResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExpirationResult, E>>,
    {
        let slot = {
            let mut entries = self.lock();
            entries.entry(cache_key(domain)).or_default().clone()
        };

        if let Some(result) = slot.get() {
            tracing::debug!(domain, %result, "expiration cache hit");
            return Ok(*result);
        }

        slot.get_or_try_init(resolve).await.copied()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn cache_key(domain: &str) -> String {
    domain.trim().to_ascii_lowercase()
}
