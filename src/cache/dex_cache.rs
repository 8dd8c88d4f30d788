//! `dexIdToEnglish`: national-dex-id -> English species name.

use super::{load_or_default, save_atomic};
use crate::error::PipelineResult;
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Read-through cache keyed by national Pokédex id. Fill-on-demand via a
/// caller-supplied async resolver so this module stays free of HTTP
/// concerns (the resolver is owned by the species-endpoint adapter).
pub struct DexCache {
    path: PathBuf,
    entries: Mutex<HashMap<u32, String>>,
    inflight: DashMap<u32, Arc<Mutex<()>>>,
}

impl DexCache {
    pub fn load(path: PathBuf) -> Self {
        let entries = load_or_default(&path);
        Self {
            path,
            entries: Mutex::new(entries),
            inflight: DashMap::new(),
        }
    }

    pub async fn get(&self, dex_id: u32) -> Option<String> {
        self.entries.lock().await.get(&dex_id).cloned()
    }

    /// Fetch-or-resolve: returns the cached name if present, otherwise
    /// runs `resolve` exactly once even if called concurrently for the
    /// same `dex_id` (single-flight), writes the result to memory and disk,
    /// and returns it. If `resolve` yields `None`, nothing is cached and a
    /// later call will retry.
    pub async fn get_or_resolve<F, Fut>(&self, dex_id: u32, resolve: F) -> PipelineResult<Option<String>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Option<String>>,
    {
        if let Some(existing) = self.get(dex_id).await {
            return Ok(Some(existing));
        }

        let lock = self
            .inflight
            .entry(dex_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check: another task may have resolved this key while we
        // waited for the single-flight lock.
        if let Some(existing) = self.get(dex_id).await {
            return Ok(Some(existing));
        }

        let Some(name) = resolve().await else {
            return Ok(None);
        };

        {
            let mut entries = self.entries.lock().await;
            entries.insert(dex_id, name.clone());
            save_atomic(&self.path, &*entries)?;
        }

        Ok(Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn caches_resolved_values() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DexCache::load(dir.path().join("dex.json"));

        let calls = AtomicUsize::new(0);
        let result = cache
            .get_or_resolve(25, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Some("Pikachu".to_string())
            })
            .await
            .unwrap();
        assert_eq!(result, Some("Pikachu".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second call should hit the in-memory cache, not call resolve again.
        let result2 = cache
            .get_or_resolve(25, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Some("should-not-happen".to_string())
            })
            .await
            .unwrap();
        assert_eq!(result2, Some("Pikachu".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dex.json");

        {
            let cache = DexCache::load(path.clone());
            cache
                .get_or_resolve(6, || async { Some("Charizard".to_string()) })
                .await
                .unwrap();
        }

        let reloaded = DexCache::load(path);
        assert_eq!(reloaded.get(6).await, Some("Charizard".to_string()));
    }

    #[tokio::test]
    async fn missing_resolution_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DexCache::load(dir.path().join("dex.json"));

        let result = cache.get_or_resolve(999, || async { None }).await.unwrap();
        assert_eq!(result, None);
        assert_eq!(cache.get(999).await, None);
    }
}
