//! `japaneseNameToSpecies`: Japanese species name -> `{dexId, enName, normalizedKey}`.
//!
//! Unlike the dex cache, this one is built by walking the paginated species
//! index once: entries are appended as discovered by the caller, and
//! subsequent runs simply read the persisted file. Rebuilding only happens
//! when the file is missing or empty.

use super::{load_or_default, save_atomic};
use crate::error::PipelineResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesEntry {
    pub dex_id: u32,
    pub en_name: String,
    pub normalized_key: String,
}

pub struct SpeciesCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, SpeciesEntry>>,
}

impl SpeciesCache {
    pub fn load(path: PathBuf) -> Self {
        let entries = load_or_default(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub async fn get(&self, japanese_name: &str) -> Option<SpeciesEntry> {
        self.entries.lock().await.get(japanese_name).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Append one discovered entry and persist. Called repeatedly while
    /// walking the paginated species index; last write for a given key
    /// wins, matching the index walk's "first-seen-stays" only insofar as
    /// callers are expected not to re-walk once the file is non-empty.
    pub async fn insert(&self, japanese_name: String, entry: SpeciesEntry) -> PipelineResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(japanese_name, entry);
        save_atomic(&self.path, &*entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SpeciesCache::load(dir.path().join("species.json"));
        assert!(cache.is_empty().await);
        assert_eq!(cache.get("ピカチュウ").await, None);
    }

    #[tokio::test]
    async fn insert_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("species.json");

        let entry = SpeciesEntry {
            dex_id: 25,
            en_name: "Pikachu".to_string(),
            normalized_key: "pikachu".to_string(),
        };

        {
            let cache = SpeciesCache::load(path.clone());
            cache
                .insert("ピカチュウ".to_string(), entry.clone())
                .await
                .unwrap();
            assert!(!cache.is_empty().await);
        }

        let reloaded = SpeciesCache::load(path);
        assert_eq!(reloaded.get("ピカチュウ").await, Some(entry));
    }
}
