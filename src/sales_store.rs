//! Rolling-Window Store.
//!
//! Loads the previous run's sales, drops anything older than the window,
//! merges in newly-collected sales by composite dedup key, and persists
//! the survivors.

use crate::error::PipelineResult;
use crate::model::Sale;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SalesFile {
    sales: Vec<Sale>,
}

pub struct SalesStore {
    path: PathBuf,
    sales: Vec<Sale>,
}

impl SalesStore {
    pub fn load(path: PathBuf, now: DateTime<Utc>, days_window: i64) -> Self {
        let file: SalesFile = match fs::read_to_string(&path) {
            Ok(contents) if !contents.trim().is_empty() => {
                serde_json::from_str(&contents).unwrap_or_default()
            }
            _ => SalesFile::default(),
        };

        let cutoff = now - ChronoDuration::days(days_window);
        let sales = file.sales.into_iter().filter(|s| s.collected_at >= cutoff).collect();

        Self { path, sales }
    }

    pub fn sales(&self) -> &[Sale] {
        &self.sales
    }

    /// Merge newly-collected sales in, deduplicating by composite key.
    /// Existing entries win ties; a duplicate key from `new_sales` is
    /// dropped rather than replacing what's already retained.
    pub fn merge(&mut self, new_sales: Vec<Sale>) {
        let mut seen: HashSet<_> = self.sales.iter().map(Sale::dedup_key).collect();
        for sale in new_sales {
            let key = sale.dedup_key();
            if seen.insert(key) {
                self.sales.push(sale);
            }
        }
    }

    pub fn persist(&self) -> PipelineResult<()> {
        crate::cache::save_atomic(&self.path, &SalesFile { sales: self.sales.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bucket;
    use chrono::Duration as ChronoDur;

    fn sale(url: &str, collected_at: DateTime<Utc>) -> Sale {
        Sale {
            collected_at,
            source: "marketplace".to_string(),
            title: "Pikachu V".to_string(),
            url: url.to_string(),
            price_eur: 29.90,
            card_id: "sv9a-181-pikachu-v-ja".to_string(),
            bucket: Bucket::Raw,
        }
    }

    #[test]
    fn prunes_entries_outside_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.json");
        let now = Utc::now();

        let file = SalesFile {
            sales: vec![
                sale("old", now - ChronoDur::days(40)),
                sale("recent", now - ChronoDur::days(5)),
            ],
        };
        fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let store = SalesStore::load(path, now, 30);
        assert_eq!(store.sales().len(), 1);
        assert_eq!(store.sales()[0].url, "recent");
    }

    #[test]
    fn merge_deduplicates_by_composite_key() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let mut store = SalesStore::load(dir.path().join("sales.json"), now, 30);

        let s1 = sale("http://x/1", now);
        store.merge(vec![s1.clone(), s1.clone()]);
        assert_eq!(store.sales().len(), 1);

        store.merge(vec![s1]);
        assert_eq!(store.sales().len(), 1, "re-observing the same sale must not double it");
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.json");
        let now = Utc::now();

        let mut store = SalesStore::load(path.clone(), now, 30);
        store.merge(vec![sale("http://x/1", now)]);
        store.persist().unwrap();

        let reloaded = SalesStore::load(path, now, 30);
        assert_eq!(reloaded.sales().len(), 1);
    }
}
