//! Pipeline Driver.
//!
//! Sequences the phases end to end: build or load the catalog, validate it,
//! persist it, load and prune the sales window, collect new sales, persist
//! the merged window, aggregate median prices, and persist prices + run
//! metadata. A catalog-build failure under non-strict mode is swallowed —
//! the previous persisted catalog is kept and the run continues.

use crate::aggregate::aggregate_prices;
use crate::cache::{DexCache, SpeciesCache};
use crate::collector::{Collector, QuerySpec};
use crate::config::{CatalogStrategy, PipelineConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::http::{FetcherConfig, HttpFetcher};
use crate::model::Card;
use crate::providers::{english_fallback::EnglishFallbackAdapter, english_primary::EnglishPrimaryAdapter,
    japanese_index::JapaneseIndexAdapter, tcgdex::TcgdexAdapter, PartialRecord};
use crate::reconcile::Reconciler;
use crate::sales_store::SalesStore;
use crate::validate::validate_catalog;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    cards: Vec<Card>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    #[serde(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

pub struct Driver {
    config: PipelineConfig,
    queries: Vec<QuerySpec>,
}

impl Driver {
    pub fn new(config: PipelineConfig, queries: Vec<QuerySpec>) -> Self {
        Self { config, queries }
    }

    fn catalog_path(&self) -> std::path::PathBuf {
        self.config.output_path.join("catalog.json")
    }

    fn sales_path(&self) -> std::path::PathBuf {
        self.config.output_path.join("sales_30d.json")
    }

    fn prices_path(&self) -> std::path::PathBuf {
        self.config.output_path.join("prices.json")
    }

    fn meta_path(&self) -> std::path::PathBuf {
        self.config.output_path.join("meta.json")
    }

    pub async fn run(&self, now: DateTime<Utc>) -> PipelineResult<()> {
        let catalog = self.build_or_load_catalog(now).await?;

        let outcome = validate_catalog(
            &catalog,
            self.config.min_catalog_cards,
            self.config.min_english_cards,
            self.config.strict_catalog,
        )?;
        info!(
            "catalog validation: {} cards, {} english, ok={}",
            outcome.cards, outcome.english, outcome.ok
        );

        let catalog = if outcome.ok {
            self.persist_catalog(&catalog)?;
            catalog
        } else {
            info!("retaining previously persisted catalog after failed validation");
            load_catalog(&self.catalog_path()).unwrap_or(catalog)
        };

        let mut sales_store = SalesStore::load(self.sales_path(), now, self.config.days_window);

        let collector = Collector::new(
            HttpFetcher::new(FetcherConfig::default()),
            self.config.marketplace_base_url.clone(),
            self.config.marketplace_category.clone(),
            self.config.pages_per_query,
            self.config.confidence_threshold,
        );
        let new_sales = collector.collect(&self.queries, &catalog, now).await;
        info!("collector produced {} candidate sales", new_sales.len());
        sales_store.merge(new_sales);
        sales_store.persist()?;

        let prices = aggregate_prices(sales_store.sales());
        self.persist_prices(&prices)?;
        self.persist_meta(now)?;

        Ok(())
    }

    async fn build_or_load_catalog(&self, now: DateTime<Utc>) -> PipelineResult<Vec<Card>> {
        if self.config.skip_catalog {
            if let Some(cards) = load_catalog(&self.catalog_path()) {
                if !cards.is_empty() {
                    info!("skip_catalog: reusing {} persisted cards", cards.len());
                    return Ok(cards);
                }
            }
            warn!("skip_catalog set but no usable persisted catalog found; building fresh");
        }

        match self.build_catalog(now).await {
            Ok(cards) => Ok(cards),
            Err(err) if self.config.strict_catalog => Err(err),
            Err(err) => {
                warn!("catalog build failed ({err}); retaining previous catalog");
                Ok(load_catalog(&self.catalog_path()).unwrap_or_default())
            }
        }
    }

    async fn build_catalog(&self, _now: DateTime<Utc>) -> PipelineResult<Vec<Card>> {
        let dex_cache = DexCache::load(self.config.cache_path.join("dex_id_to_english.json"));
        let species_cache = SpeciesCache::load(self.config.cache_path.join("japanese_name_to_species.json"));

        let aggregated = match self.config.catalog_strategy {
            CatalogStrategy::Tcgdex => {
                let adapter = TcgdexAdapter::new(
                    HttpFetcher::new(FetcherConfig::default()),
                    self.config.tcgdex_base_url.clone(),
                );
                adapter.walk(&["en", "ja"]).await?
            }
            CatalogStrategy::Split => self.build_split_catalog(&species_cache).await?,
        };

        let reconciler = Reconciler::new(
            HttpFetcher::new(FetcherConfig::default()),
            dex_cache,
            species_cache,
            self.config.species_base_url.clone(),
            self.config.enrich_english_pokemon_key,
        );
        reconciler.reconcile(aggregated).await
    }

    async fn build_split_catalog(
        &self,
        species_cache: &SpeciesCache,
    ) -> PipelineResult<HashMap<(String, String), PartialRecord>> {
        let english_primary = EnglishPrimaryAdapter::new(
            HttpFetcher::new(FetcherConfig::default()),
            self.config.english_primary_base_url.clone(),
        );

        let mut english = match english_primary.fetch_all().await {
            Ok(records) => records,
            Err(err) => {
                warn!("english primary adapter failed ({err}); falling back to tcgdex english-only walk");
                let fallback = EnglishFallbackAdapter::new(
                    HttpFetcher::new(FetcherConfig::default()),
                    self.config.tcgdex_base_url.clone(),
                );
                fallback.fetch_all().await?
            }
        };

        // Bulk per-set image map from the structured API, restricted to
        // `ja`, so the HTML index adapter can prefer it over scraped <img>
        // tags without paying for a per-card detail fetch.
        let image_map = TcgdexAdapter::new(
            HttpFetcher::new(FetcherConfig::default()),
            self.config.tcgdex_base_url.clone(),
        )
        .walk(&["ja"])
        .await
        .map(build_image_map)
        .unwrap_or_default();

        let japanese_index = JapaneseIndexAdapter::new(
            HttpFetcher::new(FetcherConfig::default()),
            self.config.japanese_index_base_url.clone(),
        );
        let japanese = japanese_index.walk(species_cache, &image_map).await?;

        for (key, record) in japanese {
            english
                .entry(key)
                .and_modify(|existing| existing.merge(record.clone()))
                .or_insert(record);
        }

        Ok(english)
    }

    fn persist_catalog(&self, cards: &[Card]) -> PipelineResult<()> {
        crate::cache::save_atomic(&self.catalog_path(), &CatalogFile { cards: cards.to_vec() })
    }

    fn persist_prices(&self, prices: &crate::aggregate::PricesByCard) -> PipelineResult<()> {
        #[derive(Serialize)]
        struct PricesFile<'a> {
            #[serde(rename = "byCard")]
            by_card: &'a crate::aggregate::PricesByCard,
        }
        crate::cache::save_atomic(&self.prices_path(), &PricesFile { by_card: prices })
    }

    fn persist_meta(&self, now: DateTime<Utc>) -> PipelineResult<()> {
        crate::cache::save_atomic(&self.meta_path(), &Meta { updated_at: now })
    }
}

fn build_image_map(
    records: HashMap<(String, String), PartialRecord>,
) -> HashMap<String, HashMap<String, String>> {
    let mut map: HashMap<String, HashMap<String, String>> = HashMap::new();
    for ((set_id, number), record) in records {
        if let Some(image) = record.image_large {
            map.entry(set_id).or_default().insert(number, image);
        }
    }
    map
}

fn load_catalog(path: &std::path::Path) -> Option<Vec<Card>> {
    let contents = fs::read_to_string(path).ok()?;
    if contents.trim().is_empty() {
        return None;
    }
    let file: CatalogFile = serde_json::from_str(&contents).ok()?;
    Some(file.cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrintingLang;

    fn card() -> Card {
        Card {
            id: "x".to_string(),
            card_key: "x".to_string(),
            set_id: "x".to_string(),
            set_name: "x".to_string(),
            number: "1".to_string(),
            number_full: None,
            printing_lang: PrintingLang::En,
            name: "x".to_string(),
            name_en: None,
            name_ja: None,
            pokemon_key: None,
            rarity: None,
            features: vec![],
            image_large: None,
        }
    }

    #[test]
    fn loads_persisted_catalog_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let file = CatalogFile { cards: vec![card()] };
        fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let loaded = load_catalog(&path).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn missing_catalog_file_yields_none() {
        let loaded = load_catalog(std::path::Path::new("/nonexistent/catalog.json"));
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn missing_persisted_catalog_with_skip_catalog_falls_through_to_build() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.skip_catalog = true;
        config.output_path = dir.path().to_path_buf();
        config.cache_path = dir.path().to_path_buf();
        config.tcgdex_base_url = "http://127.0.0.1:0".to_string();
        config.catalog_strategy = CatalogStrategy::Tcgdex;
        config.strict_catalog = false;

        let driver = Driver::new(config, vec![]);
        let cards = driver.build_or_load_catalog(Utc::now()).await.unwrap();
        assert!(cards.is_empty(), "unreachable sources with non-strict mode should yield an empty catalog, not an error");
    }
}
