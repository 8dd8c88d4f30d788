//! Pipeline configuration.
//!
//! Layered the way `config` is meant to be used: defaults, then an
//! optional properties file, then environment variables (prefix
//! `TCG_CATALOG_`) on top, each layer only overriding what it sets.

use crate::error::{PipelineError, PipelineResult};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogStrategy {
    Tcgdex,
    Split,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub skip_catalog: bool,
    pub catalog_strategy: CatalogStrategy,
    pub enrich_english_pokemon_key: bool,
    pub strict_catalog: bool,
    pub min_catalog_cards: usize,
    pub min_english_cards: usize,
    pub days_window: i64,
    pub pages_per_query: u32,
    pub confidence_threshold: f64,

    pub output_path: PathBuf,
    pub cache_path: PathBuf,

    pub tcgdex_base_url: String,
    pub english_primary_base_url: String,
    pub species_base_url: String,
    pub japanese_index_base_url: String,
    pub marketplace_base_url: String,
    pub marketplace_category: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            skip_catalog: false,
            catalog_strategy: CatalogStrategy::Split,
            enrich_english_pokemon_key: false,
            strict_catalog: false,
            min_catalog_cards: 12_000,
            min_english_cards: 8_000,
            days_window: 30,
            pages_per_query: 2,
            confidence_threshold: 0.72,
            output_path: PathBuf::from("output"),
            cache_path: PathBuf::from("cache"),
            tcgdex_base_url: "https://api.tcgdex.net/v2".to_string(),
            english_primary_base_url: "https://api.pokemontcg.io".to_string(),
            species_base_url: "https://pokeapi.co/api/v2".to_string(),
            japanese_index_base_url: "https://www.pokellector.jp".to_string(),
            marketplace_base_url: "https://www.ebay.com/sch/i.html".to_string(),
            marketplace_category: "2536".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load defaults, overlaid by `properties_path` if it exists, overlaid
    /// by `TCG_CATALOG_*` environment variables.
    pub fn load(properties_path: &Path) -> PipelineResult<Self> {
        let defaults = Self::default();
        let defaults_json = serde_json::to_value(&defaults).map_err(PipelineError::Json)?;

        let mut builder = Config::builder().add_source(
            Config::try_from(&defaults_json)
                .map_err(|err| PipelineError::Config(format!("could not seed config defaults: {err}")))?,
        );

        if properties_path.exists() {
            builder = builder.add_source(File::new(
                properties_path.to_string_lossy().as_ref(),
                FileFormat::Ini,
            ));
        }

        builder = builder.add_source(Environment::with_prefix("TCG_CATALOG").separator("__"));

        let built = builder
            .build()
            .map_err(|err| PipelineError::Config(format!("could not build config: {err}")))?;

        built
            .try_deserialize()
            .map_err(|err| PipelineError::Config(format!("could not deserialize config: {err}")))
    }

    pub fn default_properties_path() -> PathBuf {
        PathBuf::from("tcg-catalog.properties")
    }
}
