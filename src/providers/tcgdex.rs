//! Dual-language structured adapter (`tcgdex` catalog strategy).
//!
//! Walks sets then cards for both `en` and `ja`, accumulating partial
//! records keyed by `(setId, number)`. A set observed only under `ja`
//! marks its id Japanese-exclusive for the Reconciler's language
//! inference.

use super::{is_excluded_sub_series, parse_dex_id, PartialRecord};
use crate::http::{HttpFetcher, Throttle};
use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SetSummary {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SetDetail {
    #[serde(default)]
    cards: Vec<CardRow>,
}

#[derive(Debug, Deserialize)]
struct CardRow {
    #[serde(default)]
    name: String,
    #[serde(alias = "number")]
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    rarity: Option<String>,
    #[serde(default)]
    #[serde(rename = "dexId")]
    dex_id: Option<serde_json::Value>,
}

pub struct TcgdexAdapter {
    fetcher: HttpFetcher,
    base_url: String,
    set_throttle: Throttle,
}

impl TcgdexAdapter {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            // Bulk set fetches pause ~250ms every 8-10 requests.
            set_throttle: Throttle::new(8, Duration::from_millis(250)),
        }
    }

    pub async fn walk(&self, languages: &[&str]) -> PipelineResult<HashMap<(String, String), PartialRecord>> {
        let mut out: HashMap<(String, String), PartialRecord> = HashMap::new();

        for &lang in languages {
            let sets = self.fetch_sets(lang).await.ok_or_else(|| {
                PipelineError::SourceFatal(format!("tcgdex: could not list {lang} sets"))
            })?;

            for set in sets {
                if is_excluded_sub_series(&set.id) {
                    continue;
                }
                self.set_throttle.tick().await;

                let Some(detail) = self.fetch_set_detail(lang, &set.id).await else {
                    continue;
                };

                for row in detail.cards {
                    let partial = PartialRecord {
                        set_id: set.id.clone(),
                        set_name: set.name.clone(),
                        number: row.local_id.clone(),
                        number_full: None,
                        name_en: (lang == "en").then(|| row.name.clone()),
                        name_ja: (lang == "ja").then(|| row.name.clone()),
                        rarity: row.rarity.clone(),
                        features: row.rarity.clone().into_iter().collect(),
                        image_large: row.image.clone(),
                        dex_id_en: (lang == "en").then(|| row.dex_id.as_ref().and_then(parse_dex_id)).flatten(),
                        dex_id_ja: (lang == "ja").then(|| row.dex_id.as_ref().and_then(parse_dex_id)).flatten(),
                        detail_url_en: None,
                        detail_url_ja: None,
                        japanese_exclusive: lang == "ja",
                        resolved_pokemon_key: None,
                    };

                    out.entry((set.id.clone(), row.local_id.clone()))
                        .and_modify(|existing| existing.merge(partial.clone()))
                        .or_insert(partial);
                }
            }
        }

        Ok(out)
    }

    async fn fetch_sets(&self, lang: &str) -> Option<Vec<SetSummary>> {
        let url = format!("{}/{lang}/sets", self.base_url);
        let value = self.fetcher.fetch_json(&url).await?;
        serde_json::from_value(value).ok()
    }

    async fn fetch_set_detail(&self, lang: &str, set_id: &str) -> Option<SetDetail> {
        let url = format!("{}/{lang}/sets/{set_id}", self.base_url);
        let value = self.fetcher.fetch_json(&url).await?;
        serde_json::from_value(value).ok()
    }
}
