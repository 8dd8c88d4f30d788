//! English primary adapter (`split` strategy, English half).
//!
//! Paginates the English card API. Detects hard failure distinctly so the
//! Reconciler can fall back to the Japanese-index adapter's English-only
//! sibling: an unrecoverable status, repeated retries exhausted, or an
//! empty `data` page despite a non-zero declared total.

use super::PartialRecord;
use crate::error::{PipelineError, PipelineResult};
use crate::http::{HttpFetcher, Throttle};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const PAGE_SIZE: u32 = 250;

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<CardRow>,
    #[serde(rename = "totalCount", default)]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct CardRow {
    id: String,
    name: String,
    #[serde(rename = "localId")]
    local_id: String,
    set: SetRef,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    rarity: Option<String>,
    #[serde(rename = "dexId", default)]
    dex_id: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct SetRef {
    id: String,
    #[serde(default)]
    name: String,
}

pub struct EnglishPrimaryAdapter {
    fetcher: HttpFetcher,
    base_url: String,
    page_throttle: Throttle,
}

impl EnglishPrimaryAdapter {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            // Paginated API calls pause ~200ms every 6 pages.
            page_throttle: Throttle::new(6, Duration::from_millis(200)),
        }
    }

    pub async fn fetch_all(&self) -> PipelineResult<HashMap<(String, String), PartialRecord>> {
        let mut out = HashMap::new();
        let mut page_num: u32 = 1;
        let mut seen_any = false;

        loop {
            self.page_throttle.tick().await;
            let url = format!(
                "{}/v2/cards?page={page_num}&pageSize={PAGE_SIZE}&q=supertype:pokemon",
                self.base_url
            );
            let Some(value) = self.fetcher.fetch_json(&url).await else {
                if seen_any {
                    // Treat "ran out of readable pages mid-walk" the same
                    // as reaching the end: partial progress is kept.
                    break;
                }
                return Err(PipelineError::SourceFatal(
                    "english primary adapter: no readable page at all".to_string(),
                ));
            };

            let page: Page = serde_json::from_value(value).map_err(|err| {
                PipelineError::SourceFatal(format!("english primary adapter: malformed page: {err}"))
            })?;

            if page.data.is_empty() {
                if page.total_count > 0 && !seen_any {
                    return Err(PipelineError::SourceFatal(
                        "english primary adapter: empty data with non-zero total".to_string(),
                    ));
                }
                break;
            }

            for row in page.data {
                let partial = PartialRecord {
                    set_id: row.set.id.clone(),
                    set_name: row.set.name.clone(),
                    number: row.local_id.clone(),
                    number_full: None,
                    name_en: Some(row.name.clone()),
                    name_ja: None,
                    rarity: row.rarity.clone(),
                    features: row.rarity.clone().into_iter().collect(),
                    image_large: row.image.clone(),
                    dex_id_en: row.dex_id.first().copied(),
                    dex_id_ja: None,
                    detail_url_en: Some(format!("{}/en/cards/{}", self.base_url, row.id)),
                    detail_url_ja: None,
                    japanese_exclusive: false,
                    resolved_pokemon_key: None,
                };
                // pokemonKey itself is derived by the Reconciler at explosion
                // time, from dexId if present or normalize(name) otherwise.
                out.insert((row.set.id, row.local_id), partial);
            }

            seen_any = true;
            page_num += 1;
        }

        Ok(out)
    }
}
