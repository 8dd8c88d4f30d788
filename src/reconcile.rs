//! Catalog Reconciler.
//!
//! Takes the aggregation map produced by the source adapters and produces
//! the final sequence of `Card` records: infers each record's printing
//! language, drives the enrichment chain (image backfill, then language
//! linkage), and explodes each surviving record into one or two printings
//! with a stable id.

use crate::cache::{DexCache, SpeciesCache};
use crate::error::PipelineResult;
use crate::http::{HttpFetcher, Throttle};
use crate::model::{Card, PrintingLang};
use crate::normalize::normalize;
use crate::providers::{looks_japanese_exclusive, PartialRecord};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InferredLang {
    Japanese,
    Unspecified,
}

pub struct Reconciler {
    fetcher: HttpFetcher,
    dex_cache: DexCache,
    species_cache: SpeciesCache,
    species_base_url: String,
    detail_throttle: Throttle,
    enrich_english_pokemon_key: bool,
}

impl Reconciler {
    pub fn new(
        fetcher: HttpFetcher,
        dex_cache: DexCache,
        species_cache: SpeciesCache,
        species_base_url: impl Into<String>,
        enrich_english_pokemon_key: bool,
    ) -> Self {
        Self {
            fetcher,
            dex_cache,
            species_cache,
            species_base_url: species_base_url.into(),
            // Detail fetches pause ~700ms every 40 requests.
            detail_throttle: Throttle::new(40, Duration::from_millis(700)),
            enrich_english_pokemon_key,
        }
    }

    pub async fn reconcile(
        &self,
        aggregated: HashMap<(String, String), PartialRecord>,
    ) -> PipelineResult<Vec<Card>> {
        let japanese_exclusive_sets: HashSet<String> = aggregated
            .values()
            .filter(|p| p.japanese_exclusive)
            .map(|p| p.set_id.clone())
            .collect();

        let mut cards = Vec::new();
        for (_, mut partial) in aggregated {
            let lang = Self::infer_lang(&partial.set_id, &japanese_exclusive_sets);
            self.enrich(&mut partial, lang).await?;
            cards.extend(self.explode(&partial, lang));
        }

        Ok(cards)
    }

    fn infer_lang(set_id: &str, japanese_exclusive_sets: &HashSet<String>) -> InferredLang {
        if japanese_exclusive_sets.contains(set_id) || looks_japanese_exclusive(set_id) {
            InferredLang::Japanese
        } else {
            InferredLang::Unspecified
        }
    }

    async fn enrich(&self, partial: &mut PartialRecord, lang: InferredLang) -> PipelineResult<()> {
        // 1. Image backfill.
        if partial.image_large.is_none() {
            let detail_url = partial
                .detail_url_en
                .clone()
                .or_else(|| partial.detail_url_ja.clone());
            if let Some(url) = detail_url {
                self.detail_throttle.tick().await;
                if let Some(value) = self.fetcher.fetch_json(&url).await {
                    if let Some(image) = value.get("image").and_then(|v| v.as_str()) {
                        partial.image_large = Some(image.to_string());
                    }
                }
            }
        }

        // 2. Japanese -> English linkage.
        let needs_english_link = partial.name_en.is_none();
        if lang == InferredLang::Japanese && needs_english_link {
            if let Some(dex_id) = partial.dex_id_ja {
                self.detail_throttle.tick().await;
                if let Some(name) = self
                    .dex_cache
                    .get_or_resolve(dex_id, || self.resolve_species_name(dex_id))
                    .await?
                {
                    partial.name_en = Some(name.clone());
                    partial.resolved_pokemon_key = Some(normalize(&name));
                }
            } else if let Some(name_ja) = partial.name_ja.clone() {
                if let Some(entry) = self.species_cache.get(&name_ja).await {
                    partial.name_en = Some(entry.en_name.clone());
                    partial.resolved_pokemon_key = Some(entry.normalized_key.clone());
                }
            }
        }

        // 3. Optional English linkage, opt-in only.
        if self.enrich_english_pokemon_key
            && lang != InferredLang::Japanese
            && partial.resolved_pokemon_key.is_none()
        {
            if let Some(dex_id) = partial.dex_id_en {
                self.detail_throttle.tick().await;
                if let Some(name) = self
                    .dex_cache
                    .get_or_resolve(dex_id, || self.resolve_species_name(dex_id))
                    .await?
                {
                    partial.resolved_pokemon_key = Some(normalize(&name));
                }
            }
        }

        Ok(())
    }

    async fn resolve_species_name(&self, dex_id: u32) -> Option<String> {
        let url = format!("{}/pokemon-species/{dex_id}/", self.species_base_url);
        let value = self.fetcher.fetch_json(&url).await?;

        let from_names = value.get("names").and_then(|v| v.as_array()).and_then(|names| {
            names.iter().find_map(|entry| -> Option<String> {
                let lang = entry.get("language")?.get("name")?.as_str()?;
                if lang != "en" {
                    return None;
                }
                entry.get("name")?.as_str().map(str::to_string)
            })
        });

        from_names.or_else(|| value.get("name").and_then(|v| v.as_str()).map(str::to_string))
    }

    fn explode(&self, partial: &PartialRecord, lang: InferredLang) -> Vec<Card> {
        let mut out = Vec::new();

        match lang {
            InferredLang::Japanese => {
                if let Some(name) = partial.name_ja.clone().or_else(|| partial.name_en.clone()) {
                    out.push(self.build_card(partial, PrintingLang::Ja, name));
                }
            }
            InferredLang::Unspecified => {
                if let Some(name_en) = partial.name_en.clone() {
                    out.push(self.build_card(partial, PrintingLang::En, name_en));
                }
                if let Some(name_ja) = partial.name_ja.clone() {
                    out.push(self.build_card(partial, PrintingLang::Ja, name_ja));
                }
            }
        }

        out
    }

    fn build_card(&self, partial: &PartialRecord, printing_lang: PrintingLang, name: String) -> Card {
        let preferred_name = partial.name_en.clone().unwrap_or_else(|| name.clone());
        let pokemon_key = partial
            .resolved_pokemon_key
            .clone()
            .or_else(|| partial.name_en.as_ref().map(|n| normalize(n)));

        Card {
            id: Card::make_id(&partial.set_id, &partial.number, &preferred_name, printing_lang),
            card_key: Card::make_card_key(&partial.set_id, &partial.number, printing_lang),
            set_id: partial.set_id.clone(),
            set_name: partial.set_name.clone(),
            number: partial.number.clone(),
            number_full: partial.number_full.clone(),
            printing_lang,
            name,
            name_en: partial.name_en.clone(),
            name_ja: partial.name_ja.clone(),
            pokemon_key,
            rarity: partial.rarity.clone(),
            features: partial.features.clone(),
            image_large: partial.image_large.clone(),
        }
    }
}
