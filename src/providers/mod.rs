//! Catalog Source Adapters.
//!
//! Three adapters producing partial card records, plus the shared
//! `PartialRecord` shape the Reconciler merges them into.

pub mod english_fallback;
pub mod english_primary;
pub mod japanese_index;
pub mod tcgdex;

use serde::{Deserialize, Serialize};

/// One source's view of a printing at a given `(setId, number)`. The
/// Reconciler merges several of these (one per contributing source) into a
/// single aggregated record before explosion into output `Card`s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialRecord {
    pub set_id: String,
    pub set_name: String,
    pub number: String,
    pub number_full: Option<String>,
    pub name_en: Option<String>,
    pub name_ja: Option<String>,
    pub rarity: Option<String>,
    pub features: Vec<String>,
    pub image_large: Option<String>,
    pub dex_id_en: Option<u32>,
    pub dex_id_ja: Option<u32>,
    pub detail_url_en: Option<String>,
    pub detail_url_ja: Option<String>,
    pub japanese_exclusive: bool,
    /// Set once the Reconciler resolves a cross-language species anchor
    /// via the dex or species-name cache; distinct from `name_en` because
    /// a card's own display name and its canonical species name can differ.
    pub resolved_pokemon_key: Option<String>,
}

impl PartialRecord {
    pub fn key(&self) -> (String, String) {
        (self.set_id.clone(), self.number.clone())
    }

    /// Merge another source's view into this one. First-seen field
    /// precedence: an already-populated field is never overwritten, except
    /// `japaneseExclusive` which is sticky-true.
    pub fn merge(&mut self, other: PartialRecord) {
        if self.set_name.is_empty() {
            self.set_name = other.set_name;
        }
        self.number_full = self.number_full.take().or(other.number_full);
        self.name_en = self.name_en.take().or(other.name_en);
        self.name_ja = self.name_ja.take().or(other.name_ja);
        self.rarity = self.rarity.take().or(other.rarity);
        if self.features.is_empty() {
            self.features = other.features;
        }
        self.image_large = self.image_large.take().or(other.image_large);
        self.dex_id_en = self.dex_id_en.or(other.dex_id_en);
        self.dex_id_ja = self.dex_id_ja.or(other.dex_id_ja);
        self.detail_url_en = self.detail_url_en.take().or(other.detail_url_en);
        self.detail_url_ja = self.detail_url_ja.take().or(other.detail_url_ja);
        self.japanese_exclusive = self.japanese_exclusive || other.japanese_exclusive;
        self.resolved_pokemon_key = self.resolved_pokemon_key.take().or(other.resolved_pokemon_key);
    }
}

/// National Pokédex id parsed from a source's JSON, which represents it
/// inconsistently: sometimes a bare number, sometimes a one-element array.
/// Both forms are unified here rather than guessed at per call site.
pub fn parse_dex_id(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(|n| n as u32),
        serde_json::Value::Array(arr) => arr.first().and_then(parse_dex_id),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Excluded sub-series tag: the "pocket edition" sets the dual-language
/// adapter skips outright.
pub fn is_excluded_sub_series(set_id: &str) -> bool {
    set_id.to_ascii_lowercase().contains("pocket")
}

/// `setId` shapes that imply a Japanese-exclusive release even when no
/// `ja` index entry marked it so directly.
pub fn looks_japanese_exclusive(set_id: &str) -> bool {
    static RE: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"(?i)^(sv|s|sm|bw|xy)\d{1,3}a$").unwrap());
    RE.is_match(set_id)
}
