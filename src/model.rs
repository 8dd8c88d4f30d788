//! Canonical data model: `Card`, `Sale`, `Bucket`, `PriceAggregate`.
//!
//! Field names are serialized camelCase-ish to match the on-wire shape
//! consumers expect, with `printingLang` emitted as `lang`. Optional
//! fields are omitted when absent rather than emitted as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The language of the physical card printing (distinct from whichever
/// name happens to be displayed on a given record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintingLang {
    En,
    Ja,
}

impl PrintingLang {
    pub fn as_str(self) -> &'static str {
        match self {
            PrintingLang::En => "en",
            PrintingLang::Ja => "ja",
        }
    }
}

/// A discrete grade bucket for a sold listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Raw,
    #[serde(rename = "graad_7")]
    Graad7,
    #[serde(rename = "graad_8")]
    Graad8,
    #[serde(rename = "graad_9")]
    Graad9,
    #[serde(rename = "graad_9_5")]
    Graad9_5,
    #[serde(rename = "graad_10")]
    Graad10,
}

impl Bucket {
    /// The six canonical buckets, in the order they are always emitted.
    pub const CANONICAL: [Bucket; 6] = [
        Bucket::Raw,
        Bucket::Graad7,
        Bucket::Graad8,
        Bucket::Graad9,
        Bucket::Graad9_5,
        Bucket::Graad10,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Bucket::Raw => "raw",
            Bucket::Graad7 => "graad_7",
            Bucket::Graad8 => "graad_8",
            Bucket::Graad9 => "graad_9",
            Bucket::Graad9_5 => "graad_9_5",
            Bucket::Graad10 => "graad_10",
        }
    }
}

/// A single catalog entry: one printing of one card.
///
/// Invariants (stable id, well-formed `cardKey`, consistent language) are
/// enforced by the Reconciler at construction time, not by this struct
/// itself, which stays a plain data holder with behavior kept in builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(rename = "cardKey", skip_serializing, default)]
    pub card_key: String,
    #[serde(rename = "setId")]
    pub set_id: String,
    #[serde(rename = "setName")]
    pub set_name: String,
    pub number: String,
    #[serde(rename = "numberFull", skip_serializing_if = "Option::is_none")]
    pub number_full: Option<String>,
    #[serde(rename = "lang")]
    pub printing_lang: PrintingLang,
    pub name: String,
    #[serde(rename = "nameEn", skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(rename = "nameJa", skip_serializing_if = "Option::is_none")]
    pub name_ja: Option<String>,
    #[serde(rename = "pokemonKey", skip_serializing_if = "Option::is_none")]
    pub pokemon_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(rename = "imageLarge", skip_serializing_if = "Option::is_none")]
    pub image_large: Option<String>,
}

impl Card {
    /// Deterministic `cardKey`, stable across runs regardless of any
    /// display-name formatting noise.
    pub fn make_card_key(set_id: &str, number: &str, lang: PrintingLang) -> String {
        format!("{set_id}|{number}|{}", lang.as_str())
    }

    /// Deterministic `id`, using the English normalized name when present
    /// so the same printing keeps the same id across runs even when the
    /// display name is in the printing language.
    pub fn make_id(
        set_id: &str,
        number: &str,
        preferred_name: &str,
        lang: PrintingLang,
    ) -> String {
        let key = crate::normalize::normalize(preferred_name).replace(' ', "-");
        format!("{set_id}-{number}-{key}-{}", lang.as_str())
    }
}

/// A single observed sold listing, classified into a bucket and matched to
/// a catalog card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(rename = "collectedAt")]
    pub collected_at: DateTime<Utc>,
    pub source: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "priceEur")]
    pub price_eur: f64,
    #[serde(rename = "cardId")]
    pub card_id: String,
    pub bucket: Bucket,
}

impl Sale {
    /// The composite dedup key `(url, priceEur, cardId, bucket)`. `f64` is
    /// hashed via its bit pattern since sale prices are always finite
    /// (enforced before a `Sale` is constructed).
    pub fn dedup_key(&self) -> (String, u64, String, &'static str) {
        (
            self.url.clone(),
            self.price_eur.to_bits(),
            self.card_id.clone(),
            self.bucket.key(),
        )
    }
}

/// Per-(card, bucket) rolling median aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceAggregate {
    #[serde(rename = "median_eur")]
    pub median_eur: Option<f64>,
    pub n: usize,
}

impl PriceAggregate {
    pub const EMPTY: PriceAggregate = PriceAggregate {
        median_eur: None,
        n: 0,
    };
}
