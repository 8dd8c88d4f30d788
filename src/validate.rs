//! Catalog Validator.
//!
//! Asserts minimum size and English-coverage thresholds. Under strict mode
//! a violation is fatal; otherwise it's logged and the caller is expected
//! to retain whatever catalog was already persisted.

use crate::error::PipelineError;
use crate::model::{Card, PrintingLang};
use log::warn;

pub struct ValidationOutcome {
    pub cards: usize,
    pub english: usize,
    pub ok: bool,
}

/// Check catalog size thresholds. Returns `Ok` if the catalog passes, or
/// if it fails under non-strict mode (caller should retain the previous
/// catalog in that case). Returns `Err` only when `strict` is set.
pub fn validate_catalog(
    cards: &[Card],
    min_cards: usize,
    min_english: usize,
    strict: bool,
) -> Result<ValidationOutcome, PipelineError> {
    let total = cards.len();
    let english = cards
        .iter()
        .filter(|c| c.printing_lang == PrintingLang::En)
        .count();

    let ok = total >= min_cards && english >= min_english;

    if !ok {
        if strict {
            return Err(PipelineError::Validation {
                cards: total,
                english,
                min_cards,
                min_english,
            });
        }
        warn!(
            "catalog validation failed ({total} cards, {english} english; need >= {min_cards} / >= {min_english}); retaining previous catalog"
        );
    }

    Ok(ValidationOutcome {
        cards: total,
        english,
        ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(lang: PrintingLang) -> Card {
        Card {
            id: "x".to_string(),
            card_key: "x".to_string(),
            set_id: "x".to_string(),
            set_name: "x".to_string(),
            number: "1".to_string(),
            number_full: None,
            printing_lang: lang,
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
    fn passes_when_thresholds_met() {
        let cards: Vec<_> = (0..10).map(|_| card(PrintingLang::En)).collect();
        let outcome = validate_catalog(&cards, 10, 10, true).unwrap();
        assert!(outcome.ok);
    }

    #[test]
    fn non_strict_failure_does_not_error() {
        let cards: Vec<_> = (0..5).map(|_| card(PrintingLang::En)).collect();
        let outcome = validate_catalog(&cards, 10, 10, false).unwrap();
        assert!(!outcome.ok);
    }

    #[test]
    fn strict_failure_errors() {
        let cards: Vec<_> = (0..5).map(|_| card(PrintingLang::En)).collect();
        let result = validate_catalog(&cards, 10, 10, true);
        assert!(result.is_err());
    }

    #[test]
    fn english_coverage_checked_independently_of_total() {
        let mut cards: Vec<_> = (0..20).map(|_| card(PrintingLang::Ja)).collect();
        cards.extend((0..2).map(|_| card(PrintingLang::En)));
        let outcome = validate_catalog(&cards, 10, 10, false).unwrap();
        assert!(!outcome.ok, "total passes but english coverage doesn't");
    }
}
