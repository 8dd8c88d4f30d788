//! Title -> Card Matcher.
//!
//! Reconciles a noisy marketplace title against the catalog using the
//! signals extracted by the Title Parser. Two passes — strict, then loose
//! — are tried when a local card number was found; name-only matching
//! applies otherwise. This module only reads `Card`s; it never mutates the
//! catalog.

use crate::model::Card;
use crate::normalize::{normalize, normalized_contains};
use crate::title_parser::{detect_language, extract_local_id, extract_set_code, is_likely_lot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    NameOnly,
    Strict,
    Loose,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub card_id: Option<String>,
    pub confidence: f64,
    pub mode: MatchMode,
}

impl MatchOutcome {
    fn none() -> Self {
        MatchOutcome {
            card_id: None,
            confidence: 0.0,
            mode: MatchMode::None,
        }
    }

    pub fn is_acceptable(&self, threshold: f64) -> bool {
        self.card_id.is_some() && self.confidence >= threshold
    }
}

/// Default acceptance threshold below which a match is too weak to trust.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.72;

pub fn match_title(title: &str, catalog: &[Card]) -> MatchOutcome {
    if is_likely_lot(title) {
        return MatchOutcome::none();
    }

    let language = detect_language(title);
    let set_code = extract_set_code(title);
    let local_id = extract_local_id(title);

    match local_id {
        None => name_only_match(title, catalog, language, set_code.as_deref()),
        Some(local_id) => {
            let strict = strict_match(title, catalog, language, set_code.as_deref(), &local_id);
            if strict.card_id.is_some() {
                strict
            } else {
                loose_match(title, catalog, language, set_code.as_deref(), &local_id)
            }
        }
    }
}

fn language_ok(detected: Option<&str>, card: &Card) -> bool {
    match detected {
        Some(lang) => lang == card.printing_lang.as_str(),
        None => true,
    }
}

fn title_contains_name(title: &str, card: &Card) -> bool {
    normalized_contains(title, &card.name)
        || card
            .name_en
            .as_deref()
            .is_some_and(|n| normalized_contains(title, n))
}

fn pick_best<'a>(
    candidates: Vec<(&'a Card, f64)>,
    mode: MatchMode,
) -> MatchOutcome {
    let best = candidates.into_iter().max_by(|a, b| {
        let score_cmp = a.1.partial_cmp(&b.1).unwrap();
        if score_cmp != std::cmp::Ordering::Equal {
            return score_cmp;
        }
        // Tie-break toward candidates with a non-empty image.
        let a_has_image = a.0.image_large.as_deref().is_some_and(|s| !s.is_empty());
        let b_has_image = b.0.image_large.as_deref().is_some_and(|s| !s.is_empty());
        a_has_image.cmp(&b_has_image)
    });

    match best {
        Some((card, confidence)) => MatchOutcome {
            card_id: Some(card.id.clone()),
            confidence,
            mode,
        },
        None => MatchOutcome::none(),
    }
}

fn name_only_match(
    title: &str,
    catalog: &[Card],
    language: Option<&str>,
    set_code: Option<&str>,
) -> MatchOutcome {
    let candidates: Vec<(&Card, f64)> = catalog
        .iter()
        .filter(|card| language_ok(language, card))
        .filter(|card| match set_code {
            Some(code) => normalize(&card.set_id) == normalize(code),
            None => true,
        })
        .filter(|card| title_contains_name(title, card))
        .map(|card| {
            let mut confidence: f64 = 0.72;
            if set_code.is_some() {
                confidence += 0.05;
            }
            if language.is_some() {
                confidence += 0.03;
            }
            (card, confidence.min(0.82))
        })
        .collect();

    pick_best(candidates, MatchMode::NameOnly)
}

fn strict_match(
    title: &str,
    catalog: &[Card],
    language: Option<&str>,
    set_code: Option<&str>,
    local_id: &str,
) -> MatchOutcome {
    let candidates: Vec<(&Card, f64)> = catalog
        .iter()
        .filter(|card| language_ok(language, card))
        .filter(|card| match set_code {
            Some(code) => normalize(&card.set_id) == normalize(code),
            None => false, // strict pass requires an extracted set code to anchor on
        })
        .filter(|card| normalize(&card.number) == normalize(local_id))
        .filter(|card| title_contains_name(title, card))
        .map(|card| {
            let mut confidence: f64 = 0.86;
            if language.is_some() {
                confidence += 0.04;
            }
            (card, confidence.min(1.0))
        })
        .collect();

    pick_best(candidates, MatchMode::Strict)
}

fn loose_match(
    title: &str,
    catalog: &[Card],
    language: Option<&str>,
    set_code: Option<&str>,
    local_id: &str,
) -> MatchOutcome {
    let family_prefix = set_code.and_then(|code| code.get(0..2)).map(str::to_string);

    let candidates: Vec<(&Card, f64)> = catalog
        .iter()
        .filter(|card| language_ok(language, card))
        .filter(|card| normalize(&card.number) == normalize(local_id))
        .filter(|card| title_contains_name(title, card))
        .map(|card| {
            let mut confidence: f64 = 0.80;
            if language.is_some() {
                confidence += 0.05;
            }
            let family_match = family_prefix
                .as_deref()
                .is_some_and(|prefix| normalize(&card.set_id).starts_with(prefix));
            (card, confidence.min(0.90), family_match)
        })
        .collect::<Vec<_>>()
        .into_iter()
        // Family tie-break: prefer family matches, fall back to all survivors.
        .fold((Vec::new(), Vec::new()), |(mut family, mut rest), (card, score, is_family)| {
            if is_family {
                family.push((card, score));
            } else {
                rest.push((card, score));
            }
            (family, rest)
        });

    let (family_candidates, rest_candidates) = candidates;
    let pool = if !family_candidates.is_empty() {
        family_candidates
    } else {
        rest_candidates
    };

    pick_best(pool, MatchMode::Loose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrintingLang;

    fn card(
        id: &str,
        set_id: &str,
        number: &str,
        lang: PrintingLang,
        name: &str,
        name_en: Option<&str>,
    ) -> Card {
        Card {
            id: id.to_string(),
            card_key: Card::make_card_key(set_id, number, lang),
            set_id: set_id.to_string(),
            set_name: set_id.to_string(),
            number: number.to_string(),
            number_full: None,
            printing_lang: lang,
            name: name.to_string(),
            name_en: name_en.map(str::to_string),
            name_ja: None,
            pokemon_key: None,
            rarity: None,
            features: vec![],
            image_large: None,
        }
    }

    #[test]
    fn e1_strict_match_japanese_printing() {
        let catalog = vec![card(
            "sv9a-181-pikachu-ja",
            "sv9a",
            "181",
            PrintingLang::Ja,
            "ピカチュウV",
            Some("Pikachu V"),
        )];
        let outcome = match_title("Pikachu V 181/165 SV9A JAP GRAAD 9.5", &catalog);
        assert_eq!(outcome.card_id, Some("sv9a-181-pikachu-ja".to_string()));
        assert!(outcome.confidence >= DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(outcome.mode, MatchMode::Strict);
    }

    #[test]
    fn e2_strict_match_english_printing() {
        let catalog = vec![card(
            "sv2a-006-charizard-en",
            "sv2a",
            "006",
            PrintingLang::En,
            "Charizard ex",
            Some("Charizard ex"),
        )];
        let outcome = match_title("Charizard ex 006/165 SV2A ENG 29,90 €", &catalog);
        assert_eq!(outcome.card_id, Some("sv2a-006-charizard-en".to_string()));
        assert!(outcome.confidence >= DEFAULT_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn e3_lot_is_never_matched() {
        let catalog = vec![card(
            "any-1-x-en",
            "any",
            "1",
            PrintingLang::En,
            "Pokemon",
            Some("Pokemon"),
        )];
        let outcome = match_title("Lot 50 Pokemon Cards Random GRAAD 8", &catalog);
        assert_eq!(outcome.card_id, None);
        assert_eq!(outcome.confidence, 0.0);
    }

    #[test]
    fn e4_matches_via_name_en_containment_on_japanese_display_name() {
        let catalog = vec![card(
            "xyz-022-meloetta-ja",
            "xyz",
            "022",
            PrintingLang::Ja,
            "メロエッタ",
            Some("Meloetta"),
        )];
        let outcome = match_title("Meloetta 022/021 JAP", &catalog);
        assert_eq!(outcome.card_id, Some("xyz-022-meloetta-ja".to_string()));
    }

    #[test]
    fn e5_loose_match_without_set_code_requirement() {
        // No language hint, and the set code in the title doesn't match the
        // catalog's set id, so only the loose pass can succeed.
        let catalog = vec![card(
            "sv3-025-mew-en",
            "sv3",
            "025",
            PrintingLang::En,
            "Mew",
            Some("Mew"),
        )];
        let outcome = match_title("Mew 025 SV3.5 GRAAD 10", &catalog);
        assert_eq!(outcome.card_id, Some("sv3-025-mew-en".to_string()));
        assert!(outcome.confidence >= DEFAULT_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn matcher_never_disagrees_with_explicit_title_language() {
        let catalog = vec![
            card("a-1-x-en", "a", "1", PrintingLang::En, "Foo", Some("Foo")),
            card("a-1-x-ja", "a", "1", PrintingLang::Ja, "Foo", Some("Foo")),
        ];
        let outcome = match_title("Foo 1/10 A JAP", &catalog);
        assert_eq!(outcome.card_id, Some("a-1-x-ja".to_string()));
    }

    #[test]
    fn name_only_mode_when_no_local_id() {
        let catalog = vec![card(
            "a-1-charizard-en",
            "a",
            "1",
            PrintingLang::En,
            "Charizard",
            Some("Charizard"),
        )];
        let outcome = match_title("Charizard holo near mint", &catalog);
        assert_eq!(outcome.card_id, Some("a-1-charizard-en".to_string()));
        assert_eq!(outcome.mode, MatchMode::NameOnly);
        assert!(outcome.confidence <= 0.82);
    }
}
