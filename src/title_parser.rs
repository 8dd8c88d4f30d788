//! Title Parser.
//!
//! Pure functions over a raw marketplace title (and, where noted, its
//! normalized form). Every regex used here is compiled once via
//! `once_cell::sync::Lazy`, and the module carries no state beyond those
//! statics so it is directly unit-testable without any fetcher or cache in
//! scope.

use crate::model::Bucket;
use crate::normalize::{normalize, normalize_query};
use once_cell::sync::Lazy;
use regex::Regex;

/// Outcome of [`detect_grading_bucket`]: either one of the six canonical
/// buckets, or "graad token present but no recognizable grade" — the
/// latter is never persisted but must still be distinguished from "not a
/// graded listing at all" (`None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedBucket {
    Known(Bucket),
    Unknown,
}

static LOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blot\b|\bbundle\b|\bplayset\b|\bchoose\b|\bseleziona\b|\b\d+\s*(cards|carte)\b")
        .unwrap()
});

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+,\d{1,2}|\d+)\s*(€|eur)").unwrap());

static SET_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(sv\d{1,2}[a-z]?|m[a-z]{1,3})\b").unwrap());

static SLASH_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,3})/\d{1,3}\b").unwrap());

static SERIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{1,4}\d{1,4}\b").unwrap());

static GRAAD_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)graad\s*\d{1,2}(?:[.,]5)?").unwrap());

static HASH_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b#?\s*(\d{2,3})\b").unwrap());

static GRAAD_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bgraad\b").unwrap());

static GRAAD_GRADE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)graad\s*(\d{1,2})(?:[.,](5))?").unwrap());

/// True if the title describes a lot/bundle rather than a single card.
pub fn is_likely_lot(title: &str) -> bool {
    LOT_RE.is_match(&normalize(title))
}

/// Extract a EUR price from free text. Returns `None` if no price-shaped
/// substring is found or the parsed value is non-finite.
pub fn parse_eur_price(text: &str) -> Option<f64> {
    let stripped = text.replace('.', "");
    let caps = PRICE_RE.captures(&stripped)?;
    let raw = caps.get(1)?.as_str().replace(',', ".");
    let value: f64 = raw.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Detect an explicit language hint in a title via the alias rewrite from
/// the Text Normalizer's second pass.
pub fn detect_language(title: &str) -> Option<&'static str> {
    let padded = format!(" {} ", normalize_query(title));
    if padded.contains(" ja ") {
        Some("ja")
    } else if padded.contains(" en ") {
        Some("en")
    } else {
        None
    }
}

/// First set-code-shaped token, e.g. `sv9a` or `mew` (the `m[a-z]{1,3}`
/// promo-set form).
pub fn extract_set_code(title: &str) -> Option<String> {
    SET_CODE_RE
        .find(title)
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Extract the local card number by trying, in order: a `NNN/MMM` slash
/// fraction, a bare serial-looking token, and a two-or-three digit number
/// with any `graad N[.5]` grading phrase stripped out first. Operates on
/// the raw, un-normalized title.
pub fn extract_local_id(raw: &str) -> Option<String> {
    // Mask out whatever the set-code scan would find so a set code like
    // "SV3" can't be mistaken for a serial-shaped card number downstream.
    let masked = mask_all_matches(raw, &SET_CODE_RE);

    if let Some(caps) = SLASH_NUMBER_RE.captures(&masked) {
        return Some(caps.get(1).unwrap().as_str().to_string());
    }

    if let Some(m) = SERIAL_RE.find(&masked) {
        return Some(m.as_str().to_string());
    }

    let destroyed_graad = GRAAD_STRIP_RE.replace_all(&masked, " ");
    HASH_NUMBER_RE
        .captures(&destroyed_graad)
        .map(|caps| caps.get(1).unwrap().as_str().to_string())
}

fn mask_all_matches(text: &str, re: &Regex) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        out.push_str(&" ".repeat(m.len()));
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Classify a grading token, if any. `None` means the title carries no
/// `graad` token at all (it's a raw/ungraded listing or not a grading
/// claim); `Some(Unknown)` means a `graad` token was present but no
/// recognizable grade followed it.
pub fn detect_grading_bucket(title: &str) -> Option<DetectedBucket> {
    if !GRAAD_TOKEN_RE.is_match(title) {
        return None;
    }

    let Some(caps) = GRAAD_GRADE_RE.captures(title) else {
        return Some(DetectedBucket::Unknown);
    };

    let whole: u32 = caps.get(1).unwrap().as_str().parse().ok()?;
    let has_half = caps.get(2).is_some();

    let bucket = match (whole, has_half) {
        (7, false) => DetectedBucket::Known(Bucket::Graad7),
        (7, true) => DetectedBucket::Known(Bucket::Graad7), // (7,8) rounds down
        (8, false) => DetectedBucket::Known(Bucket::Graad8),
        (8, true) => DetectedBucket::Known(Bucket::Graad8), // (8,9) rounds down
        (9, false) => DetectedBucket::Known(Bucket::Graad9),
        (9, true) => DetectedBucket::Known(Bucket::Graad9_5), // exact 9.5 hit
        (10, false) => DetectedBucket::Known(Bucket::Graad10),
        _ => DetectedBucket::Unknown,
    };

    Some(bucket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_detection() {
        assert!(is_likely_lot("Lot 50 Pokemon Cards Random GRAAD 8"));
        assert!(is_likely_lot("Bundle of 10 cards"));
        assert!(is_likely_lot("Playset of 4x Pikachu"));
        assert!(is_likely_lot("Choose your card from list"));
        assert!(is_likely_lot("Seleziona la carta che vuoi"));
        assert!(is_likely_lot("5 cards mixed"));
        assert!(!is_likely_lot("Pikachu V 181/165 SV9A"));
    }

    #[test]
    fn eur_price_parsing() {
        assert_eq!(parse_eur_price("Charizard ex 29,90 €"), Some(29.90));
        assert_eq!(parse_eur_price("price: 1.234,56 EUR"), Some(1234.56));
        assert_eq!(parse_eur_price("100 eur"), Some(100.0));
        assert_eq!(parse_eur_price("no price here"), None);
    }

    #[test]
    fn language_detection() {
        assert_eq!(detect_language("Pikachu V 181/165 SV9A JAP"), Some("ja"));
        assert_eq!(detect_language("Charizard ex ENG"), Some("en"));
        assert_eq!(detect_language("Charizard ex"), None);
    }

    #[test]
    fn set_code_extraction() {
        assert_eq!(extract_set_code("Pikachu SV9A JAP"), Some("sv9a".to_string()));
        assert_eq!(extract_set_code("Meloetta MEW GRAAD 10"), Some("mew".to_string()));
    }

    #[test]
    fn local_id_extraction_e1() {
        assert_eq!(
            extract_local_id("Pikachu V 181/165 SV9A JAP GRAAD 9.5"),
            Some("181".to_string())
        );
    }

    #[test]
    fn local_id_extraction_e2() {
        assert_eq!(
            extract_local_id("Charizard ex 006/165 SV2A ENG 29,90 €"),
            Some("006".to_string())
        );
    }

    #[test]
    fn local_id_extraction_e4() {
        assert_eq!(
            extract_local_id("Meloetta 022/021 JAP"),
            Some("022".to_string())
        );
    }

    #[test]
    fn local_id_extraction_e5_does_not_pick_up_grade() {
        assert_eq!(
            extract_local_id("Mew 025 SV3.5 GRAAD 10"),
            Some("025".to_string())
        );
    }

    #[test]
    fn local_id_ignores_grade_when_no_card_number_present() {
        assert_eq!(extract_local_id("pokemon graad 9.5 charizard"), None);
    }

    #[test]
    fn grading_bucket_e1() {
        assert_eq!(
            detect_grading_bucket("Pikachu V 181/165 SV9A JAP GRAAD 9.5"),
            Some(DetectedBucket::Known(Bucket::Graad9_5))
        );
    }

    #[test]
    fn grading_bucket_e5() {
        assert_eq!(
            detect_grading_bucket("Mew 025 SV3.5 GRAAD 10"),
            Some(DetectedBucket::Known(Bucket::Graad10))
        );
    }

    #[test]
    fn grading_bucket_absent_means_raw() {
        assert_eq!(detect_grading_bucket("Charizard ex 006/165 SV2A ENG"), None);
    }

    #[test]
    fn grading_bucket_unknown_for_unrecognized_grade() {
        assert_eq!(
            detect_grading_bucket("Charizard GRAAD 3"),
            Some(DetectedBucket::Unknown)
        );
        assert_eq!(
            detect_grading_bucket("Charizard GRAAD"),
            Some(DetectedBucket::Unknown)
        );
    }

    #[test]
    fn grading_bucket_monotone_in_grade() {
        // Grade buckets are monotone: a higher grade never sorts below a lower one.
        let ten = detect_grading_bucket("card GRAAD 10").unwrap();
        let nine_five = detect_grading_bucket("card GRAAD 9.5").unwrap();
        let nine = detect_grading_bucket("card GRAAD 9").unwrap();
        let eight = detect_grading_bucket("card GRAAD 8").unwrap();
        let seven = detect_grading_bucket("card GRAAD 7").unwrap();

        let rank = |b: DetectedBucket| match b {
            DetectedBucket::Known(Bucket::Raw) => 0,
            DetectedBucket::Known(Bucket::Graad7) => 1,
            DetectedBucket::Known(Bucket::Graad8) => 2,
            DetectedBucket::Known(Bucket::Graad9) => 3,
            DetectedBucket::Known(Bucket::Graad9_5) => 4,
            DetectedBucket::Known(Bucket::Graad10) => 5,
            DetectedBucket::Unknown => -1,
        };

        assert!(rank(ten) >= rank(nine_five));
        assert!(rank(nine_five) >= rank(nine));
        assert!(rank(nine) >= rank(eight));
        assert!(rank(eight) >= rank(seven));
    }
}
