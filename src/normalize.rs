//! Text Normalizer.
//!
//! The matching substrate for the whole pipeline: cache keys, card names,
//! and marketplace titles are all compared through [`normalize`]. Keep this
//! module pure and dependency-free beyond `unicode-normalization` so it can
//! be unit tested in isolation and reused from the Title Parser and Matcher
//! without pulling in HTTP or cache concerns.

use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics, collapse whitespace, trim.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    let lowered = s.to_lowercase();
    let decomposed: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();

    collapse_whitespace(&decomposed)
}

/// Second pass used for user-supplied marketplace queries: rewrites
/// language aliases to their short form before re-collapsing whitespace.
pub fn normalize_query(s: &str) -> String {
    let base = normalize(s);
    let padded = format!(" {} ", base);

    let rewritten = replace_language_aliases(&padded);

    collapse_whitespace(&rewritten)
}

const JAPANESE_ALIASES: &[&str] = &["jap", "jpn", "jp", "giapponese"];
const ENGLISH_ALIASES: &[&str] = &["eng", "en", "english", "inglese"];

fn replace_language_aliases(padded: &str) -> String {
    let mut out = padded.to_string();
    for alias in JAPANESE_ALIASES {
        let needle = format!(" {} ", alias);
        out = out.replace(&needle, " ja ");
    }
    for alias in ENGLISH_ALIASES {
        let needle = format!(" {} ", alias);
        out = out.replace(&needle, " en ");
    }
    out
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF)
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_space = false;

    for c in s.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    result
}

/// True if `normalize(haystack)` contains `normalize(needle)` as a substring.
/// Used throughout the Matcher in place of fuzzy matching (deliberately out
/// of scope per the Non-goals).
pub fn normalized_contains(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    normalize(haystack).contains(&normalize(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let samples = [
            "Pokémon",
            "  Charizard   ex  ",
            "ポケモン",
            "",
            "Café-au-Lait",
        ];
        for s in samples {
            let once = normalize(s);
            let twice = normalize(&once);
            assert_eq!(once, twice, "normalize not idempotent for {s:?}");
        }
    }

    #[test]
    fn lowercases_and_strips_diacritics() {
        assert_eq!(normalize("Pokémon"), "pokemon");
        assert_eq!(normalize("CHARIZARD"), "charizard");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  a   b\t\nc  "), "a b c");
    }

    #[test]
    fn empty_and_null_like_input() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn rewrites_language_aliases() {
        assert_eq!(normalize_query("charizard jpn graad 9"), "charizard ja graad 9");
        assert_eq!(normalize_query("pikachu eng"), "pikachu en");
        assert_eq!(normalize_query("pikachu english"), "pikachu en");
    }

    #[test]
    fn normalized_contains_basic() {
        assert!(normalized_contains("Pikachu V 181/165 SV9A", "pikachu"));
        assert!(!normalized_contains("Pikachu V", "charizard"));
        assert!(!normalized_contains("anything", ""));
    }
}
