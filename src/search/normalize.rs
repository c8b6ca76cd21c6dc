// src/search/normalize.rs
//! Query and corpus normalization: diacritic folding, lowercasing,
//! alphanumeric filtering (space and hyphen survive), whitespace collapse.
//! `normalize` is idempotent.

use once_cell::sync::OnceCell;
use regex::Regex;

/// UTF-8 accents folded to their ASCII base letter. The upstream catalog
/// indexes unaccented tokens, so queries must be folded the same way.
const DIACRITICS: &[(char, char)] = &[
    ('é', 'e'),
    ('è', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('à', 'a'),
    ('â', 'a'),
    ('ä', 'a'),
    ('ù', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
    ('î', 'i'),
    ('ï', 'i'),
    ('ô', 'o'),
    ('ö', 'o'),
    ('ç', 'c'),
    ('É', 'e'),
    ('È', 'e'),
    ('Ê', 'e'),
    ('Ë', 'e'),
    ('À', 'a'),
    ('Â', 'a'),
    ('Ä', 'a'),
    ('Ù', 'u'),
    ('Û', 'u'),
    ('Ü', 'u'),
    ('Î', 'i'),
    ('Ï', 'i'),
    ('Ô', 'o'),
    ('Ö', 'o'),
    ('Ç', 'c'),
];

fn fold_diacritic(ch: char) -> char {
    DIACRITICS
        .iter()
        .find(|(accented, _)| *accented == ch)
        .map(|(_, base)| *base)
        .unwrap_or(ch)
}

/// Lowercases, folds accents, drops everything but alphanumerics, spaces
/// and hyphens, then collapses and trims whitespace.
pub fn normalize(text: &str) -> String {
    let mut filtered = String::with_capacity(text.len());
    for ch in text.chars() {
        let ch = fold_diacritic(ch);
        if ch.is_ascii_alphanumeric() || ch == '-' {
            filtered.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() {
            filtered.push(' ');
        }
        // Everything else (punctuation, unmapped non-ASCII) is dropped.
    }

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r" +").expect("whitespace regex"));
    re_ws.replace_all(&filtered, " ").trim().to_string()
}

/// Normalized whitespace-separated tokens of `text`.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_french_diacritics() {
        assert_eq!(normalize("Qualité de l'air"), "qualite de lair");
        assert_eq!(normalize("Santé Publique"), "sante publique");
        assert_eq!(normalize("Énergie éolienne"), "energie eolienne");
    }

    #[test]
    fn keeps_hyphens_and_digits() {
        assert_eq!(normalize("Piste-Cyclable 2024!"), "piste-cyclable 2024");
    }

    #[test]
    fn collapses_and_trims_whitespace() {
        assert_eq!(normalize("  hôpitaux   de\tParis  "), "hopitaux de paris");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "Éducation & Formation",
            "  déchets   ménagers!!  ",
            "plain text",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn tokens_split_on_whitespace() {
        assert_eq!(
            tokens("Pharmacies d'Île-de-France"),
            vec!["pharmacies", "dile-de-france"]
        );
        assert!(tokens("   ").is_empty());
    }
}
