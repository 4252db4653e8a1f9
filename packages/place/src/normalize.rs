//! Match-key normalization for place names.
//!
//! Applied symmetrically to user input and to every candidate name so that
//! "Lábrea", "labrea" and "LABREA" compare equal.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalizes a place name into its comparison key.
///
/// The pipeline:
/// 1. Canonical decomposition (NFD)
/// 2. Drop combining marks (accents, cedillas, tildes)
/// 3. Lowercase
/// 4. Collapse whitespace and trim
#[must_use]
pub fn match_key(input: &str) -> String {
    let stripped: String = input.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_diacritics_and_case() {
        assert_eq!(match_key("Lábrea"), "labrea");
        assert_eq!(match_key("LABREA"), "labrea");
        assert_eq!(match_key("São Félix do Xingu"), "sao felix do xingu");
    }

    #[test]
    fn strips_cedilla() {
        assert_eq!(match_key("Conceição do Araguaia"), "conceicao do araguaia");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(match_key("  Porto   Velho \t"), "porto velho");
    }

    #[test]
    fn empty_input_yields_empty_key() {
        assert_eq!(match_key("   "), "");
    }
}
