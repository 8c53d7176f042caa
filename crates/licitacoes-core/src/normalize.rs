//! Text canonicalization for case-, accent- and whitespace-insensitive matching.
//!
//! Every comparison in the engine (search terms against record fields, status
//! text against the classifier vocabularies, table search) goes through
//! [`normalize`], so "São Paulo " and "SAO PAULO" compare equal.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonicalize a string for comparison.
///
/// Uppercases, applies canonical decomposition (NFD), drops combining marks,
/// and trims surrounding whitespace. Absent or empty input yields an empty
/// string.
///
/// Uppercasing happens before decomposition so that case mappings which
/// produce precomposed letters are stripped as well, keeping the function
/// idempotent.
pub fn normalize(s: Option<&str>) -> String {
    let Some(s) = s else {
        return String::new();
    };
    if s.is_empty() {
        return String::new();
    }

    let folded: String = s
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.trim().to_string()
}

/// Shorthand for normalizing a present string.
pub fn normalize_str(s: &str) -> String {
    normalize(Some(s))
}
