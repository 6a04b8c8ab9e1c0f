//! Text cleanup helpers for phrase matching.

use std::sync::LazyLock;

use regex::Regex;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\sa-zA-Z0-9]").expect("valid character-class pattern"));

static UNDERSCORE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("valid underscore pattern"));

/// Strip every character outside whitespace and ASCII alphanumerics, then
/// lowercase and trim. Matching downstream is literal substring containment
/// on this cleaned form; whitespace runs are deliberately left untouched.
#[must_use]
pub(crate) fn clean_for_matching(text: &str) -> String {
    NON_ALNUM
        .replace_all(text, "")
        .to_lowercase()
        .trim()
        .to_string()
}

/// Rewrite underscore runs to a single space (extractor phrases arrive
/// underscore-joined).
#[must_use]
pub(crate) fn squash_underscores(phrase: &str) -> String {
    UNDERSCORE_RUN.replace_all(phrase, " ").into_owned()
}
