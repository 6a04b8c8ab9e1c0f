//! Canonical topic mapping.
//!
//! Variants of the same story topic arrive as overlapping phrases
//! ("trade war", "us china trade war"). Every phrase that occurs literally
//! inside another candidate is mapped onto the containing phrase, so the
//! broadest available form names the topic. When several candidates contain
//! the same phrase, the last one encountered in input order wins; callers
//! must not rely on which one beyond "some containing phrase is chosen".

use rustc_hash::{FxHashMap, FxHashSet};

/// Mapping from every candidate phrase to its canonical topic form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalMap {
    phrases: Vec<String>,
    forward: FxHashMap<String, String>,
    topics: Vec<String>,
}

impl CanonicalMap {
    #[must_use]
    pub fn build(candidates: &[String]) -> Self {
        let mut phrases = Vec::with_capacity(candidates.len());
        let mut distinct = FxHashSet::default();
        for phrase in candidates {
            if distinct.insert(phrase.clone()) {
                phrases.push(phrase.clone());
            }
        }

        let mut forward: FxHashMap<String, String> = FxHashMap::default();
        for phrase in &phrases {
            let mut canonical = phrase.as_str();
            for other in &phrases {
                if other != phrase && other.contains(phrase.as_str()) {
                    canonical = other.as_str();
                }
            }
            forward.insert(phrase.clone(), canonical.to_string());
        }

        // Collapse containment chains (a ⊂ b ⊂ c may leave a → b → c after
        // the scan above). Chains strictly grow in length, so this
        // terminates, and afterwards every canonical form is a fixed point.
        for phrase in &phrases {
            let mut canonical = forward[phrase].clone();
            loop {
                match forward.get(&canonical) {
                    Some(next) if *next != canonical => canonical = next.clone(),
                    _ => break,
                }
            }
            forward.insert(phrase.clone(), canonical);
        }

        let mut topics = Vec::new();
        let mut seen = FxHashSet::default();
        for phrase in &phrases {
            let canonical = &forward[phrase];
            if seen.insert(canonical.clone()) {
                topics.push(canonical.clone());
            }
        }

        Self {
            phrases,
            forward,
            topics,
        }
    }

    /// Canonical form of a phrase; phrases never seen resolve to themselves.
    #[must_use]
    pub fn resolve<'a>(&'a self, phrase: &'a str) -> &'a str {
        self.forward.get(phrase).map_or(phrase, String::as_str)
    }

    /// Distinct candidate phrases in input order.
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Distinct canonical topics in first-appearance order.
    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn substring_maps_to_containing_phrase() {
        let map = CanonicalMap::build(&strings(&["trade war", "trade war markets"]));

        assert_eq!(map.resolve("trade war"), "trade war markets");
        assert_eq!(map.resolve("trade war markets"), "trade war markets");
        assert_eq!(map.topics(), ["trade war markets"].as_slice());
    }

    #[test]
    fn phrase_without_superstring_maps_to_itself() {
        let map = CanonicalMap::build(&strings(&["local weather", "trade war"]));

        assert_eq!(map.resolve("local weather"), "local weather");
        assert_eq!(map.resolve("trade war"), "trade war");
    }

    #[test]
    fn unknown_phrase_resolves_to_itself() {
        let map = CanonicalMap::build(&strings(&["trade war"]));

        assert_eq!(map.resolve("unrelated phrase"), "unrelated phrase");
    }

    #[test]
    fn containment_chain_collapses_to_broadest_phrase() {
        let map = CanonicalMap::build(&strings(&[
            "us china trade war",
            "trade war",
            "china trade war",
        ]));

        assert_eq!(map.resolve("trade war"), "us china trade war");
        assert_eq!(map.resolve("china trade war"), "us china trade war");
        assert_eq!(map.topics(), ["us china trade war"].as_slice());
    }

    #[test]
    fn canonical_forms_are_fixed_points() {
        let candidates = strings(&[
            "trade war",
            "us china trade war",
            "china trade war",
            "interest rates",
            "central bank interest rates",
        ]);
        let map = CanonicalMap::build(&candidates);

        for phrase in map.phrases() {
            let once = map.resolve(phrase);
            assert_eq!(map.resolve(once), once, "{phrase} did not reach a fixed point");
        }
    }

    #[test]
    fn ambiguous_containment_picks_some_containing_phrase() {
        // Both candidates contain "trade war"; the winner is an iteration-
        // order artifact, so only membership is pinned here.
        let map = CanonicalMap::build(&strings(&[
            "trade war",
            "us trade war tariffs",
            "eu trade war talks",
        ]));

        let canonical = map.resolve("trade war");
        assert!(canonical == "us trade war tariffs" || canonical == "eu trade war talks");
    }

    #[test]
    fn duplicate_candidates_collapse() {
        let map = CanonicalMap::build(&strings(&["trade war", "trade war"]));

        assert_eq!(map.phrases().len(), 1);
        assert_eq!(map.resolve("trade war"), "trade war");
    }

    #[test]
    fn empty_candidates_build_empty_map() {
        let map = CanonicalMap::build(&[]);

        assert!(map.is_empty());
        assert!(map.topics().is_empty());
    }
}
