//! Intent classification - stage three of the pipeline
//!
//! Deterministic tiered matching of the verb token against the injected
//! rule tables. Exact canonical verbs beat synonyms, synonyms beat unique
//! prefix completions; the first tier with at least one candidate wins.
//! There is no fuzzy scoring: candidates tied at the same tier are handed
//! to the resolver as ambiguity, never ranked apart silently.

use crate::tables::RuleTables;
use crate::types::{IntentCandidate, MatchStrength};

/// Prefix completion applies to tokens of this length range
pub const PARTIAL_MIN_LEN: usize = 2;
pub const PARTIAL_MAX_LEN: usize = 4;

/// Classify the verb token into candidates, one per matching table entry
///
/// An empty result means no tier matched; the resolver then decides
/// between conversational capture and an unknown-command rejection.
pub fn classify(verb: &str, tables: &RuleTables) -> Vec<IntentCandidate> {
    let needle = verb.to_lowercase();

    let exact: Vec<IntentCandidate> = tables
        .verbs
        .iter()
        .filter(|entry| entry.canonical == needle)
        .map(|entry| IntentCandidate {
            intent: entry.intent,
            verb: entry.canonical.clone(),
            matched_synonym: entry.canonical.clone(),
            strength: MatchStrength::Exact,
        })
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let synonyms: Vec<IntentCandidate> = tables
        .verbs
        .iter()
        .filter_map(|entry| {
            entry.synonyms.iter().find(|s| **s == needle).map(|s| IntentCandidate {
                intent: entry.intent,
                verb: entry.canonical.clone(),
                matched_synonym: s.clone(),
                strength: MatchStrength::Synonym,
            })
        })
        .collect();
    if !synonyms.is_empty() {
        return synonyms;
    }

    let len = needle.chars().count();
    if (PARTIAL_MIN_LEN..=PARTIAL_MAX_LEN).contains(&len) {
        // One candidate per intent, first entry in table order wins; the
        // completion term is the canonical verb when it matches, else the
        // first completing synonym. Completions that stay within a single
        // intent are unique, ambiguity needs two intents.
        let mut partials: Vec<IntentCandidate> = Vec::new();
        for entry in &tables.verbs {
            if partials.iter().any(|c| c.intent == entry.intent) {
                continue;
            }
            let completed = if entry.canonical.starts_with(&needle) {
                Some(entry.canonical.clone())
            } else {
                entry.synonyms.iter().find(|s| s.starts_with(&needle)).cloned()
            };
            if let Some(matched) = completed {
                partials.push(IntentCandidate {
                    intent: entry.intent,
                    verb: entry.canonical.clone(),
                    matched_synonym: matched,
                    strength: MatchStrength::Partial,
                });
            }
        }
        return partials;
    }

    Vec::new()
}
