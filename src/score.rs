//! Confidence scoring - stage six of the pipeline
//!
//! Scores are assigned from fixed lookup bands, never computed from text
//! statistics: match tier picks the band, the count of filled optional
//! slots picks the position inside it. The same input always lands on
//! the same score, and no score ever crosses into a neighboring band.

use crate::types::MatchStrength;

/// Exact verb match band, indexed by filled optional slots (0..=3)
pub const EXACT_BAND: [u8; 4] = [90, 93, 97, 100];
/// Synonym match band
pub const SYNONYM_BAND: [u8; 4] = [75, 80, 85, 89];
/// Conversational capture band
pub const CAPTURE_BAND: [u8; 4] = [70, 75, 80, 85];
/// Partial (prefix) match band; resolved partials still read as tentative
pub const PARTIAL_BAND: [u8; 4] = [45, 50, 55, 59];

/// Selection of a listed item by index
pub const SELECT_CONFIDENCE: u8 = 45;
/// Clarification issued over competing synonym matches
pub const CLARIFY_SYNONYM: u8 = 40;
/// Clarification issued over competing prefix completions
pub const CLARIFY_PARTIAL: u8 = 35;
/// Nothing matched at all
pub const NO_MATCH: u8 = 0;

/// Score a resolved command from its match tier and slot fill count
pub fn command_confidence(strength: MatchStrength, filled: usize) -> u8 {
    let band = match strength {
        MatchStrength::Exact => &EXACT_BAND,
        MatchStrength::Synonym => &SYNONYM_BAND,
        MatchStrength::Partial => &PARTIAL_BAND,
        MatchStrength::None => return NO_MATCH,
    };
    band[filled.min(band.len() - 1)]
}

/// Score a conversational capture from its slot fill count
pub fn capture_confidence(filled: usize) -> u8 {
    CAPTURE_BAND[filled.min(CAPTURE_BAND.len() - 1)]
}

/// Score a clarification from the tier the tie occurred in
pub fn clarification_confidence(strength: MatchStrength) -> u8 {
    match strength {
        MatchStrength::Partial => CLARIFY_PARTIAL,
        _ => CLARIFY_SYNONYM,
    }
}
