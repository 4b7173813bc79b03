//! Input normalization - stage one of the pipeline
//!
//! Trims the line, collapses whitespace runs (tabs included) to single
//! spaces, and records where registered verb words reappear after the
//! first token. Case is preserved throughout: verb matching lowercases on
//! comparison only, and titles keep the user's spelling.

use crate::tables::RuleTables;

/// Normalized input plus boundary hints
///
/// A boundary hint is the byte offset of a verb word that reappears
/// after position zero ("add milk and delete 3"). Hints are diagnostic
/// only: multi-task utterances are never split, the remainder flows into
/// the description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub boundary_hints: Vec<usize>,
}

/// Normalize one raw input line. Never fails; empty input stays empty.
pub fn normalize(input: &str, tables: &RuleTables) -> Normalized {
    let mut text = String::with_capacity(input.len());
    let mut boundary_hints = Vec::new();

    for (i, word) in input.split_whitespace().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        let offset = text.len();
        text.push_str(word);

        if i > 0 && tables.is_verb_term(&core_word(word)) {
            boundary_hints.push(offset);
        }
    }

    Normalized {
        text,
        boundary_hints,
    }
}

/// Lowercased word with surrounding punctuation, quotes, and brackets
/// removed, the form used for table comparisons
///
/// Quote and bracket characters trim so raw-text cue scans still see a
/// word glued to a quote or tag edge. Interior characters stay: don't
/// and a<b survive intact.
pub(crate) fn core_word(word: &str) -> String {
    word.trim_matches(|c: char| {
        matches!(
            c,
            '.' | ','
                | '!'
                | '?'
                | ';'
                | ':'
                | '"'
                | '\''
                | '`'
                | '('
                | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '<'
                | '>'
        )
    })
    .to_lowercase()
}
