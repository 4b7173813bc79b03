//! Canonicalization - stage seven of the pipeline
//!
//! Builds the final task payload through a fixed rule order: politeness
//! prefixes and verb noise come off the front, the first temporal cue or
//! conjunction ends the title clause, priority indicator words are lifted
//! out of the title, first letters are capitalized. The description keeps
//! leftover clauses verbatim, temporal text included; nothing is ever
//! parsed into a date. Pure and total: identical input, identical output.

use crate::entities::{normalize_tag, EntitySet};
use crate::normalize::core_word;
use crate::tables::{CueIndex, RuleTables};
use crate::types::{NormalizedTask, Priority, RejectKind, Rejection, Token, TokenKind};

/// Fixed note appended to the description when both priority tiers are
/// indicated in one input
pub const PRIORITY_CONFLICT_NOTE: &str = "Conflicting priority cues: high wins.";

/// Canonicalize a conversational utterance into a task
///
/// Fails only when stripping leaves no actionable text ("please" alone
/// survives tokenization but captures nothing).
pub fn capture_task(
    raw: &str,
    tokens: &[Token],
    tables: &RuleTables,
    cues: &CueIndex,
) -> Result<NormalizedTask, Rejection> {
    let mut words: Vec<String> = tokens
        .iter()
        .filter(|t| {
            matches!(
                t.kind,
                TokenKind::Verb
                    | TokenKind::Word
                    | TokenKind::Number
                    | TokenKind::QuotedLiteral
                    | TokenKind::Identifier
            )
        })
        .map(|t| t.text.clone())
        .collect();

    strip_politeness(&mut words, tables);
    strip_leading_verb(&mut words, tables);

    let (mut title_words, desc_words) = split_clause(&words, tables);
    strip_priority_words(&mut title_words, tables);
    strip_leading_article(&mut title_words, cues);

    let (priority, conflict) = scan_priority(raw, tables);
    let title = finish_title(&title_words)?;
    let description = finish_description(&desc_words, conflict);
    let tags = capture_tags(tokens, raw, cues);

    Ok(NormalizedTask {
        title,
        description,
        priority,
        tags,
        due_date: None,
        recurrence: None,
    })
}

/// Canonicalize an explicit `add "Title" ...` command
///
/// The quoted title is kept verbatim apart from first-letter
/// capitalization; a valid --priority flag overrides the indicator scan.
pub fn add_task(
    raw: &str,
    set: &EntitySet,
    tables: &RuleTables,
    cues: &CueIndex,
    priority_override: Option<Priority>,
) -> NormalizedTask {
    let title = capitalize_first(set.title.as_deref().unwrap_or_default());

    let (priority, conflict) = match priority_override {
        Some(priority) => (priority, false),
        None => scan_priority(raw, tables),
    };

    let desc_words: Vec<String> = set.description.iter().cloned().collect();
    let description = finish_description(&desc_words, conflict);

    let mut tags = set.tags.clone();
    add_shopping_tag(&mut tags, raw, cues);

    NormalizedTask {
        title,
        description,
        priority,
        tags,
        due_date: None,
        recurrence: None,
    }
}

/// Scan the raw input for priority indicator words and phrases
///
/// Returns the resulting priority and whether both tiers were indicated
/// (high wins the conflict).
pub fn scan_priority(raw: &str, tables: &RuleTables) -> (Priority, bool) {
    let words: Vec<String> = raw.split_whitespace().map(core_word).collect();
    let high = tables
        .high_priority_cues
        .iter()
        .any(|cue| cue_present(&words, cue));
    let low = tables
        .low_priority_cues
        .iter()
        .any(|cue| cue_present(&words, cue));

    match (high, low) {
        (true, true) => (Priority::High, true),
        (true, false) => (Priority::High, false),
        (false, true) => (Priority::Low, false),
        (false, false) => (Priority::Normal, false),
    }
}

/// Word-boundary phrase check over already-lowercased words
fn cue_present(words: &[String], cue: &str) -> bool {
    let cue_words: Vec<&str> = cue.split_whitespace().collect();
    if cue_words.is_empty() {
        return false;
    }
    words
        .windows(cue_words.len())
        .any(|win| win.iter().zip(cue_words.iter()).all(|(w, c)| w == c))
}

/// Drop politeness prefixes repeatedly, longest match first
fn strip_politeness(words: &mut Vec<String>, tables: &RuleTables) {
    let mut prefixes: Vec<Vec<&str>> = tables
        .politeness_prefixes
        .iter()
        .map(|p| p.split_whitespace().collect())
        .collect();
    prefixes.sort_by(|a, b| b.len().cmp(&a.len()));

    'outer: loop {
        for prefix in &prefixes {
            if !prefix.is_empty()
                && prefix.len() <= words.len()
                && prefix
                    .iter()
                    .zip(words.iter())
                    .all(|(p, w)| core_word(w) == *p)
            {
                words.drain(..prefix.len());
                continue 'outer;
            }
        }
        break;
    }
}

/// Drop one leading registered verb word left over after politeness
/// stripping ("please add milk" captures as "Milk")
fn strip_leading_verb(words: &mut Vec<String>, tables: &RuleTables) {
    if let Some(first) = words.first() {
        if tables.is_verb_term(&core_word(first)) {
            words.remove(0);
        }
    }
}

/// Split the clause at the first temporal cue, conjunction, or comma
///
/// "and" stays with the remainder; a boundary comma is dropped. Position
/// zero never splits: a cue with nothing before it is just the title.
fn split_clause(words: &[String], tables: &RuleTables) -> (Vec<String>, Vec<String>) {
    for (i, word) in words.iter().enumerate() {
        let core = core_word(word);
        if i > 0 && (core == "and" || tables.temporal_cues.iter().any(|c| *c == core)) {
            return (words[..i].to_vec(), words[i..].to_vec());
        }
        if word.ends_with(',') && i + 1 < words.len() {
            let mut title = words[..=i].to_vec();
            if let Some(last) = title.last_mut() {
                *last = last.trim_end_matches(',').to_string();
            }
            return (title, words[i + 1..].to_vec());
        }
    }
    (words.to_vec(), Vec::new())
}

/// Remove priority indicator words and phrases from the title region
fn strip_priority_words(words: &mut Vec<String>, tables: &RuleTables) {
    let cues: Vec<Vec<&str>> = tables
        .high_priority_cues
        .iter()
        .chain(tables.low_priority_cues.iter())
        .map(|c| c.split_whitespace().collect())
        .collect();

    let mut i = 0;
    while i < words.len() {
        let mut matched = 0;
        for cue in &cues {
            if cue.is_empty() || i + cue.len() > words.len() {
                continue;
            }
            if cue
                .iter()
                .enumerate()
                .all(|(k, c)| core_word(&words[i + k]) == *c)
            {
                matched = cue.len();
                break;
            }
        }
        if matched > 0 {
            words.drain(i..i + matched);
        } else {
            i += 1;
        }
    }
}

/// Drop a leading article when more than two words remain; style only,
/// never meaningful truncation
fn strip_leading_article(words: &mut Vec<String>, cues: &CueIndex) {
    if words.len() > 2 {
        if let Some(first) = words.first() {
            if cues.stop_words.contains(&core_word(first)) {
                words.remove(0);
            }
        }
    }
}

fn finish_title(words: &[String]) -> Result<String, Rejection> {
    let joined = words.join(" ");
    let trimmed = joined
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | ';' | ':'))
        .trim();
    if trimmed.is_empty() {
        return Err(Rejection::new(
            RejectKind::InvalidFormat,
            "❌ Nothing to capture\n💡 Correct usage: describe the task, e.g. buy milk, or use add \"Title\"",
        ));
    }
    Ok(capitalize_first(trimmed))
}

fn finish_description(words: &[String], conflict: bool) -> Option<String> {
    let joined = words.join(" ");
    let base = joined.trim();
    let mut description = if base.is_empty() {
        String::new()
    } else {
        capitalize_first(base)
    };
    if conflict {
        if description.is_empty() {
            description = PRIORITY_CONFLICT_NOTE.to_string();
        } else {
            description.push(' ');
            description.push_str(PRIORITY_CONFLICT_NOTE);
        }
    }
    if description.is_empty() {
        None
    } else {
        Some(description)
    }
}

fn capture_tags(tokens: &[Token], raw: &str, cues: &CueIndex) -> Vec<String> {
    let mut tags = Vec::new();
    for token in tokens.iter().filter(|t| t.kind == TokenKind::Tag) {
        let tag = normalize_tag(&token.text);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    add_shopping_tag(&mut tags, raw, cues);
    tags
}

/// The single permitted tag inference: a shopping cue in the raw input
/// adds the shopping tag once
pub(crate) fn add_shopping_tag(tags: &mut Vec<String>, raw: &str, cues: &CueIndex) {
    let cued = raw
        .split_whitespace()
        .any(|w| cues.shopping_cues.contains(&core_word(w)));
    if cued && !tags.iter().any(|t| t == "shopping") {
        tags.push("shopping".to_string());
    }
}

pub(crate) fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::tokenize::Tokenizer;

    fn capture(input: &str) -> Result<NormalizedTask, Rejection> {
        let tables = RuleTables::default();
        let cues = CueIndex::new(&tables);
        let tokens = Tokenizer::new()
            .scan(&normalize(input, &tables))
            .expect("tokenization failed");
        capture_task(input, &tokens, &tables, &cues)
    }

    #[test]
    fn test_plain_capture() {
        let task = capture("buy milk").unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Priority::Normal);
        assert!(task.tags.is_empty());
        assert_eq!(task.due_date, None);
        assert_eq!(task.recurrence, None);
    }

    #[test]
    fn test_politeness_and_temporal_clause() {
        let task = capture("remind me to pay bills before Sunday morning").unwrap();
        assert_eq!(task.title, "Pay bills");
        assert_eq!(task.description.as_deref(), Some("Before Sunday morning"));
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_priority_indicator_stripped_from_title() {
        let task = capture("urgent: fix the bug").unwrap();
        assert_eq!(task.title, "Fix the bug");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.description, None);
    }

    #[test]
    fn test_low_priority_phrase() {
        let task = capture("water plants if possible").unwrap();
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.title, "Water plants");
    }

    #[test]
    fn test_conflicting_priority_cues() {
        let task = capture("urgent but optional prep slides").unwrap();
        assert_eq!(task.priority, Priority::High);
        let description = task.description.unwrap();
        assert!(description.contains(PRIORITY_CONFLICT_NOTE));
    }

    #[test]
    fn test_conjunction_stays_with_description() {
        let task = capture("buy milk and bread").unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description.as_deref(), Some("And bread"));
    }

    #[test]
    fn test_leading_verb_after_politeness_is_stripped() {
        let task = capture("please add milk").unwrap();
        assert_eq!(task.title, "Milk");
    }

    #[test]
    fn test_leading_article_dropped_from_longer_titles() {
        let task = capture("the dentist appointment on main street").unwrap();
        assert!(task.title.starts_with("Dentist appointment"));

        // Two-word titles keep their article
        let task = capture("the play").unwrap();
        assert_eq!(task.title, "The play");
    }

    #[test]
    fn test_shopping_cue_infers_single_tag() {
        let task = capture("🛒 milk eggs bread").unwrap();
        assert_eq!(task.tags, vec!["shopping".to_string()]);

        let task = capture("grab groceries <shopping>").unwrap();
        assert_eq!(task.tags, vec!["shopping".to_string()]);
    }

    #[test]
    fn test_nothing_left_to_capture() {
        match capture("please kindly") {
            Err(rejection) => assert_eq!(rejection.kind, RejectKind::InvalidFormat),
            Ok(task) => panic!("Expected rejection, got task '{}'", task.title),
        }
    }

    #[test]
    fn test_add_task_keeps_quoted_title_verbatim() {
        let tables = RuleTables::default();
        let cues = CueIndex::new(&tables);
        let set = EntitySet {
            title: Some("buy the urgent milk".to_string()),
            ..EntitySet::default()
        };
        let task = add_task("add \"buy the urgent milk\"", &set, &tables, &cues, None);
        // Words inside quotes are never dropped, only capitalized
        assert_eq!(task.title, "Buy the urgent milk");
        // The indicator scan still sees the full original text
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_indicator_at_quote_edge_still_counts() {
        let tables = RuleTables::default();
        let cues = CueIndex::new(&tables);
        let set = EntitySet {
            title: Some("urgent milk".to_string()),
            ..EntitySet::default()
        };
        // The cue word sits flush against the opening quote
        let task = add_task("add \"urgent milk\"", &set, &tables, &cues, None);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.title, "Urgent milk");

        let set = EntitySet {
            title: Some("shopping trip".to_string()),
            ..EntitySet::default()
        };
        let task = add_task("add \"shopping trip\"", &set, &tables, &cues, None);
        assert_eq!(task.tags, vec!["shopping".to_string()]);
    }

    #[test]
    fn test_add_task_priority_override() {
        let tables = RuleTables::default();
        let cues = CueIndex::new(&tables);
        let set = EntitySet {
            title: Some("Ship release".to_string()),
            ..EntitySet::default()
        };
        let task = add_task(
            "add \"Ship release\" --priority=low urgent",
            &set,
            &tables,
            &cues,
            Some(Priority::Low),
        );
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.description, None);
    }

    #[test]
    fn test_deterministic_output() {
        let first = capture("remind me to call mom tomorrow asap").unwrap();
        let second = capture("remind me to call mom tomorrow asap").unwrap();
        assert_eq!(first, second);
    }
}
