//! Entity extraction - stage four of the pipeline
//!
//! Fills command slots from the token stream. Extraction is total: a
//! missing entity leaves its slot empty and the resolver decides whether
//! that is fatal. Temporal phrases are recorded as raw substrings and
//! stay embedded in the description; nothing here resolves dates.

use crate::normalize::core_word;
use crate::tables::{CueIndex, RuleTables};
use crate::types::{FlagMap, FlagValue, Intent, TaskRef, Token, TokenKind};
use std::collections::BTreeMap;

/// Slots extracted from one classified command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    /// Numeric or UUID reference; the first number wins over any UUID
    pub identifier: Option<TaskRef>,
    /// Quoted title, required for add and optional for update
    pub title: Option<String>,
    /// Post-verb free text joined with single spaces, flags and tags excluded
    pub description: Option<String>,
    /// The same free text, offered for exact-title store lookup when no
    /// numeric or UUID identifier was present
    pub title_candidate: Option<String>,
    pub tags: Vec<String>,
    pub flags: FlagMap,
    /// First flag name assigned more than once, with differing payloads
    /// or through both the inline and the two-token form
    pub duplicate_flag: Option<String>,
    /// Raw temporal substring, never parsed into a date
    pub temporal_phrase: Option<String>,
}

/// Extract entities for a classified intent
pub fn extract(
    tokens: &[Token],
    intent: Intent,
    tables: &RuleTables,
    cues: &CueIndex,
) -> EntitySet {
    let mut set = EntitySet::default();
    let body = match tokens.first() {
        Some(token) if token.kind == TokenKind::Verb => &tokens[1..],
        _ => tokens,
    };

    // The identifier is picked ahead of the main walk so its token never
    // leaks into the description or gets eaten as a flag value
    let identifier_idx = if intent.requires_identifier() {
        pick_identifier(body, &mut set)
    } else {
        None
    };

    let mut free_text: Vec<String> = Vec::new();
    let mut forms: BTreeMap<String, FlagForm> = BTreeMap::new();
    let mut saw_word_before_quote = false;
    let mut i = 0;
    while i < body.len() {
        if Some(i) == identifier_idx {
            i += 1;
            continue;
        }
        let token = &body[i];
        match token.kind {
            TokenKind::Flag => {
                let next_is_identifier = identifier_idx == Some(i + 1);
                let consumed = insert_flag(
                    &mut set,
                    &mut forms,
                    token,
                    body.get(i + 1),
                    next_is_identifier,
                    cues,
                );
                i += 1 + consumed;
                continue;
            }
            TokenKind::Tag => push_tag(&mut set.tags, &token.text),
            TokenKind::QuotedLiteral => {
                let title_slot_open = set.title.is_none()
                    && match intent {
                        Intent::Add => !saw_word_before_quote,
                        Intent::Update => true,
                        _ => false,
                    };
                if title_slot_open {
                    set.title = Some(token.text.clone());
                } else {
                    free_text.push(token.text.clone());
                }
            }
            TokenKind::Word | TokenKind::Number | TokenKind::Identifier => {
                saw_word_before_quote = true;
                free_text.push(token.text.clone());
            }
            TokenKind::Verb => {}
        }
        i += 1;
    }

    if !free_text.is_empty() {
        let joined = free_text.join(" ");
        set.description = Some(joined.clone());
        if set.identifier.is_none() {
            set.title_candidate = Some(joined);
        }
        set.temporal_phrase = find_temporal_phrase(&free_text, tables);
    }

    set
}

/// Index of the token consumed as identifier: first parseable number,
/// else first UUID
fn pick_identifier(body: &[Token], set: &mut EntitySet) -> Option<usize> {
    for (i, token) in body.iter().enumerate() {
        if token.kind == TokenKind::Number {
            if let Ok(n) = token.text.parse::<u64>() {
                set.identifier = Some(TaskRef::Index(n));
                return Some(i);
            }
        }
    }
    for (i, token) in body.iter().enumerate() {
        if token.kind == TokenKind::Identifier {
            set.identifier = Some(TaskRef::Uuid(token.text.to_lowercase()));
            return Some(i);
        }
    }
    None
}

/// How a flag's payload arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagForm {
    Inline,
    Spaced,
    Switch,
}

/// Record one flag assignment; returns how many following tokens were
/// consumed as its value
///
/// `--name=value` and `--name value` normalize to the same pair, so
/// giving one flag through both forms (or with two different payloads)
/// is a conflict the resolver reports. Only an identical repeat through
/// the same form collapses.
fn insert_flag(
    set: &mut EntitySet,
    forms: &mut BTreeMap<String, FlagForm>,
    token: &Token,
    next: Option<&Token>,
    next_is_identifier: bool,
    cues: &CueIndex,
) -> usize {
    let name = token.text.to_lowercase();
    let (value, form, consumed) = match &token.attachment {
        Some(inline) => (FlagValue::Text(inline.clone()), FlagForm::Inline, 0),
        None => match next {
            Some(n)
                if !next_is_identifier
                    && !cues.boolean_flags.contains(&name)
                    && matches!(
                        n.kind,
                        TokenKind::Word | TokenKind::Number | TokenKind::QuotedLiteral
                    ) =>
            {
                (FlagValue::Text(n.text.clone()), FlagForm::Spaced, 1)
            }
            _ => (FlagValue::Bool(true), FlagForm::Switch, 0),
        },
    };

    match set.flags.get(&name) {
        Some(existing) => {
            let same = *existing == value && forms.get(&name) == Some(&form);
            if !same && set.duplicate_flag.is_none() {
                set.duplicate_flag = Some(name);
            }
        }
        None => {
            forms.insert(name.clone(), form);
            set.flags.insert(name, value);
        }
    }
    consumed
}

/// Lowercase a tag and strip one trailing 's' when at least three
/// characters remain; no stemmer
pub(crate) fn normalize_tag(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if let Some(stripped) = lower.strip_suffix('s') {
        if stripped.chars().count() >= 3 {
            return stripped.to_string();
        }
    }
    lower
}

fn push_tag(tags: &mut Vec<String>, raw: &str) {
    let tag = normalize_tag(raw);
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}

/// Raw substring from the first temporal cue word to the end of the clause
fn find_temporal_phrase(words: &[String], tables: &RuleTables) -> Option<String> {
    words
        .iter()
        .position(|w| tables.temporal_cues.iter().any(|cue| *cue == core_word(w)))
        .map(|start| words[start..].join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::tokenize::Tokenizer;

    fn extract_for(input: &str, intent: Intent) -> EntitySet {
        let tables = RuleTables::default();
        let cues = CueIndex::new(&tables);
        let tokens = Tokenizer::new()
            .scan(&normalize(input, &tables))
            .expect("tokenization failed");
        extract(&tokens, intent, &tables, &cues)
    }

    #[test]
    fn test_add_takes_quoted_title() {
        let set = extract_for("add \"Buy milk\" before sunday <Chores>", Intent::Add);
        assert_eq!(set.title.as_deref(), Some("Buy milk"));
        assert_eq!(set.description.as_deref(), Some("before sunday"));
        assert_eq!(set.temporal_phrase.as_deref(), Some("before sunday"));
        assert_eq!(set.tags, vec!["chore".to_string()]);
    }

    #[test]
    fn test_add_title_spoiled_by_leading_word() {
        let set = extract_for("add My \"Real title\"", Intent::Add);
        assert_eq!(set.title, None);
        assert_eq!(set.description.as_deref(), Some("My Real title"));
    }

    #[test]
    fn test_first_number_beats_uuid_for_identifier() {
        let set = extract_for(
            "update 550e8400-e29b-41d4-a716-446655440000 3",
            Intent::Update,
        );
        assert_eq!(set.identifier, Some(TaskRef::Index(3)));
        // The unconsumed UUID stays in the free text
        assert!(set.description.unwrap().contains("550e8400"));
    }

    #[test]
    fn test_uuid_identifier_when_no_number() {
        let set = extract_for("delete 550e8400-e29b-41d4-a716-446655440000", Intent::Delete);
        assert_eq!(
            set.identifier,
            Some(TaskRef::Uuid("550e8400-e29b-41d4-a716-446655440000".to_string()))
        );
        assert_eq!(set.description, None);
    }

    #[test]
    fn test_title_candidate_when_no_identifier() {
        let set = extract_for("delete Buy milk", Intent::Delete);
        assert_eq!(set.identifier, None);
        assert_eq!(set.title_candidate.as_deref(), Some("Buy milk"));
    }

    #[test]
    fn test_flag_forms_normalize_identically() {
        let inline = extract_for("delete 3 --mode=fast", Intent::Delete);
        let spaced = extract_for("delete 3 --mode fast", Intent::Delete);
        assert_eq!(inline.flags, spaced.flags);
        assert_eq!(
            inline.flags.get("mode"),
            Some(&FlagValue::Text("fast".to_string()))
        );
    }

    #[test]
    fn test_quoted_flag_value_matches_inline_form() {
        let inline = extract_for("delete 3 --label=\"nice one\"", Intent::Delete);
        let spaced = extract_for("delete 3 --label \"nice one\"", Intent::Delete);
        assert_eq!(inline.flags, spaced.flags);
        assert_eq!(
            spaced.flags.get("label"),
            Some(&FlagValue::Text("nice one".to_string()))
        );
        // The consumed literal never leaks into the free text
        assert_eq!(spaced.description, None);
    }

    #[test]
    fn test_boolean_flag_leaves_quoted_title_alone() {
        let set = extract_for("add --force \"Buy milk\"", Intent::Add);
        assert_eq!(set.flags.get("force"), Some(&FlagValue::Bool(true)));
        assert_eq!(set.title.as_deref(), Some("Buy milk"));
    }

    #[test]
    fn test_boolean_flags_do_not_swallow_words() {
        let set = extract_for("delete 3 --force now", Intent::Delete);
        assert_eq!(set.flags.get("force"), Some(&FlagValue::Bool(true)));
        assert_eq!(set.description.as_deref(), Some("now"));
    }

    #[test]
    fn test_flag_never_swallows_the_identifier() {
        let set = extract_for("delete --mode 3", Intent::Delete);
        assert_eq!(set.identifier, Some(TaskRef::Index(3)));
        assert_eq!(set.flags.get("mode"), Some(&FlagValue::Bool(true)));
    }

    #[test]
    fn test_duplicate_flag_with_differing_values() {
        let set = extract_for("delete 3 --mode=fast --mode slow", Intent::Delete);
        assert_eq!(set.duplicate_flag.as_deref(), Some("mode"));

        let repeat = extract_for("delete 3 --force --force", Intent::Delete);
        assert_eq!(repeat.duplicate_flag, None);
    }

    #[test]
    fn test_same_flag_through_both_forms_is_duplicate() {
        // Even with an identical value, mixing the inline and the
        // two-token form is a conflict
        let set = extract_for("delete 3 --mode=fast --mode fast", Intent::Delete);
        assert_eq!(set.duplicate_flag.as_deref(), Some("mode"));

        let inline_repeat = extract_for("delete 3 --mode=fast --mode=fast", Intent::Delete);
        assert_eq!(inline_repeat.duplicate_flag, None);
    }

    #[test]
    fn test_tag_normalization_rules() {
        assert_eq!(normalize_tag("Work"), "work");
        assert_eq!(normalize_tag("BUGS"), "bug");
        // Stripping would leave fewer than three characters
        assert_eq!(normalize_tag("as"), "as");
        assert_eq!(normalize_tag("gas"), "gas");
    }

    #[test]
    fn test_tags_dedupe_in_order() {
        let set = extract_for("list <Work> <bugs> <work>", Intent::List);
        assert_eq!(set.tags, vec!["work".to_string(), "bug".to_string()]);
    }
}
