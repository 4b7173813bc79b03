//! Ambiguity resolution and validation - stage five of the pipeline
//!
//! Commits the candidate readings and extracted entities to exactly one
//! outcome. Checks run in a fixed order so the same fault always wins:
//! ambiguity, required entities, flag conflicts, identifier existence.
//! Every rejection pairs a ❌ line with a 💡 usage line.

use crate::canonical;
use crate::engine::TaskStore;
use crate::entities::{self, EntitySet};
use crate::normalize::core_word;
use crate::score;
use crate::tables::{CueIndex, RuleTables};
use crate::types::{
    FlagValue, Intent, IntentCandidate, MatchStrength, ParseContext, ParseOutcome, Priority,
    RejectKind, Rejection, ResolvedCommand, TaskRef, Token, TokenKind,
};

/// Usage line for an intent, shown in 💡 hints and help output
pub fn usage(intent: Intent) -> &'static str {
    match intent {
        Intent::Add => "add \"Title\" [details] [--priority=<low|normal|high>] [<tag>]",
        Intent::Delete => "delete <id> or delete \"Exact title\"",
        Intent::Update => "update <id> [\"New title\"] [--note <text>] [<tag>]",
        Intent::List => "list [<tag>] [--all]",
        Intent::Complete => "complete <id> or complete \"Exact title\"",
        Intent::Incomplete => "incomplete <id> or incomplete \"Exact title\"",
        Intent::Help => "help [command]",
        Intent::Unknown => "help",
    }
}

/// Resolve candidate readings into the final outcome
pub fn resolve(
    raw: &str,
    tokens: &[Token],
    candidates: &[IntentCandidate],
    tables: &RuleTables,
    cues: &CueIndex,
    ctx: &ParseContext,
    store: &dyn TaskStore,
) -> ParseOutcome {
    if candidates.is_empty() {
        return resolve_unmatched(raw, tokens, tables, cues, ctx);
    }

    let top = candidates
        .iter()
        .map(|c| c.strength)
        .max()
        .unwrap_or(MatchStrength::None);
    if candidates.len() > 1 {
        return clarify(tokens, candidates, top);
    }

    let candidate = &candidates[0];
    let set = entities::extract(tokens, candidate.intent, tables, cues);
    match build_command(raw, tokens, candidate, &set, tables, cues, store) {
        Ok(command) => ParseOutcome::Command {
            command,
            confidence: score::command_confidence(top, filled_slots(&set)),
        },
        Err(rejection) => rejection.into_outcome(),
    }
}

/// Paths for input whose first token matched no verb entry
fn resolve_unmatched(
    raw: &str,
    tokens: &[Token],
    tables: &RuleTables,
    cues: &CueIndex,
    ctx: &ParseContext,
) -> ParseOutcome {
    // A bare number during an active listing is a selection
    if ctx.in_active_listing && tokens.len() == 1 && tokens[0].kind == TokenKind::Number {
        return resolve_selection(&tokens[0], ctx);
    }

    // Flags signal command shape; without a known verb that is an error,
    // never a capture
    if let Some(flag) = tokens.iter().find(|t| t.kind == TokenKind::Flag) {
        let head = tokens.first().map(render_token).unwrap_or_default();
        return Rejection::new(
            RejectKind::UnknownCommand,
            format!(
                "❌ Unknown command '{}' (flag '--{}' needs a known command)\n💡 Correct usage: help",
                head, flag.text
            ),
        )
        .into_outcome();
    }

    if tokens.len() < 2 {
        // Rendered in input spelling: a lone <work> reports '<work>'
        let head = tokens.first().map(render_token).unwrap_or_default();
        return Rejection::new(
            RejectKind::UnknownCommand,
            format!("❌ Unknown command '{}'\n💡 Correct usage: help", head),
        )
        .into_outcome();
    }

    // Multi-word, flag-free text reads as a conversational task
    match canonical::capture_task(raw, tokens, tables, cues) {
        Ok(task) => {
            let filled =
                usize::from(task.description.is_some()) + usize::from(!task.tags.is_empty());
            ParseOutcome::Task {
                task,
                confidence: score::capture_confidence(filled),
            }
        }
        Err(rejection) => rejection.into_outcome(),
    }
}

fn resolve_selection(token: &Token, ctx: &ParseContext) -> ParseOutcome {
    let index = match token.text.parse::<u64>() {
        Ok(n) => n,
        Err(_) => {
            return Rejection::new(
                RejectKind::InvalidFormat,
                format!(
                    "❌ '{}' is not a usable index\n💡 Correct usage: pick an index from the current list",
                    token.text
                ),
            )
            .into_outcome()
        }
    };
    match ctx.visible_items.iter().find(|item| item.index == index) {
        Some(item) => ParseOutcome::Command {
            command: ResolvedCommand::Select {
                index,
                id: item.id.clone(),
                title: item.title.clone(),
            },
            confidence: score::SELECT_CONFIDENCE,
        },
        None => Rejection::new(
            RejectKind::InvalidIdentifierReference,
            format!(
                "❌ No listed item has index {}\n💡 Correct usage: pick an index from the current list",
                index
            ),
        )
        .into_outcome(),
    }
}

/// Competing readings become a question, never a guess
fn clarify(tokens: &[Token], candidates: &[IntentCandidate], top: MatchStrength) -> ParseOutcome {
    let remainder = tokens
        .iter()
        .skip(1)
        .map(render_token)
        .collect::<Vec<_>>()
        .join(" ");
    let options: Vec<String> = candidates
        .iter()
        .map(|c| {
            if remainder.is_empty() {
                format!("to {}", c.verb)
            } else {
                format!("to {} {}", c.verb, remainder)
            }
        })
        .collect();
    ParseOutcome::Clarification {
        prompt: format!("❓ Did you mean {}?", options.join(" or ")),
        candidates: candidates.to_vec(),
        confidence: score::clarification_confidence(top),
    }
}

/// Token rendered back in its input spelling for prompts
fn render_token(token: &Token) -> String {
    match token.kind {
        TokenKind::Flag => match &token.attachment {
            Some(value) => format!("--{}={}", token.text, value),
            None => format!("--{}", token.text),
        },
        TokenKind::Tag => format!("<{}>", token.text),
        TokenKind::QuotedLiteral => format!("\"{}\"", token.text),
        _ => token.text.clone(),
    }
}

fn build_command(
    raw: &str,
    tokens: &[Token],
    candidate: &IntentCandidate,
    set: &EntitySet,
    tables: &RuleTables,
    cues: &CueIndex,
    store: &dyn TaskStore,
) -> Result<ResolvedCommand, Rejection> {
    match candidate.intent {
        Intent::Add => {
            if set.title.as_deref().map_or(true, |t| t.is_empty()) {
                return Err(missing_title(tokens));
            }
            check_flag_conflicts(Intent::Add, set, tables)?;
            let priority_override = parse_priority_flag(set)?;
            Ok(build_add(raw, set, tables, cues, priority_override))
        }
        Intent::Delete => {
            let target = required_target(Intent::Delete, set, store)?;
            check_flag_conflicts(Intent::Delete, set, tables)?;
            check_target_exists(Intent::Delete, &target, store)?;
            Ok(ResolvedCommand::Delete {
                target,
                flags: set.flags.clone(),
            })
        }
        Intent::Complete => {
            let target = required_target(Intent::Complete, set, store)?;
            check_flag_conflicts(Intent::Complete, set, tables)?;
            check_target_exists(Intent::Complete, &target, store)?;
            Ok(ResolvedCommand::Complete {
                target,
                flags: set.flags.clone(),
            })
        }
        Intent::Incomplete => {
            let target = required_target(Intent::Incomplete, set, store)?;
            check_flag_conflicts(Intent::Incomplete, set, tables)?;
            check_target_exists(Intent::Incomplete, &target, store)?;
            Ok(ResolvedCommand::Incomplete {
                target,
                flags: set.flags.clone(),
            })
        }
        Intent::Update => {
            let target = required_target(Intent::Update, set, store)?;
            check_flag_conflicts(Intent::Update, set, tables)?;
            let priority_override = parse_priority_flag(set)?;
            let note = parse_note_flag(set)?;
            check_target_exists(Intent::Update, &target, store)?;
            Ok(build_update(set, target, note, priority_override))
        }
        Intent::List => {
            check_flag_conflicts(Intent::List, set, tables)?;
            Ok(build_list(set))
        }
        Intent::Help => Ok(build_help(tokens, tables)),
        Intent::Unknown => Err(Rejection::new(
            RejectKind::UnknownCommand,
            format!(
                "❌ Unknown command '{}'\n💡 Correct usage: help",
                candidate.verb
            ),
        )),
    }
}

/// Presence check: an explicit id, or free text the store confirms as an
/// exact title
fn required_target(
    intent: Intent,
    set: &EntitySet,
    store: &dyn TaskStore,
) -> Result<TaskRef, Rejection> {
    if let Some(reference) = &set.identifier {
        return Ok(reference.clone());
    }
    if let Some(title) = &set.title_candidate {
        if !title.is_empty() && store.title_exists(title) {
            return Ok(TaskRef::Title(title.clone()));
        }
    }
    Err(Rejection::new(
        RejectKind::MissingIdentifier,
        format!("❌ Missing task reference\n💡 Correct usage: {}", usage(intent)),
    ))
}

/// Existence check, last in the chain; title refs were confirmed during
/// presence resolution
fn check_target_exists(
    intent: Intent,
    target: &TaskRef,
    store: &dyn TaskStore,
) -> Result<(), Rejection> {
    match target {
        TaskRef::Title(_) => Ok(()),
        reference => {
            if store.id_exists(reference) {
                Ok(())
            } else {
                Err(Rejection::new(
                    RejectKind::InvalidIdentifierReference,
                    format!(
                        "❌ {} does not resolve to a task\n💡 Correct usage: {}",
                        describe_ref(reference),
                        usage(intent)
                    ),
                ))
            }
        }
    }
}

fn describe_ref(reference: &TaskRef) -> String {
    match reference {
        TaskRef::Index(n) => format!("Task id {}", n),
        TaskRef::Uuid(id) => format!("Task uuid {}", id),
        TaskRef::Title(title) => format!("Task '{}'", title),
    }
}

fn check_flag_conflicts(
    intent: Intent,
    set: &EntitySet,
    tables: &RuleTables,
) -> Result<(), Rejection> {
    if let Some(name) = &set.duplicate_flag {
        return Err(Rejection::new(
            RejectKind::ConflictingParameters,
            format!(
                "❌ Flag '--{}' was assigned more than once\n💡 Correct usage: {}",
                name,
                usage(intent)
            ),
        ));
    }
    for (a, b) in &tables.conflicting_flags {
        if set.flags.contains_key(a) && set.flags.contains_key(b) {
            return Err(Rejection::new(
                RejectKind::ConflictingParameters,
                format!(
                    "❌ Flags '--{}' and '--{}' conflict\n💡 Correct usage: {}",
                    a,
                    b,
                    usage(intent)
                ),
            ));
        }
    }
    Ok(())
}

/// Validate an explicit --priority flag; absence is not a fault
fn parse_priority_flag(set: &EntitySet) -> Result<Option<Priority>, Rejection> {
    match set.flags.get("priority") {
        None => Ok(None),
        Some(FlagValue::Text(value)) => match Priority::parse_value(value) {
            Some(priority) => Ok(Some(priority)),
            None => Err(Rejection::new(
                RejectKind::InvalidFormat,
                format!(
                    "❌ Invalid priority '{}'\n💡 Correct usage: --priority=<low|normal|high>",
                    value
                ),
            )),
        },
        Some(FlagValue::Bool(_)) => Err(Rejection::new(
            RejectKind::InvalidFormat,
            "❌ Flag '--priority' needs a value\n💡 Correct usage: --priority=<low|normal|high>",
        )),
    }
}

/// Validate an explicit --note flag; absence is not a fault
fn parse_note_flag(set: &EntitySet) -> Result<Option<String>, Rejection> {
    match set.flags.get("note") {
        None => Ok(None),
        Some(FlagValue::Text(value)) => Ok(Some(value.clone())),
        Some(FlagValue::Bool(_)) => Err(Rejection::new(
            RejectKind::InvalidFormat,
            "❌ Flag '--note' needs a value\n💡 Correct usage: --note <text>",
        )),
    }
}

fn build_add(
    raw: &str,
    set: &EntitySet,
    tables: &RuleTables,
    cues: &CueIndex,
    priority_override: Option<Priority>,
) -> ResolvedCommand {
    let task = canonical::add_task(raw, set, tables, cues, priority_override);
    let mut flags = set.flags.clone();
    flags.remove("priority");
    ResolvedCommand::Add { task, flags }
}

/// Reconstruct a title suggestion from the leftover input so the hint
/// shows the fix, not just the rule
fn missing_title(tokens: &[Token]) -> Rejection {
    let mut pieces: Vec<&str> = Vec::new();
    for token in tokens.iter().skip(1) {
        match token.kind {
            TokenKind::Word
            | TokenKind::Number
            | TokenKind::Identifier
            | TokenKind::QuotedLiteral => {
                if !token.text.chars().all(|c| c == '-') {
                    pieces.push(token.text.as_str());
                }
            }
            TokenKind::Flag => {
                if let Some(value) = &token.attachment {
                    pieces.push(value.as_str());
                }
            }
            _ => {}
        }
    }
    let suggestion = if pieces.is_empty() {
        "add \"Title\"".to_string()
    } else {
        format!("add '{}'", pieces.join(" "))
    };
    Rejection::new(
        RejectKind::InvalidFormat,
        format!("❌ Add needs a quoted title\n💡 Correct usage: {}", suggestion),
    )
}

fn build_update(
    set: &EntitySet,
    target: TaskRef,
    note: Option<String>,
    priority_override: Option<Priority>,
) -> ResolvedCommand {
    let note = note.or_else(|| set.description.clone().filter(|d| !d.is_empty()));
    let mut flags = set.flags.clone();
    flags.remove("note");
    flags.remove("priority");
    if let Some(priority) = priority_override {
        // carry the validated value forward in canonical spelling
        flags.insert(
            "priority".to_string(),
            FlagValue::Text(priority_name(priority).to_string()),
        );
    }
    ResolvedCommand::Update {
        target,
        title: set.title.clone(),
        note,
        tags: set.tags.clone(),
        flags,
    }
}

fn priority_name(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Normal => "normal",
        Priority::High => "high",
    }
}

/// Plain words after `list` read as tag filters, same normalization as
/// angle-bracket tags
fn build_list(set: &EntitySet) -> ResolvedCommand {
    let mut tags = set.tags.clone();
    if let Some(description) = &set.description {
        for word in description.split_whitespace() {
            let tag = entities::normalize_tag(word);
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    ResolvedCommand::List {
        tags,
        flags: set.flags.clone(),
    }
}

fn build_help(tokens: &[Token], tables: &RuleTables) -> ResolvedCommand {
    let topic = tokens
        .iter()
        .skip(1)
        .find(|t| matches!(t.kind, TokenKind::Word | TokenKind::Verb))
        .and_then(|t| tables.lookup_verb(&core_word(&t.text)));
    ResolvedCommand::Help { topic }
}

/// Optional slots filled, for band positioning: description, tags, flags
fn filled_slots(set: &EntitySet) -> usize {
    usize::from(set.description.as_deref().map_or(false, |d| !d.is_empty()))
        + usize::from(!set.tags.is_empty())
        + usize::from(!set.flags.is_empty())
}
