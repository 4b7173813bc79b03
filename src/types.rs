//! Core data types for the normalization pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Lexical class of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Verb,
    Identifier,
    QuotedLiteral,
    Flag,
    Number,
    Tag,
    Word,
}

/// A single token with its span in the normalized input
///
/// Spans are byte offsets into the normalized text. A quoted literal's
/// `text` has the quote characters stripped, but its span still covers
/// them so error messages can point at the original region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Inline `=value` payload of a flag token
    pub attachment: Option<String>,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            attachment: None,
            start,
            end,
        }
    }

    pub fn with_attachment(
        kind: TokenKind,
        text: impl Into<String>,
        attachment: String,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            attachment: Some(attachment),
            start,
            end,
        }
    }
}

/// Canonical task operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Add,
    Delete,
    Update,
    List,
    Complete,
    Incomplete,
    Help,
    Unknown,
}

impl Intent {
    /// Canonical verb spelling for this intent
    pub fn canonical_verb(&self) -> &'static str {
        match self {
            Intent::Add => "add",
            Intent::Delete => "delete",
            Intent::Update => "update",
            Intent::List => "list",
            Intent::Complete => "complete",
            Intent::Incomplete => "incomplete",
            Intent::Help => "help",
            Intent::Unknown => "unknown",
        }
    }

    /// Parse a canonical intent name ("add", "delete", ...)
    pub fn parse_name(name: &str) -> Option<Intent> {
        match name.to_ascii_lowercase().as_str() {
            "add" => Some(Intent::Add),
            "delete" => Some(Intent::Delete),
            "update" => Some(Intent::Update),
            "list" => Some(Intent::List),
            "complete" => Some(Intent::Complete),
            "incomplete" => Some(Intent::Incomplete),
            "help" => Some(Intent::Help),
            _ => None,
        }
    }

    /// Whether this intent must address an existing task
    pub fn requires_identifier(&self) -> bool {
        matches!(
            self,
            Intent::Delete | Intent::Update | Intent::Complete | Intent::Incomplete
        )
    }
}

/// How strongly a verb token matched a rule-table entry
///
/// Ordered weakest to strongest so the top tier of a candidate list is
/// simply the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    None,
    Partial,
    Synonym,
    Exact,
}

/// One possible reading of the verb token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentCandidate {
    pub intent: Intent,
    /// Canonical verb of the table entry that matched
    pub verb: String,
    /// The table term the token matched or completed to
    pub matched_synonym: String,
    pub strength: MatchStrength,
}

/// Reference to a task held by the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskRef {
    Index(u64),
    Uuid(String),
    Title(String),
}

/// Task priority, defaulting to normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    /// Parse a flag value such as "high"; anything else is None
    pub fn parse_value(value: &str) -> Option<Priority> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "normal" => Some(Priority::Normal),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Canonical task payload
///
/// Every field is always serialized. `due_date` and `recurrence` are
/// carried for schema compatibility and are always `None`: temporal
/// phrases stay embedded in `description` as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub due_date: Option<String>,
    pub recurrence: Option<String>,
}

impl NormalizedTask {
    pub fn new(title: String) -> Self {
        Self {
            title,
            description: None,
            priority: Priority::Normal,
            tags: Vec::new(),
            due_date: None,
            recurrence: None,
        }
    }
}

/// Value carried by a flag: a bare switch or an explicit text value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Text(String),
}

/// Deterministically ordered flag map
pub type FlagMap = BTreeMap<String, FlagValue>;

/// A fully resolved command, ready for the host application to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ResolvedCommand {
    Add {
        task: NormalizedTask,
        flags: FlagMap,
    },
    Delete {
        target: TaskRef,
        flags: FlagMap,
    },
    Update {
        target: TaskRef,
        title: Option<String>,
        note: Option<String>,
        tags: Vec<String>,
        flags: FlagMap,
    },
    Complete {
        target: TaskRef,
        flags: FlagMap,
    },
    Incomplete {
        target: TaskRef,
        flags: FlagMap,
    },
    List {
        tags: Vec<String>,
        flags: FlagMap,
    },
    Help {
        topic: Option<Intent>,
    },
    /// Numeric selection against the caller's visible listing
    Select {
        index: u64,
        id: String,
        title: String,
    },
}

/// Typed rejection reasons
///
/// Rejections are returned as data inside `ParseOutcome`, never raised.
/// `AmbiguousIntent` is not produced by the pipeline itself (ambiguity
/// becomes a `Clarification`); it exists so adapter surfaces can report
/// every non-success outcome through one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    #[error("empty input")]
    EmptyInput,
    #[error("unknown command")]
    UnknownCommand,
    #[error("invalid format")]
    InvalidFormat,
    #[error("missing identifier")]
    MissingIdentifier,
    #[error("conflicting parameters")]
    ConflictingParameters,
    #[error("invalid identifier reference")]
    InvalidIdentifierReference,
    #[error("ambiguous intent")]
    AmbiguousIntent,
}

impl RejectKind {
    /// Kind as serialized ("empty_input", "unknown_command", ...)
    pub fn name(&self) -> &'static str {
        match self {
            RejectKind::EmptyInput => "empty_input",
            RejectKind::UnknownCommand => "unknown_command",
            RejectKind::InvalidFormat => "invalid_format",
            RejectKind::MissingIdentifier => "missing_identifier",
            RejectKind::ConflictingParameters => "conflicting_parameters",
            RejectKind::InvalidIdentifierReference => "invalid_identifier_reference",
            RejectKind::AmbiguousIntent => "ambiguous_intent",
        }
    }
}

/// Payload of a rejected parse, used internally by stages that can fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: RejectKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn into_outcome(self) -> ParseOutcome {
        ParseOutcome::Rejected {
            kind: self.kind,
            message: self.message,
        }
    }
}

/// Result of parsing one line of input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParseOutcome {
    /// A conversational utterance captured as a task
    Task {
        task: NormalizedTask,
        confidence: u8,
    },
    /// An explicit command resolved against the rule tables
    Command {
        command: ResolvedCommand,
        confidence: u8,
    },
    /// Competing interpretations that the caller must disambiguate
    Clarification {
        prompt: String,
        candidates: Vec<IntentCandidate>,
        confidence: u8,
    },
    /// Input that could not be accepted, with an actionable message
    Rejected {
        kind: RejectKind,
        message: String,
    },
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseOutcome::Task { .. } | ParseOutcome::Command { .. })
    }

    /// Outcome tag as serialized ("task", "command", ...)
    pub fn type_name(&self) -> &'static str {
        match self {
            ParseOutcome::Task { .. } => "task",
            ParseOutcome::Command { .. } => "command",
            ParseOutcome::Clarification { .. } => "clarification",
            ParseOutcome::Rejected { .. } => "rejected",
        }
    }

    pub fn confidence(&self) -> Option<u8> {
        match self {
            ParseOutcome::Task { confidence, .. }
            | ParseOutcome::Command { confidence, .. }
            | ParseOutcome::Clarification { confidence, .. } => Some(*confidence),
            ParseOutcome::Rejected { .. } => None,
        }
    }

    /// Rejection kind for non-success outcomes; clarifications report
    /// `AmbiguousIntent` for handling symmetry
    pub fn reject_kind(&self) -> Option<RejectKind> {
        match self {
            ParseOutcome::Rejected { kind, .. } => Some(*kind),
            ParseOutcome::Clarification { .. } => Some(RejectKind::AmbiguousIntent),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One row of the listing currently shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleItem {
    pub index: u64,
    pub id: String,
    pub title: String,
}

/// Session context supplied by the caller
///
/// The default context has no active listing, so bare numbers are not
/// treated as selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseContext {
    pub in_active_listing: bool,
    pub visible_items: Vec<VisibleItem>,
}

impl ParseContext {
    /// Context for an active listing with the given visible rows
    pub fn listing(items: Vec<VisibleItem>) -> Self {
        Self {
            in_active_listing: true,
            visible_items: items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_with_type_tag() {
        let outcome = ParseOutcome::Rejected {
            kind: RejectKind::EmptyInput,
            message: "nothing to parse".to_string(),
        };
        let json = outcome.to_json().unwrap();
        assert!(json.contains(r#""type":"rejected""#));
        assert!(json.contains(r#""kind":"empty_input""#));
    }

    #[test]
    fn test_task_payload_field_names_are_literal() {
        let task = NormalizedTask::new("Buy milk".to_string());
        let json = serde_json::to_string(&task).unwrap();
        for field in [
            "\"title\"",
            "\"description\"",
            "\"priority\"",
            "\"tags\"",
            "\"due_date\"",
            "\"recurrence\"",
        ] {
            assert!(json.contains(field), "missing field in {}", json);
        }
        assert!(json.contains(r#""due_date":null"#));
        assert!(json.contains(r#""recurrence":null"#));
    }

    #[test]
    fn test_match_strength_ordering() {
        assert!(MatchStrength::Exact > MatchStrength::Synonym);
        assert!(MatchStrength::Synonym > MatchStrength::Partial);
        assert!(MatchStrength::Partial > MatchStrength::None);
    }

    #[test]
    fn test_clarification_reports_ambiguous_kind() {
        let outcome = ParseOutcome::Clarification {
            prompt: "Did you mean to add meeting or attend meeting?".to_string(),
            candidates: Vec::new(),
            confidence: 40,
        };
        assert_eq!(outcome.reject_kind(), Some(RejectKind::AmbiguousIntent));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_priority_parse_value() {
        assert_eq!(Priority::parse_value("HIGH"), Some(Priority::High));
        assert_eq!(Priority::parse_value("normal"), Some(Priority::Normal));
        assert_eq!(Priority::parse_value("soon"), None);
    }
}
