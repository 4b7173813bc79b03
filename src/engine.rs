//! Engine facade - one entry point over the whole pipeline
//!
//! Owns the immutable rule tables, their hash-set views and the compiled
//! token patterns. Construction is the only setup cost; a parse call
//! shares nothing mutable, so one engine serves unlimited concurrent
//! callers without locking.

use crate::intent;
use crate::normalize;
use crate::resolve;
use crate::tables::{CueIndex, RuleTables, VerbEntry};
use crate::tokenize::Tokenizer;
use crate::types::{ParseContext, ParseOutcome, RejectKind, TaskRef, TokenKind};

/// Fixed prompt returned for empty input
pub const EMPTY_INPUT_HELP: &str =
    "❌ Nothing to parse\n💡 Correct usage: add \"Title\", list, complete <id>, delete <id>, or help";

/// Read-only collaborator answering existence questions about stored
/// tasks
///
/// The engine only ever queries; creating, updating and deleting stay
/// with the caller after it receives a successful outcome. Transport
/// concerns belong to the implementation, which must answer rather than
/// fail.
pub trait TaskStore {
    /// Whether a task with exactly this title exists (case-sensitive)
    fn title_exists(&self, title: &str) -> bool;
    /// Whether this reference resolves to a stored task
    fn id_exists(&self, reference: &TaskRef) -> bool;
}

/// Null collaborator for callers without a store: it cannot resolve
/// titles and cannot disprove ids
pub struct NoStore;

impl TaskStore for NoStore {
    fn title_exists(&self, _title: &str) -> bool {
        false
    }

    fn id_exists(&self, _reference: &TaskRef) -> bool {
        true
    }
}

/// The normalization engine
pub struct Engine {
    tables: RuleTables,
    cues: CueIndex,
    tokenizer: Tokenizer,
}

impl Engine {
    /// Engine over the built-in rule tables
    pub fn new() -> Self {
        Self::with_tables(RuleTables::default())
    }

    /// Engine over caller-supplied tables, loaded from TOML or built
    /// programmatically
    pub fn with_tables(mut tables: RuleTables) -> Self {
        tables.normalize_terms();
        let cues = CueIndex::new(&tables);
        Self {
            tables,
            cues,
            tokenizer: Tokenizer::new(),
        }
    }

    /// The tables this engine resolves against
    pub fn tables(&self) -> &RuleTables {
        &self.tables
    }

    /// Register one more verb entry; setup-time only
    pub fn add_verb(&mut self, mut entry: VerbEntry) {
        entry.canonical = entry.canonical.to_lowercase();
        for synonym in &mut entry.synonyms {
            *synonym = synonym.to_lowercase();
        }
        self.tables.verbs.push(entry);
    }

    /// Parse one line without a task store
    pub fn parse(&self, input: &str, ctx: &ParseContext) -> ParseOutcome {
        self.parse_with_store(input, ctx, &NoStore)
    }

    /// Parse one line, resolving title and id references through the
    /// caller's store
    pub fn parse_with_store(
        &self,
        input: &str,
        ctx: &ParseContext,
        store: &dyn TaskStore,
    ) -> ParseOutcome {
        let normalized = normalize::normalize(input, &self.tables);
        if normalized.text.is_empty() {
            return ParseOutcome::Rejected {
                kind: RejectKind::EmptyInput,
                message: EMPTY_INPUT_HELP.to_string(),
            };
        }
        if !normalized.boundary_hints.is_empty() {
            tracing::debug!(
                "Verb terms reappear at byte offsets {:?} - keeping the input as one command",
                normalized.boundary_hints
            );
        }

        let tokens = match self.tokenizer.scan(&normalized) {
            Ok(tokens) => tokens,
            Err(rejection) => return rejection.into_outcome(),
        };
        let candidates = match tokens.first() {
            Some(token) if token.kind == TokenKind::Verb => {
                intent::classify(&token.text, &self.tables)
            }
            _ => Vec::new(),
        };
        let outcome = resolve::resolve(
            input,
            &tokens,
            &candidates,
            &self.tables,
            &self.cues,
            ctx,
            store,
        );
        tracing::debug!(
            "Resolved input to a {} outcome (confidence {:?})",
            outcome.type_name(),
            outcome.confidence()
        );
        outcome
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
