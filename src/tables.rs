//! Immutable rule tables driving classification and canonicalization
//!
//! Tables are plain data injected into the engine at construction time.
//! Built-in defaults cover the stock verb set; deployments can extend or
//! replace them from TOML without recompiling.

use crate::types::Intent;
use ahash::AHashSet;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating rule tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to parse rule tables: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid rule tables: {0}")]
    Invalid(String),
}

/// One verb entry: a canonical verb, the intent it resolves to, and its
/// registered synonyms
///
/// The same synonym may appear under several entries; the classifier then
/// produces one candidate per entry and the resolver asks the user.
#[derive(Debug, Clone, Deserialize)]
pub struct VerbEntry {
    pub canonical: String,
    pub intent: Intent,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl VerbEntry {
    pub fn new(canonical: &str, intent: Intent, synonyms: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            intent,
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The complete rule-table set consumed by the engine
#[derive(Debug, Clone, Deserialize)]
pub struct RuleTables {
    #[serde(default = "default_verbs")]
    pub verbs: Vec<VerbEntry>,
    #[serde(default = "default_politeness_prefixes")]
    pub politeness_prefixes: Vec<String>,
    #[serde(default = "default_temporal_cues")]
    pub temporal_cues: Vec<String>,
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
    #[serde(default = "default_high_priority_cues")]
    pub high_priority_cues: Vec<String>,
    #[serde(default = "default_low_priority_cues")]
    pub low_priority_cues: Vec<String>,
    #[serde(default = "default_boolean_flags")]
    pub boolean_flags: Vec<String>,
    #[serde(default = "default_conflicting_flags")]
    pub conflicting_flags: Vec<(String, String)>,
    #[serde(default = "default_shopping_cues")]
    pub shopping_cues: Vec<String>,
}

fn default_verbs() -> Vec<VerbEntry> {
    vec![
        VerbEntry::new("add", Intent::Add, &["create", "new", "make", "a"]),
        VerbEntry::new("delete", Intent::Delete, &["remove", "rm", "del", "d"]),
        VerbEntry::new("update", Intent::Update, &["edit", "modify", "change"]),
        VerbEntry::new("list", Intent::List, &["ls", "show", "view", "l", "v"]),
        VerbEntry::new("complete", Intent::Complete, &["done", "finish", "check"]),
        VerbEntry::new("incomplete", Intent::Incomplete, &["undone", "uncheck", "reopen"]),
        VerbEntry::new("help", Intent::Help, &["h", "?"]),
    ]
}

fn default_politeness_prefixes() -> Vec<String> {
    to_strings(&[
        "please",
        "remind me to",
        "remind me",
        "could you",
        "can you",
        "kindly",
        "i need to",
        "i want to",
    ])
}

fn default_temporal_cues() -> Vec<String> {
    to_strings(&[
        "today",
        "tomorrow",
        "tonight",
        "before",
        "after",
        "by",
        "until",
        "next",
        "every",
    ])
}

fn default_stop_words() -> Vec<String> {
    to_strings(&["the", "a", "an"])
}

fn default_high_priority_cues() -> Vec<String> {
    to_strings(&[
        "urgent",
        "asap",
        "immediately",
        "emergency",
        "critical",
        "important",
    ])
}

fn default_low_priority_cues() -> Vec<String> {
    to_strings(&["whenever", "optional", "maybe", "if possible", "low priority"])
}

fn default_boolean_flags() -> Vec<String> {
    to_strings(&["force", "dry-run", "start", "stop", "all", "quiet", "verbose"])
}

fn default_conflicting_flags() -> Vec<(String, String)> {
    vec![
        ("force".to_string(), "dry-run".to_string()),
        ("start".to_string(), "stop".to_string()),
    ]
}

fn default_shopping_cues() -> Vec<String> {
    to_strings(&["🛒", "shopping", "groceries", "grocery"])
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RuleTables {
    fn default() -> Self {
        Self {
            verbs: default_verbs(),
            politeness_prefixes: default_politeness_prefixes(),
            temporal_cues: default_temporal_cues(),
            stop_words: default_stop_words(),
            high_priority_cues: default_high_priority_cues(),
            low_priority_cues: default_low_priority_cues(),
            boolean_flags: default_boolean_flags(),
            conflicting_flags: default_conflicting_flags(),
            shopping_cues: default_shopping_cues(),
        }
    }
}

impl RuleTables {
    /// Load tables from TOML; omitted sections fall back to the defaults
    pub fn from_toml_str(text: &str) -> Result<Self, TableError> {
        let mut tables: RuleTables = toml::from_str(text)?;
        tables.normalize_terms();
        tables.validate()?;
        Ok(tables)
    }

    /// Check structural invariants: at least one verb, lowercase unique
    /// canonicals, no reserved intents, no empty terms
    pub fn validate(&self) -> Result<(), TableError> {
        if self.verbs.is_empty() {
            return Err(TableError::Invalid("verb table is empty".to_string()));
        }
        let mut seen: AHashSet<&str> = AHashSet::new();
        for entry in &self.verbs {
            if entry.canonical.is_empty() {
                return Err(TableError::Invalid("empty canonical verb".to_string()));
            }
            if entry.intent == Intent::Unknown {
                return Err(TableError::Invalid(format!(
                    "verb '{}' maps to the reserved intent 'unknown'",
                    entry.canonical
                )));
            }
            if !seen.insert(entry.canonical.as_str()) {
                return Err(TableError::Invalid(format!(
                    "duplicate canonical verb '{}'",
                    entry.canonical
                )));
            }
            if entry.synonyms.iter().any(|s| s.is_empty()) {
                return Err(TableError::Invalid(format!(
                    "verb '{}' has an empty synonym",
                    entry.canonical
                )));
            }
        }
        Ok(())
    }

    /// Lowercase every matchable term so comparisons stay byte-equal
    pub(crate) fn normalize_terms(&mut self) {
        for entry in &mut self.verbs {
            entry.canonical = entry.canonical.to_lowercase();
            for synonym in &mut entry.synonyms {
                *synonym = synonym.to_lowercase();
            }
        }
        lowercase_all(&mut self.politeness_prefixes);
        lowercase_all(&mut self.temporal_cues);
        lowercase_all(&mut self.stop_words);
        lowercase_all(&mut self.high_priority_cues);
        lowercase_all(&mut self.low_priority_cues);
        lowercase_all(&mut self.boolean_flags);
        for (a, b) in &mut self.conflicting_flags {
            *a = a.to_lowercase();
            *b = b.to_lowercase();
        }
        lowercase_all(&mut self.shopping_cues);
    }

    /// Whether a lowercased word is a registered canonical verb or synonym
    pub fn is_verb_term(&self, word: &str) -> bool {
        self.verbs.iter().any(|entry| {
            entry.canonical == word || entry.synonyms.iter().any(|s| s == word)
        })
    }

    /// Resolve a lowercased word to an intent through canonicals and
    /// synonyms, first entry wins
    pub fn lookup_verb(&self, word: &str) -> Option<Intent> {
        self.verbs
            .iter()
            .find(|entry| entry.canonical == word || entry.synonyms.iter().any(|s| s == word))
            .map(|entry| entry.intent)
    }
}

fn lowercase_all(items: &mut [String]) {
    for item in items {
        *item = item.to_lowercase();
    }
}

/// Hash-set views over the list-shaped tables, built once per engine
pub struct CueIndex {
    pub boolean_flags: AHashSet<String>,
    pub stop_words: AHashSet<String>,
    pub shopping_cues: AHashSet<String>,
}

impl CueIndex {
    pub fn new(tables: &RuleTables) -> Self {
        Self {
            boolean_flags: tables.boolean_flags.iter().cloned().collect(),
            stop_words: tables.stop_words.iter().cloned().collect(),
            shopping_cues: tables.shopping_cues.iter().cloned().collect(),
        }
    }
}
