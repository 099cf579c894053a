use std::sync::Arc;

use dashmap::DashSet;
use specter_graphql::{TypeKind, TypeRef};

use crate::matchers;

/// A concurrent string set. Probe workers insert while the orchestrator
/// reads snapshots between jobs.
#[derive(Debug, Default)]
pub struct WordSet(DashSet<String>);

impl WordSet {
    pub fn new() -> WordSet {
        WordSet::default()
    }

    pub fn seeded<I, S>(values: I) -> WordSet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = WordSet::new();
        for value in values {
            set.add(value.into());
        }
        set
    }

    pub fn add(&self, value: impl Into<String>) {
        self.0.insert(value.into());
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn values(&self) -> Vec<String> {
        self.0.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The only state shared between the orchestrator and probe workers.
#[derive(Clone)]
pub struct SharedState {
    pub found_words: Arc<WordSet>,
    pub known_scalars: Arc<WordSet>,
    pub known_enums: Arc<WordSet>,
}

impl Default for SharedState {
    fn default() -> Self {
        SharedState {
            found_words: Arc::new(WordSet::new()),
            known_scalars: Arc::new(WordSet::seeded([
                "Float", "String", "Int", "Boolean", "ID",
            ])),
            known_enums: Arc::new(WordSet::new()),
        }
    }
}

impl SharedState {
    pub fn new() -> SharedState {
        SharedState::default()
    }

    /// Records a discovered identifier and its one-shorter prefix, which
    /// feeds the exact-match retry heuristic in later fuzz batches.
    pub fn add_found_word(&self, word: &str) {
        if word.is_empty() {
            return;
        }
        self.found_words.add(word);
        if word.len() > 1 {
            self.found_words.add(&word[..word.len() - 1]);
        }
    }

    pub fn is_known_scalar(&self, type_string: &str) -> bool {
        let root = TypeRef::parse(type_string, TypeKind::Unknown);
        self.known_scalars.contains(root.root_name())
    }

    pub fn is_inferred_scalar(&self, type_string: &str) -> bool {
        let root = TypeRef::parse(type_string, TypeKind::Unknown);
        matchers::scalar_like_name(root.root_name())
    }

    pub fn is_known_or_inferred_scalar(&self, type_string: &str) -> bool {
        self.is_known_scalar(type_string) || self.is_inferred_scalar(type_string)
    }

    pub fn is_known_enum(&self, type_string: &str) -> bool {
        let root = TypeRef::parse(type_string, TypeKind::Unknown);
        self.known_enums.contains(root.root_name())
    }

    pub fn is_inferred_enum(&self, type_string: &str) -> bool {
        let root = TypeRef::parse(type_string, TypeKind::Unknown);
        matchers::enum_like_name(root.root_name())
    }

    pub fn is_known_or_inferred_enum(&self, type_string: &str) -> bool {
        self.is_known_enum(type_string) || self.is_inferred_enum(type_string)
    }
}
