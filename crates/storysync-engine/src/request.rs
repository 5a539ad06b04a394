//! Typed batch mutations and their keyed results.

use serde::Serialize;
use std::collections::HashMap;
use storysync_domain::{ItemKind, ItemState};

/// One mutation in a batch request. Variants carry everything the
/// transport needs to serialize them; no wire strings leak above it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchOperation {
    CreateDraftItem {
        board_id: String,
        title: String,
        body: String,
    },
    UpdateDraftItem {
        draft_id: String,
        title: String,
        body: String,
        state: ItemState,
    },
    SetItemText {
        board_id: String,
        item_id: String,
        field_id: String,
        text: String,
    },
    SetItemOption {
        board_id: String,
        item_id: String,
        field_id: String,
        option_id: String,
    },
    SetItemState {
        target_id: String,
        kind: ItemKind,
        state: ItemState,
    },
    UpdateCard {
        card_id: String,
        note: String,
        archived: bool,
    },
}

/// A batch operation with the response key it will be reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasedOperation {
    pub alias: String,
    pub op: BatchOperation,
}

impl AliasedOperation {
    pub fn new(alias: impl Into<String>, op: BatchOperation) -> Self {
        Self {
            alias: alias.into(),
            op,
        }
    }
}

/// Batch response: alias → id of the item the mutation produced or
/// touched, when the response carries one. Every dispatched alias must be
/// present or the round is treated as failed by the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    results: HashMap<String, Option<String>>,
}

impl BatchOutcome {
    pub fn insert(&mut self, alias: impl Into<String>, item_id: Option<String>) {
        self.results.insert(alias.into(), item_id);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.results.contains_key(alias)
    }

    /// Id returned for an alias, when the response carried one.
    pub fn item_id(&self, alias: &str) -> Option<&str> {
        self.results.get(alias).and_then(|id| id.as_deref())
    }
}
