use serde::{Deserialize, Serialize};

use crate::{Identifier, Ordinal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAction {
    pub identifier: Identifier,
    pub ordinal: Ordinal,
}

/// Ordered work list for the executor. Ordinals are strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionQueue {
    actions: Vec<QueuedAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action. Returns `false` and leaves the queue untouched when
    /// `ordinal` does not exceed the last queued ordinal.
    pub fn push(&mut self, identifier: impl Into<Identifier>, ordinal: Ordinal) -> bool {
        if let Some(last) = self.actions.last() {
            if ordinal <= last.ordinal {
                return false;
            }
        }
        self.actions.push(QueuedAction {
            identifier: identifier.into(),
            ordinal,
        });
        true
    }

    /// Keep only the first `count` actions.
    pub fn truncate(&mut self, count: usize) {
        self.actions.truncate(count);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueuedAction> {
        self.actions.iter()
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.actions
            .iter()
            .map(|action| action.identifier.as_str())
            .collect()
    }
}

impl<'a> IntoIterator for &'a ActionQueue {
    type Item = &'a QueuedAction;
    type IntoIter = std::slice::Iter<'a, QueuedAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
