use std::collections::HashSet;

use crate::{ActionQueue, Identifier};

/// Where an excluded identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionSource {
    /// Accounts the target already has a relationship with.
    Relationships,
    /// Identifiers already recorded in the append log.
    Processed,
    /// Identifiers computed as rejects by an earlier run.
    Rejected,
    /// Operator whitelist.
    Whitelisted,
}

/// Union of every identifier that must not be acted on in this run.
///
/// Built fresh per invocation from durable state.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    members: HashSet<Identifier>,
    per_source: [usize; 4],
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds all identifiers from one source. Returns how many were new to the set.
    pub fn extend<I, S>(&mut self, source: ExclusionSource, identifiers: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<Identifier>,
    {
        let mut added = 0;
        for identifier in identifiers {
            if self.members.insert(identifier.into()) {
                added += 1;
            }
        }
        self.per_source[source_index(source)] += added;
        added
    }

    pub fn with<I, S>(mut self, source: ExclusionSource, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Identifier>,
    {
        self.extend(source, identifiers);
        self
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.members.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Identifiers first contributed by `source` (later duplicates count toward the earlier source).
    pub fn contributed_by(&self, source: ExclusionSource) -> usize {
        self.per_source[source_index(source)]
    }

    /// Removes excluded identifiers from `candidates`, dropping duplicates.
    ///
    /// Each surviving identifier carries the index of its first appearance in
    /// `candidates` as its ordinal.
    pub fn filter<I, S>(&self, candidates: I) -> ActionQueue
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut queue = ActionQueue::new();
        for (ordinal, candidate) in candidates.into_iter().enumerate() {
            let candidate = candidate.as_ref();
            if !seen.insert(candidate.to_owned()) || self.contains(candidate) {
                continue;
            }
            queue.push(candidate, ordinal);
        }
        queue
    }
}

fn source_index(source: ExclusionSource) -> usize {
    match source {
        ExclusionSource::Relationships => 0,
        ExclusionSource::Processed => 1,
        ExclusionSource::Rejected => 2,
        ExclusionSource::Whitelisted => 3,
    }
}

/// Drops repeated identifiers, keeping first-seen order.
pub fn unique_in_order<I, S>(identifiers: I) -> Vec<Identifier>
where
    I: IntoIterator<Item = S>,
    S: Into<Identifier>,
{
    let mut seen = HashSet::new();
    identifiers
        .into_iter()
        .map(Into::into)
        .filter(|identifier: &Identifier| seen.insert(identifier.clone()))
        .collect()
}
