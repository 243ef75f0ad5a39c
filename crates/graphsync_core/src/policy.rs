use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{ActionQueue, Identifier, Ordinal};

/// Connection marker meaning the other account follows us back.
pub const FOLLOWED_BY: &str = "followed_by";

/// Relationship status of one account as reported by a batch lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub identifier: Identifier,
    #[serde(default)]
    pub connections: Vec<String>,
}

impl Relationship {
    pub fn is_reciprocated(&self) -> bool {
        self.connections.iter().any(|c| c == FOLLOWED_BY)
    }
}

/// An account selected for unfollowing, as persisted in the per-run candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfollowCandidate {
    pub identifier: Identifier,
    pub ordinal: Ordinal,
    #[serde(default)]
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnfollowPolicy {
    /// Ordinals at or below this value are never selected. The remote list is
    /// newest first, so this guards recently followed accounts.
    pub protect_recent: Ordinal,
}

impl Default for UnfollowPolicy {
    fn default() -> Self {
        Self { protect_recent: 60 }
    }
}

impl UnfollowPolicy {
    /// Picks the accounts to unfollow.
    ///
    /// `following` is the full followed list in fetch order and defines each
    /// account's ordinal. Accounts with no entry in `relationships` are skipped.
    pub fn select(
        &self,
        following: &[Identifier],
        relationships: &[Relationship],
        whitelist: &HashSet<Identifier>,
    ) -> Vec<UnfollowCandidate> {
        let by_identifier: HashMap<&str, &Relationship> = relationships
            .iter()
            .map(|relationship| (relationship.identifier.as_str(), relationship))
            .collect();

        following
            .iter()
            .enumerate()
            .filter(|(ordinal, _)| *ordinal > self.protect_recent)
            .filter(|(_, identifier)| !whitelist.contains(identifier.as_str()))
            .filter_map(|(ordinal, identifier)| {
                let relationship = by_identifier.get(identifier.as_str())?;
                if relationship.is_reciprocated() {
                    return None;
                }
                Some(UnfollowCandidate {
                    identifier: identifier.clone(),
                    ordinal,
                    connections: relationship.connections.clone(),
                })
            })
            .collect()
    }
}

impl FromIterator<UnfollowCandidate> for ActionQueue {
    fn from_iter<T: IntoIterator<Item = UnfollowCandidate>>(iter: T) -> Self {
        let mut queue = ActionQueue::new();
        for candidate in iter {
            queue.push(candidate.identifier, candidate.ordinal);
        }
        queue
    }
}
