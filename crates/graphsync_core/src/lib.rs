//! Graphsync core: pure data model and selection policy, no IO.
mod batch;
mod exclusion;
mod policy;
mod queue;

pub use batch::{plan_batches, MAX_LOOKUP_BATCH};
pub use exclusion::{unique_in_order, ExclusionSet, ExclusionSource};
pub use policy::{Relationship, UnfollowCandidate, UnfollowPolicy, FOLLOWED_BY};
pub use queue::{ActionQueue, QueuedAction};

/// Stable account handle. Compared exactly; the remote API returns a canonical form.
pub type Identifier = String;

/// Zero-based rank of an identifier in discovery order.
pub type Ordinal = usize;
