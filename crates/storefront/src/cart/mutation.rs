//! Per-product mutation lifecycle.
//!
//! Each product key has at most one pending mutation. A newer mutation for
//! the same key replaces the older one; the older one's response, when it
//! arrives, no longer matches and is discarded.
//!
//! ```text
//! Idle --issue--> Pending(seq) --response(seq) ok--> Committed
//!                    |         --response(seq) err-> RolledBack
//!                    +--issue--> Pending(seq') (older responses now stale)
//! ```
//!
//! Cart writes carry every pending intent, so a rolled-back intent may still
//! reach the backend inside another product's request. [`Reverted`] keeps
//! the tag range of a rolled-back chain so such a response can be undone.

use std::collections::HashMap;

use shopline_core::{ProductId, Quantity};

/// What a mutation wants a line to become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Set(Quantity),
    Remove,
}

/// The latest in-flight mutation for one product key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Monotonic issue tag; the response carrying it is the only one allowed
    /// to settle this entry.
    pub seq: u64,
    /// Tag of the first mutation in this chain.
    pub since: u64,
    pub intent: Intent,
    /// Confirmed quantity before the first optimistic change in this chain;
    /// rollback restores it.
    pub previous: Option<Quantity>,
}

impl PendingMutation {
    /// Start a chain for a key with no pending mutation.
    #[must_use]
    pub const fn new(seq: u64, intent: Intent, previous: Option<Quantity>) -> Self {
        Self {
            seq,
            since: seq,
            intent,
            previous,
        }
    }

    /// Replace this mutation with a newer one for the same key.
    ///
    /// The pre-optimistic value carries over, so a rollback of the newer
    /// mutation returns to what the user saw before either was issued.
    #[must_use]
    pub const fn supersede(&self, seq: u64, intent: Intent) -> Self {
        Self {
            seq,
            since: self.since,
            intent,
            previous: self.previous,
        }
    }
}

/// A chain of mutations for one product that was rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reverted {
    since: u64,
    until: u64,
    /// Quantity the line was restored to.
    pub restore: Option<Quantity>,
}

impl Reverted {
    /// Record the rollback of `mutation`, whose latest tag was `seq`.
    #[must_use]
    pub const fn of(mutation: &PendingMutation, seq: u64) -> Self {
        Self {
            since: mutation.since,
            until: seq,
            restore: mutation.previous,
        }
    }

    /// Whether an intent tagged `seq` belonged to the rolled-back chain.
    #[must_use]
    pub const fn covers(&self, seq: u64) -> bool {
        self.since <= seq && seq <= self.until
    }
}

/// Result of a cart mutation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The backend confirmed this mutation and its response was applied.
    Committed,
    /// A newer mutation for the same product was issued before this one's
    /// response arrived; the response was discarded.
    Superseded,
    /// Nothing to do (unknown line, or the quantity would not change). No
    /// request was sent.
    Unchanged,
}

impl MutationOutcome {
    #[must_use]
    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Take the pending entry for `product_id` if `seq` is still its latest
/// mutation. `None` means the response is stale.
pub fn take_current(
    pending: &mut HashMap<ProductId, PendingMutation>,
    product_id: &ProductId,
    seq: u64,
) -> Option<PendingMutation> {
    if pending.get(product_id).is_some_and(|m| m.seq == seq) {
        pending.remove(product_id)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_supersede_keeps_first_previous() {
        let first = PendingMutation::new(1, Intent::Set(Quantity::new(4).unwrap()), Some(Quantity::new(3).unwrap()));
        let second = first.supersede(2, Intent::Set(Quantity::new(5).unwrap()));

        assert_eq!(second.seq, 2);
        assert_eq!(second.since, 1);
        assert_eq!(second.previous, Some(Quantity::new(3).unwrap()));
    }

    #[test]
    fn test_reverted_covers_whole_chain() {
        let first = PendingMutation::new(4, Intent::Remove, Some(Quantity::ONE));
        let last = first.supersede(9, Intent::Set(Quantity::new(2).unwrap()));

        let reverted = Reverted::of(&last, 9);

        assert_eq!(reverted.restore, Some(Quantity::ONE));
        assert!(!reverted.covers(3));
        assert!(reverted.covers(4));
        assert!(reverted.covers(7));
        assert!(reverted.covers(9));
        assert!(!reverted.covers(10));
    }

    #[test]
    fn test_take_current_rejects_stale_seq() {
        let id = ProductId::new("p1");
        let mut pending = HashMap::new();
        pending.insert(id.clone(), PendingMutation::new(2, Intent::Remove, None));

        assert!(take_current(&mut pending, &id, 1).is_none());
        assert!(pending.contains_key(&id));

        assert!(take_current(&mut pending, &id, 2).is_some());
        assert!(pending.is_empty());

        // Already settled
        assert!(take_current(&mut pending, &id, 2).is_none());
    }
}
