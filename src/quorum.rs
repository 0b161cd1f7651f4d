//! Fault tolerance and claim threshold of a watchtower committee.
//!
//! Watchtowers never talk to each other. Each one forwards the claim it holds
//! and the tally only counts distinct committee indices, so the outcome does
//! not depend on the order in which claims arrive.

use alloc::{vec, vec::Vec};
use core::fmt::Display;

/// Index of a watchtower within its channel's committee, `0..n`.
pub type WatchtowerIdx = usize;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QuorumError {
    /// A committee needs at least one member.
    EmptyCommittee,
}

impl Display for QuorumError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            QuorumError::EmptyCommittee => f.write_str("watchtower committee is empty"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ClaimError {
    IndexOutOfRange {
        index: WatchtowerIdx,
        committee_size: usize,
    },
}

impl Display for ClaimError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ClaimError::IndexOutOfRange {
                index,
                committee_size,
            } => write!(
                f,
                "watchtower index {} outside of committee of size {}",
                index, committee_size
            ),
        }
    }
}

/// Quorum parameters derived from the committee size `n`.
///
/// Only `n` is stored, `f` and `t` are recomputed on access.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Quorum {
    n: usize,
}

impl Quorum {
    pub fn new(n: usize) -> Result<Self, QuorumError> {
        if n == 0 {
            Err(QuorumError::EmptyCommittee)
        } else {
            Ok(Quorum { n })
        }
    }

    pub fn committee_size(&self) -> usize {
        self.n
    }

    /// `f = floor((n-1)/3)`, the number of faulty watchtowers tolerated.
    pub fn max_faulty(&self) -> usize {
        (self.n - 1) / 3
    }

    /// `t = min(2f+1, n)`, the number of distinct claims needed to force a
    /// pessimistic close.
    pub fn threshold(&self) -> usize {
        core::cmp::min(2 * self.max_faulty() + 1, self.n)
    }
}

/// Result of recording a claim.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ClaimOutcome {
    /// First claim of this index, `count` distinct indices so far.
    Counted { count: usize },
    /// This index already claimed, nothing changed.
    Duplicate,
}

/// Distinct watchtower claims received for one channel.
#[derive(Debug, Clone)]
pub struct ClaimTally {
    quorum: Quorum,
    claimed: Vec<bool>,
    count: usize,
    max_revision: Option<u16>,
}

impl ClaimTally {
    pub fn new(quorum: Quorum) -> Self {
        ClaimTally {
            quorum,
            claimed: vec![false; quorum.committee_size()],
            count: 0,
            max_revision: None,
        }
    }

    pub fn quorum(&self) -> Quorum {
        self.quorum
    }

    /// Record the claim of watchtower `index` for `revision`.
    ///
    /// A second claim from the same index is a no-op, it neither counts again
    /// nor changes the highest revision seen.
    pub fn record(
        &mut self,
        index: WatchtowerIdx,
        revision: u16,
    ) -> Result<ClaimOutcome, ClaimError> {
        let slot = self
            .claimed
            .get_mut(index)
            .ok_or(ClaimError::IndexOutOfRange {
                index,
                committee_size: self.quorum.committee_size(),
            })?;
        if *slot {
            return Ok(ClaimOutcome::Duplicate);
        }
        *slot = true;
        self.count += 1;
        self.max_revision = Some(match self.max_revision {
            Some(r) => r.max(revision),
            None => revision,
        });
        Ok(ClaimOutcome::Counted { count: self.count })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn has_claimed(&self, index: WatchtowerIdx) -> bool {
        self.claimed.get(index).copied().unwrap_or(false)
    }

    /// Highest revision among all counted claims.
    pub fn max_revision(&self) -> Option<u16> {
        self.max_revision
    }

    pub fn is_reached(&self) -> bool {
        self.count >= self.quorum.threshold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_table() {
        for (n, f, t) in [(10, 3, 7), (13, 4, 9), (16, 5, 11), (25, 8, 17), (2, 0, 1), (1, 0, 1)] {
            let q = Quorum::new(n).unwrap();
            assert_eq!(q.max_faulty(), f, "f for n={}", n);
            assert_eq!(q.threshold(), t, "t for n={}", n);
        }
    }

    #[test]
    fn threshold_formula_holds_and_never_exceeds_n() {
        for n in 1..200 {
            let q = Quorum::new(n).unwrap();
            assert_eq!(q.max_faulty(), (n - 1) / 3);
            assert_eq!(q.threshold(), core::cmp::min(2 * q.max_faulty() + 1, n));
            assert!(q.threshold() <= n);
            // Even with f faulty watchtowers withholding, t honest ones remain.
            assert!(q.threshold() <= n - q.max_faulty());
        }
    }

    #[test]
    fn empty_committee() {
        assert_eq!(Quorum::new(0), Err(QuorumError::EmptyCommittee));
    }

    #[test]
    fn duplicate_claim_counts_once() {
        let mut tally = ClaimTally::new(Quorum::new(4).unwrap());
        assert_eq!(tally.record(2, 3), Ok(ClaimOutcome::Counted { count: 1 }));
        assert_eq!(tally.record(2, 9), Ok(ClaimOutcome::Duplicate));
        assert_eq!(tally.count(), 1);
        assert_eq!(tally.max_revision(), Some(3));
    }

    #[test]
    fn out_of_range_index() {
        let mut tally = ClaimTally::new(Quorum::new(4).unwrap());
        assert_eq!(
            tally.record(4, 1),
            Err(ClaimError::IndexOutOfRange {
                index: 4,
                committee_size: 4
            })
        );
        assert_eq!(tally.count(), 0);
    }

    #[test]
    fn order_of_claims_does_not_matter() {
        let q = Quorum::new(10).unwrap();
        let claims = [(6, 2), (0, 5), (3, 4), (9, 1), (1, 5), (4, 3), (2, 2)];

        let mut forward = ClaimTally::new(q);
        for (idx, rev) in claims {
            forward.record(idx, rev).unwrap();
        }
        let mut backward = ClaimTally::new(q);
        for (idx, rev) in claims.iter().rev() {
            backward.record(*idx, *rev).unwrap();
        }

        assert_eq!(forward.count(), backward.count());
        assert_eq!(forward.max_revision(), backward.max_revision());
        assert_eq!(forward.max_revision(), Some(5));
        assert!(forward.is_reached() && backward.is_reached());
    }

    #[test]
    fn reached_exactly_at_threshold() {
        let q = Quorum::new(13).unwrap();
        let mut tally = ClaimTally::new(q);
        for i in 0..q.threshold() - 1 {
            tally.record(i, 1).unwrap();
            assert!(!tally.is_reached());
        }
        tally.record(12, 1).unwrap();
        assert!(tally.is_reached());
    }
}
