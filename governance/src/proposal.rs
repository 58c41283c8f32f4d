//! Proposal records and lifecycle derivation

use crate::checkpoint::{Height, Timestamp};
use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

/// Lifecycle states, derived on demand from the stored record plus the
/// current height and wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
}

/// One scheduled external call: invoke `target` with `value` and an opaque
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAction {
    pub target: Address,
    pub value: u64,
    pub payload: Vec<u8>,
}

/// Record of one voter's participation in one proposal. Written once,
/// immutable thereafter; map presence is the has-voted flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub choice: VoteChoice,
    pub weight: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    /// Voting opens after this height (exclusive).
    pub start_height: Height,
    /// Voting closes after this height (inclusive).
    pub end_height: Height,
    pub for_votes: u64,
    pub against_votes: u64,
    pub abstain_votes: u64,
    pub canceled: bool,
    pub executed: bool,
    /// Scheduled execution time, or zero while unqueued. Set exactly once.
    pub eta: Timestamp,
    pub actions: Vec<ProposalAction>,
    /// SHA-256 hex digest of the description; the full text lives in the
    /// creation event only.
    pub description_digest: String,
    pub receipts: HashMap<Address, Receipt>,
}

impl Proposal {
    /// Derive the lifecycle state. Evaluation order is fixed: terminal flags
    /// first, then the height-gated window, then tally and timelock checks.
    pub fn state(
        &self,
        quorum_votes: u64,
        height: Height,
        now: Timestamp,
        grace_period: u64,
    ) -> ProposalState {
        if self.canceled {
            ProposalState::Canceled
        } else if self.executed {
            ProposalState::Executed
        } else if height <= self.start_height {
            ProposalState::Pending
        } else if height <= self.end_height {
            ProposalState::Active
        } else if self.for_votes <= self.against_votes || self.for_votes < quorum_votes {
            ProposalState::Defeated
        } else if self.eta == 0 {
            ProposalState::Succeeded
        } else if now >= self.eta.saturating_add(grace_period) {
            ProposalState::Expired
        } else {
            ProposalState::Queued
        }
    }

    pub fn receipt(&self, voter: &str) -> Option<&Receipt> {
        self.receipts.get(voter)
    }

    pub fn has_voted(&self, voter: &str) -> bool {
        self.receipts.contains_key(voter)
    }

    /// Apply a vote to the tallies and record the receipt. Callers are
    /// responsible for the Active-state and duplicate checks.
    pub(crate) fn record_vote(&mut self, voter: &str, choice: VoteChoice, weight: u64) {
        match choice {
            VoteChoice::For => self.for_votes = self.for_votes.saturating_add(weight),
            VoteChoice::Against => self.against_votes = self.against_votes.saturating_add(weight),
            VoteChoice::Abstain => self.abstain_votes = self.abstain_votes.saturating_add(weight),
        }
        self.receipts
            .insert(voter.to_string(), Receipt { choice, weight });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proposal() -> Proposal {
        Proposal {
            id: 1,
            proposer: "alice".to_string(),
            start_height: 10,
            end_height: 20,
            for_votes: 0,
            against_votes: 0,
            abstain_votes: 0,
            canceled: false,
            executed: false,
            eta: 0,
            actions: vec![ProposalAction {
                target: "treasury".to_string(),
                value: 100,
                payload: vec![1, 2, 3],
            }],
            description_digest: agora_crypto::hash_sha256_hex(b"test"),
            receipts: HashMap::new(),
        }
    }

    #[test]
    fn test_state_pending_then_active() {
        let proposal = sample_proposal();

        assert_eq!(proposal.state(100, 5, 0, 1000), ProposalState::Pending);
        assert_eq!(proposal.state(100, 10, 0, 1000), ProposalState::Pending);
        assert_eq!(proposal.state(100, 11, 0, 1000), ProposalState::Active);
        assert_eq!(proposal.state(100, 20, 0, 1000), ProposalState::Active);
    }

    #[test]
    fn test_state_defeated_on_majority_or_quorum() {
        let mut proposal = sample_proposal();

        // No votes at all: defeated after the window
        assert_eq!(proposal.state(100, 21, 0, 1000), ProposalState::Defeated);

        // Majority reached but quorum missed
        proposal.for_votes = 60;
        proposal.against_votes = 40;
        assert_eq!(proposal.state(100, 21, 0, 1000), ProposalState::Defeated);

        // Tie is a defeat
        proposal.for_votes = 100;
        proposal.against_votes = 100;
        assert_eq!(proposal.state(100, 21, 0, 1000), ProposalState::Defeated);

        // Quorum and majority both reached
        proposal.for_votes = 150;
        proposal.against_votes = 40;
        assert_eq!(proposal.state(100, 21, 0, 1000), ProposalState::Succeeded);
    }

    #[test]
    fn test_abstain_votes_do_not_count_toward_quorum() {
        let mut proposal = sample_proposal();
        proposal.for_votes = 90;
        proposal.against_votes = 10;
        proposal.abstain_votes = 500;

        // 90 for-votes is below the quorum of 100 no matter how many abstain
        assert_eq!(proposal.state(100, 21, 0, 1000), ProposalState::Defeated);
    }

    #[test]
    fn test_state_queued_and_expired() {
        let mut proposal = sample_proposal();
        proposal.for_votes = 150;
        proposal.eta = 5_000;

        assert_eq!(proposal.state(100, 21, 5_500, 1000), ProposalState::Queued);
        assert_eq!(proposal.state(100, 21, 5_999, 1000), ProposalState::Queued);
        assert_eq!(proposal.state(100, 21, 6_000, 1000), ProposalState::Expired);
    }

    #[test]
    fn test_terminal_flags_take_priority() {
        let mut proposal = sample_proposal();
        proposal.for_votes = 150;
        proposal.eta = 5_000;

        proposal.canceled = true;
        assert_eq!(proposal.state(100, 21, 5_500, 1000), ProposalState::Canceled);

        proposal.canceled = false;
        proposal.executed = true;
        assert_eq!(proposal.state(100, 5, 0, 1000), ProposalState::Executed);
    }

    #[test]
    fn test_record_vote_updates_tally_and_receipt() {
        let mut proposal = sample_proposal();

        proposal.record_vote("bob", VoteChoice::For, 500);
        proposal.record_vote("carol", VoteChoice::Abstain, 70);

        assert_eq!(proposal.for_votes, 500);
        assert_eq!(proposal.abstain_votes, 70);
        assert!(proposal.has_voted("bob"));
        assert_eq!(
            proposal.receipt("carol"),
            Some(&Receipt {
                choice: VoteChoice::Abstain,
                weight: 70
            })
        );
        assert!(proposal.receipt("dave").is_none());
    }
}
