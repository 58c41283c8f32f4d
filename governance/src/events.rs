//! Observable governance events
//!
//! Emitted for off-chain indexing; not required for correctness. Events are
//! buffered by the engine and only appear once the emitting operation has
//! committed.

use crate::checkpoint::{Height, Timestamp};
use crate::proposal::{ProposalAction, VoteChoice};
use crate::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceEvent {
    ProposalCreated {
        id: u64,
        proposer: Address,
        actions: Vec<ProposalAction>,
        start_height: Height,
        end_height: Height,
        /// Full description text; only its digest is kept on-ledger.
        description: String,
    },
    VoteCast {
        voter: Address,
        proposal_id: u64,
        choice: VoteChoice,
        weight: u64,
        reason: Option<String>,
    },
    ProposalCanceled {
        id: u64,
    },
    ProposalQueued {
        id: u64,
        eta: Timestamp,
    },
    ProposalExecuted {
        id: u64,
    },
    DelegateChanged {
        delegator: Address,
        previous: Option<Address>,
        current: Option<Address>,
    },
    DelegatePowerChanged {
        delegate: Address,
        previous: u64,
        current: u64,
    },
    ActionQueued {
        proposal_id: u64,
        hash: String,
        target: Address,
        value: u64,
        eta: Timestamp,
    },
    ActionExecuted {
        proposal_id: u64,
        hash: String,
        target: Address,
        value: u64,
    },
    ActionCanceled {
        proposal_id: u64,
        hash: String,
    },
    GuardianChanged {
        previous: Option<Address>,
        current: Option<Address>,
    },
}
