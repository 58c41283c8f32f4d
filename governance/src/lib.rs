//! Agora Governance Module
//!
//! Implements the on-ledger decision-making engine: a checkpointed
//! voting-power ledger with historical lookup, delegation of power between
//! accounts, the proposal lifecycle state machine, and the timelocked
//! execution queue. Voting and delegation can also be authorized off-band
//! through signed messages.

pub mod checkpoint;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod events;
pub mod proposal;
pub mod signature;
pub mod timelock;

pub use checkpoint::{Checkpoint, CheckpointLedger, Height, Timestamp};
pub use delegation::{DelegationOutcome, DelegationRegistry, PowerMovement};
pub use engine::{ActionInvoker, GovernanceEngine, GovernanceParams, NoopInvoker};
pub use error::{ErrorKind, GovernanceError, Result};
pub use events::GovernanceEvent;
pub use proposal::{Proposal, ProposalAction, ProposalState, Receipt, VoteChoice};
pub use signature::{SignedDelegation, SignedVote};
pub use timelock::{action_hash, TimelockQueue};

/// Account identifier: a derived address string. The empty string is the
/// zero address and is rejected wherever an address is required.
pub type Address = String;

/// Governance configuration defaults
pub mod config {
    /// Delay between proposal creation and the start of voting (ledger heights)
    pub const VOTING_DELAY: u64 = 1;

    /// Length of the voting window (ledger heights)
    pub const VOTING_PERIOD: u64 = 17_280;

    /// Minimum voting power required to submit a proposal
    pub const PROPOSAL_THRESHOLD: u64 = 100_000;

    /// Minimum `for` votes required for a proposal to succeed
    pub const QUORUM_VOTES: u64 = 4_000_000;

    /// Delay between queuing and earliest execution (seconds)
    pub const TIMELOCK_DELAY: u64 = 172_800;

    /// Window after the eta during which execution stays possible (seconds)
    pub const GRACE_PERIOD: u64 = 1_209_600;

    /// Maximum number of actions in a single proposal
    pub const MAX_ACTIONS: usize = 10;
}
