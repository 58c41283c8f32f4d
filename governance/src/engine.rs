//! Governance engine
//!
//! Owns the shared ledger state and exposes every governance operation.
//! Each operation validates fully before its first write, so a rejected call
//! leaves no trace. "Waiting" (for a voting window, for a timelock delay) is
//! expressed as state guards re-evaluated on each call; the engine never
//! blocks. The clock advances only through `set_block`.

use crate::checkpoint::{CheckpointLedger, Height, Timestamp};
use crate::delegation::DelegationRegistry;
use crate::error::{GovernanceError, Result};
use crate::events::GovernanceEvent;
use crate::proposal::{Proposal, ProposalAction, ProposalState, Receipt, VoteChoice};
use crate::signature::{SignedDelegation, SignedVote};
use crate::timelock::{action_hash, TimelockQueue};
use crate::{config, Address};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Deployment parameters. Fixed once the engine is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Delay between proposal creation and the start of voting (heights).
    pub voting_delay: Height,
    /// Length of the voting window (heights).
    pub voting_period: Height,
    /// Minimum voting power required to submit a proposal.
    pub proposal_threshold: u64,
    /// Minimum `for` votes for a proposal to succeed.
    pub quorum_votes: u64,
    /// Delay between queuing and earliest execution (seconds).
    pub timelock_delay: u64,
    /// Window after the eta during which execution stays possible (seconds).
    pub grace_period: u64,
    /// Maximum number of actions in a single proposal.
    pub max_actions: usize,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            voting_delay: config::VOTING_DELAY,
            voting_period: config::VOTING_PERIOD,
            proposal_threshold: config::PROPOSAL_THRESHOLD,
            quorum_votes: config::QUORUM_VOTES,
            timelock_delay: config::TIMELOCK_DELAY,
            grace_period: config::GRACE_PERIOD,
            max_actions: config::MAX_ACTIONS,
        }
    }
}

/// Narrow capability used during execution: call `target` with `value` and an
/// opaque payload, report success or failure. Implementations bridge to the
/// surrounding runtime.
pub trait ActionInvoker {
    fn invoke(&mut self, target: &str, value: u64, payload: &[u8])
        -> std::result::Result<(), String>;
}

/// Invoker that accepts every call. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct NoopInvoker;

impl ActionInvoker for NoopInvoker {
    fn invoke(&mut self, _: &str, _: u64, _: &[u8]) -> std::result::Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceEngine {
    params: GovernanceParams,
    guardian: Option<Address>,
    /// Only this account may report power changes.
    power_oracle: Address,
    height: Height,
    timestamp: Timestamp,
    ledger: CheckpointLedger,
    delegation: DelegationRegistry,
    proposals: BTreeMap<u64, Proposal>,
    proposal_count: u64,
    latest_proposal: HashMap<Address, u64>,
    timelock: TimelockQueue,
    consumed_nonces: HashMap<Address, HashSet<u64>>,
    events: Vec<GovernanceEvent>,
}

impl GovernanceEngine {
    pub fn new(params: GovernanceParams, guardian: Option<Address>, power_oracle: Address) -> Self {
        Self {
            params,
            guardian,
            power_oracle,
            height: 1,
            timestamp: 1,
            ledger: CheckpointLedger::new(),
            delegation: DelegationRegistry::new(),
            proposals: BTreeMap::new(),
            proposal_count: 0,
            latest_proposal: HashMap::new(),
            timelock: TimelockQueue::new(),
            consumed_nonces: HashMap::new(),
            events: Vec::new(),
        }
    }

    // ---- clock -----------------------------------------------------------

    /// Advance the ledger clock. Height and timestamp never move backwards.
    pub fn set_block(&mut self, height: Height, timestamp: Timestamp) -> Result<()> {
        if height < self.height || timestamp < self.timestamp {
            return Err(GovernanceError::InvalidInput(format!(
                "clock regression: height {} -> {}, timestamp {} -> {}",
                self.height, height, self.timestamp, timestamp
            )));
        }
        self.height = height;
        self.timestamp = timestamp;
        Ok(())
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn guardian(&self) -> Option<&str> {
        self.guardian.as_deref()
    }

    // ---- power reporting and delegation ----------------------------------

    /// Record a new total power for `account`, as reported by the staking
    /// collaborator. Last write wins at a given height. The delta flows to
    /// the account's delegate, if any.
    pub fn report_power_change(
        &mut self,
        caller: &str,
        account: &str,
        new_power: u64,
    ) -> Result<()> {
        if caller != self.power_oracle {
            return Err(GovernanceError::Unauthorized(
                "only the power oracle may report power changes".to_string(),
            ));
        }
        if account.is_empty() {
            return Err(GovernanceError::InvalidInput(
                "cannot report power for the zero address".to_string(),
            ));
        }

        let movement =
            self.delegation
                .report_power_change(&mut self.ledger, self.height, account, new_power)?;

        if let Some(movement) = movement {
            log::debug!(
                "power of delegate {} moved {} -> {}",
                movement.delegate,
                movement.previous,
                movement.current
            );
            self.events.push(GovernanceEvent::DelegatePowerChanged {
                delegate: movement.delegate,
                previous: movement.previous,
                current: movement.current,
            });
        }
        Ok(())
    }

    /// Point `delegator`'s voting power at `delegatee` (or clear it with
    /// `None`), moving the reported power between the affected checkpoint
    /// streams.
    pub fn delegate(&mut self, delegator: &str, delegatee: Option<&str>) -> Result<()> {
        if delegator.is_empty() {
            return Err(GovernanceError::InvalidInput(
                "delegator is the zero address".to_string(),
            ));
        }
        if let Some(delegatee) = delegatee {
            if delegatee.is_empty() {
                return Err(GovernanceError::InvalidInput(
                    "delegatee is the zero address".to_string(),
                ));
            }
        }

        let outcome = self
            .delegation
            .delegate(&mut self.ledger, self.height, delegator, delegatee)?;

        log::debug!(
            "{} delegated to {:?} (was {:?})",
            delegator,
            delegatee,
            outcome.previous
        );
        self.events.push(GovernanceEvent::DelegateChanged {
            delegator: delegator.to_string(),
            previous: outcome.previous,
            current: delegatee.map(|d| d.to_string()),
        });
        for movement in outcome.movements {
            self.events.push(GovernanceEvent::DelegatePowerChanged {
                delegate: movement.delegate,
                previous: movement.previous,
                current: movement.current,
            });
        }
        Ok(())
    }

    /// Delegate on behalf of whoever signed the message. Returns the signer.
    pub fn delegate_by_signature(&mut self, signed: &SignedDelegation) -> Result<Address> {
        let signer = signed.verify()?;
        if self.timestamp > signed.expiry {
            return Err(GovernanceError::SignatureExpired {
                deadline: signed.expiry,
                now: self.timestamp,
            });
        }
        if signed.delegatee.is_empty() {
            return Err(GovernanceError::InvalidInput(
                "delegatee is the zero address".to_string(),
            ));
        }
        self.consume_nonce(&signer, signed.nonce)?;
        self.delegate(&signer, Some(&signed.delegatee))?;
        Ok(signer)
    }

    pub fn delegate_of(&self, account: &str) -> Option<&str> {
        self.delegation.delegate_of(account)
    }

    pub fn reported_power(&self, account: &str) -> u64 {
        self.delegation.reported_power(account)
    }

    // ---- proposals -------------------------------------------------------

    /// Submit a proposal. The proposer's power at the previous height must
    /// meet the proposal threshold.
    pub fn propose(
        &mut self,
        proposer: &str,
        actions: Vec<ProposalAction>,
        description: &str,
    ) -> Result<u64> {
        if proposer.is_empty() {
            return Err(GovernanceError::InvalidInput(
                "proposer is the zero address".to_string(),
            ));
        }

        let available =
            self.ledger
                .prior_power(proposer, self.height.saturating_sub(1), self.height)?;
        if available < self.params.proposal_threshold {
            return Err(GovernanceError::InsufficientPower {
                required: self.params.proposal_threshold,
                available,
            });
        }

        if actions.is_empty() {
            return Err(GovernanceError::InvalidProposal(
                "action batch is empty".to_string(),
            ));
        }
        if actions.len() > self.params.max_actions {
            return Err(GovernanceError::InvalidProposal(format!(
                "action batch has {} actions, maximum is {}",
                actions.len(),
                self.params.max_actions
            )));
        }
        for action in &actions {
            if action.target.is_empty() {
                return Err(GovernanceError::InvalidProposal(
                    "action target is the zero address".to_string(),
                ));
            }
        }

        if let Some(&latest) = self.latest_proposal.get(proposer) {
            let state = self.state(latest)?;
            if state == ProposalState::Pending || state == ProposalState::Active {
                return Err(GovernanceError::InvalidProposal(format!(
                    "proposer already has a live proposal: {}",
                    latest
                )));
            }
        }

        let id = self.proposal_count + 1;
        let start_height = self.height + self.params.voting_delay;
        let end_height = start_height + self.params.voting_period;

        let proposal = Proposal {
            id,
            proposer: proposer.to_string(),
            start_height,
            end_height,
            for_votes: 0,
            against_votes: 0,
            abstain_votes: 0,
            canceled: false,
            executed: false,
            eta: 0,
            actions: actions.clone(),
            description_digest: agora_crypto::hash_sha256_hex(description.as_bytes()),
            receipts: HashMap::new(),
        };

        self.proposal_count = id;
        self.proposals.insert(id, proposal);
        self.latest_proposal.insert(proposer.to_string(), id);

        log::info!("proposal {} created by {}", id, proposer);
        self.events.push(GovernanceEvent::ProposalCreated {
            id,
            proposer: proposer.to_string(),
            actions,
            start_height,
            end_height,
            description: description.to_string(),
        });
        Ok(id)
    }

    /// Lifecycle state of a proposal. Unknown ids are an error, never a
    /// default state.
    pub fn state(&self, id: u64) -> Result<ProposalState> {
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        Ok(proposal.state(
            self.params.quorum_votes,
            self.height,
            self.timestamp,
            self.params.grace_period,
        ))
    }

    pub fn cast_vote(&mut self, voter: &str, id: u64, choice: VoteChoice) -> Result<u64> {
        self.vote_internal(voter, id, choice, None)
    }

    pub fn cast_vote_with_reason(
        &mut self,
        voter: &str,
        id: u64,
        choice: VoteChoice,
        reason: &str,
    ) -> Result<u64> {
        self.vote_internal(voter, id, choice, Some(reason.to_string()))
    }

    /// Cast a vote on behalf of whoever signed the message. Returns the
    /// weight counted.
    pub fn cast_vote_by_signature(&mut self, signed: &SignedVote) -> Result<u64> {
        let signer = signed.verify()?;
        if self.timestamp > signed.expiry {
            return Err(GovernanceError::SignatureExpired {
                deadline: signed.expiry,
                now: self.timestamp,
            });
        }
        self.check_nonce_free(&signer, signed.nonce)?;
        let weight = self.vote_internal(&signer, signed.proposal_id, signed.choice, None)?;
        self.consume_nonce(&signer, signed.nonce)?;
        Ok(weight)
    }

    fn vote_internal(
        &mut self,
        voter: &str,
        id: u64,
        choice: VoteChoice,
        reason: Option<String>,
    ) -> Result<u64> {
        if voter.is_empty() {
            return Err(GovernanceError::InvalidInput(
                "voter is the zero address".to_string(),
            ));
        }

        let state = self.state(id)?;
        if state != ProposalState::Active {
            return Err(GovernanceError::InvalidState {
                op: "cast_vote",
                state,
            });
        }

        let (start_height, already_voted) = {
            let proposal = self
                .proposals
                .get(&id)
                .ok_or(GovernanceError::ProposalNotFound(id))?;
            (proposal.start_height, proposal.has_voted(voter))
        };
        if already_voted {
            return Err(GovernanceError::AlreadyVoted {
                account: voter.to_string(),
                proposal: id,
            });
        }

        // Weight is snapshotted at the proposal's start height, so votes are
        // unaffected by later power movements.
        let weight = self.ledger.prior_power(voter, start_height, self.height)?;
        if weight == 0 {
            return Err(GovernanceError::Unauthorized(
                "no voting power at the proposal snapshot".to_string(),
            ));
        }

        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.record_vote(voter, choice, weight);

        log::debug!("{} voted {:?} on proposal {} with weight {}", voter, choice, id, weight);
        self.events.push(GovernanceEvent::VoteCast {
            voter: voter.to_string(),
            proposal_id: id,
            choice,
            weight,
            reason,
        });
        Ok(weight)
    }

    /// Cancel a proposal. Allowed for the proposer, the guardian, or anyone
    /// once the proposer's power has fallen below the proposal threshold.
    pub fn cancel(&mut self, caller: &str, id: u64) -> Result<()> {
        if caller.is_empty() {
            return Err(GovernanceError::InvalidInput(
                "caller is the zero address".to_string(),
            ));
        }

        let state = self.state(id)?;
        if matches!(
            state,
            ProposalState::Executed | ProposalState::Canceled | ProposalState::Expired
        ) {
            return Err(GovernanceError::InvalidState { op: "cancel", state });
        }

        let (proposer, eta, actions) = {
            let proposal = self
                .proposals
                .get(&id)
                .ok_or(GovernanceError::ProposalNotFound(id))?;
            (
                proposal.proposer.clone(),
                proposal.eta,
                proposal.actions.clone(),
            )
        };

        let authorized = caller == proposer
            || self.guardian.as_deref() == Some(caller)
            || self
                .ledger
                .prior_power(&proposer, self.height.saturating_sub(1), self.height)?
                < self.params.proposal_threshold;
        if !authorized {
            return Err(GovernanceError::Unauthorized(
                "cancel requires the proposer, the guardian, or a proposer below the threshold"
                    .to_string(),
            ));
        }

        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.canceled = true;

        if eta != 0 {
            for action in &actions {
                let hash = action_hash(action, eta);
                if self.timelock.remove(&hash) {
                    self.events.push(GovernanceEvent::ActionCanceled {
                        proposal_id: id,
                        hash,
                    });
                }
            }
        }

        log::info!("proposal {} canceled by {}", id, caller);
        self.events.push(GovernanceEvent::ProposalCanceled { id });
        Ok(())
    }

    // ---- timelock --------------------------------------------------------

    /// Queue a succeeded proposal behind the timelock. Returns the eta.
    pub fn queue(&mut self, id: u64) -> Result<Timestamp> {
        let state = self.state(id)?;
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::InvalidState { op: "queue", state });
        }

        let actions = {
            let proposal = self
                .proposals
                .get(&id)
                .ok_or(GovernanceError::ProposalNotFound(id))?;
            proposal.actions.clone()
        };

        let eta = self.timestamp + self.params.timelock_delay;

        // Validate the whole batch before marking anything queued
        let mut hashes = Vec::with_capacity(actions.len());
        for action in &actions {
            let hash = action_hash(action, eta);
            if self.timelock.is_queued(&hash) || hashes.contains(&hash) {
                return Err(GovernanceError::AlreadyQueued(hash));
            }
            hashes.push(hash);
        }

        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.eta = eta;

        for (action, hash) in actions.iter().zip(hashes) {
            self.timelock.insert(hash.clone());
            self.events.push(GovernanceEvent::ActionQueued {
                proposal_id: id,
                hash,
                target: action.target.clone(),
                value: action.value,
                eta,
            });
        }

        log::info!("proposal {} queued with eta {}", id, eta);
        self.events.push(GovernanceEvent::ProposalQueued { id, eta });
        Ok(eta)
    }

    /// Execute a queued proposal's action batch, all-or-nothing. Each
    /// action's queued mark is consumed before its call runs; if any call
    /// fails, the marks consumed by this attempt are restored and the
    /// proposal stays Queued.
    pub fn execute(&mut self, id: u64, invoker: &mut dyn ActionInvoker) -> Result<()> {
        let state = self.state(id)?;
        if state != ProposalState::Queued {
            return Err(GovernanceError::InvalidState { op: "execute", state });
        }

        let (eta, actions) = {
            let proposal = self
                .proposals
                .get(&id)
                .ok_or(GovernanceError::ProposalNotFound(id))?;
            (proposal.eta, proposal.actions.clone())
        };

        if self.timestamp < eta {
            return Err(GovernanceError::TooEarly(format!(
                "timelock not elapsed: eta {}, now {}",
                eta, self.timestamp
            )));
        }
        if self.timestamp > eta.saturating_add(self.params.grace_period) {
            return Err(GovernanceError::TooLate(format!(
                "grace period elapsed: deadline {}, now {}",
                eta.saturating_add(self.params.grace_period),
                self.timestamp
            )));
        }

        let mut cleared: Vec<String> = Vec::new();
        let mut batch_events = Vec::with_capacity(actions.len() + 1);

        for action in &actions {
            let hash = action_hash(action, eta);
            if !self.timelock.remove(&hash) {
                // Batch inconsistency: restore what this attempt consumed
                for restored in cleared.drain(..) {
                    self.timelock.insert(restored);
                }
                return Err(GovernanceError::NotQueued(hash));
            }
            cleared.push(hash.clone());

            if let Err(reason) = invoker.invoke(&action.target, action.value, &action.payload) {
                for restored in cleared.drain(..) {
                    self.timelock.insert(restored);
                }
                return Err(GovernanceError::ExternalCall {
                    target: action.target.clone(),
                    reason,
                });
            }

            batch_events.push(GovernanceEvent::ActionExecuted {
                proposal_id: id,
                hash,
                target: action.target.clone(),
                value: action.value,
            });
        }

        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        proposal.executed = true;

        log::info!("proposal {} executed ({} actions)", id, actions.len());
        self.events.extend(batch_events);
        self.events.push(GovernanceEvent::ProposalExecuted { id });
        Ok(())
    }

    // ---- guardian --------------------------------------------------------

    pub fn transfer_guardian(&mut self, caller: &str, new_guardian: &str) -> Result<()> {
        if self.guardian.as_deref() != Some(caller) {
            return Err(GovernanceError::Unauthorized(
                "only the guardian may transfer guardianship".to_string(),
            ));
        }
        if new_guardian.is_empty() {
            return Err(GovernanceError::InvalidInput(
                "new guardian is the zero address".to_string(),
            ));
        }
        let previous = self.guardian.replace(new_guardian.to_string());
        self.events.push(GovernanceEvent::GuardianChanged {
            previous,
            current: self.guardian.clone(),
        });
        Ok(())
    }

    pub fn renounce_guardian(&mut self, caller: &str) -> Result<()> {
        if self.guardian.as_deref() != Some(caller) {
            return Err(GovernanceError::Unauthorized(
                "only the guardian may renounce guardianship".to_string(),
            ));
        }
        let previous = self.guardian.take();
        self.events.push(GovernanceEvent::GuardianChanged {
            previous,
            current: None,
        });
        Ok(())
    }

    // ---- queries ---------------------------------------------------------

    pub fn get_proposal(&self, id: u64) -> Result<&Proposal> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))
    }

    pub fn get_actions(&self, id: u64) -> Result<&[ProposalAction]> {
        self.get_proposal(id).map(|p| p.actions.as_slice())
    }

    pub fn get_receipt(&self, id: u64, voter: &str) -> Result<Option<&Receipt>> {
        self.get_proposal(id).map(|p| p.receipt(voter))
    }

    /// Power of `account` as of `height`; the height must already be
    /// finalized (strictly below the current height).
    pub fn prior_power(&self, account: &str, height: Height) -> Result<u64> {
        self.ledger.prior_power(account, height, self.height)
    }

    pub fn current_power(&self, account: &str) -> u64 {
        self.ledger.current_power(account)
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposal_count
    }

    pub fn list_proposals(&self, offset: usize, limit: usize) -> Vec<&Proposal> {
        self.proposals.values().skip(offset).take(limit).collect()
    }

    /// Drain buffered events for off-chain indexing.
    pub fn drain_events(&mut self) -> Vec<GovernanceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Human-readable JSON export of one proposal record, for external
    /// tooling and indexers.
    pub fn export_proposal_json(&self, id: u64) -> Result<String> {
        let proposal = self.get_proposal(id)?;
        serde_json::to_string_pretty(proposal)
            .map_err(|e| GovernanceError::Serialization(e.to_string()))
    }

    // ---- persistence -----------------------------------------------------

    /// Serialize the whole engine state to a compact byte blob.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GovernanceError::Serialization(e.to_string()))
    }

    /// Restore an engine from a `snapshot` blob.
    pub fn restore(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| GovernanceError::Serialization(e.to_string()))
    }

    // ---- internal --------------------------------------------------------

    fn check_nonce_free(&self, account: &str, nonce: u64) -> Result<()> {
        let consumed = self
            .consumed_nonces
            .get(account)
            .map(|set| set.contains(&nonce))
            .unwrap_or(false);
        if consumed {
            return Err(GovernanceError::NonceConsumed {
                account: account.to_string(),
                nonce,
            });
        }
        Ok(())
    }

    fn consume_nonce(&mut self, account: &str, nonce: u64) -> Result<()> {
        self.check_nonce_free(account, nonce)?;
        self.consumed_nonces
            .entry(account.to_string())
            .or_default()
            .insert(nonce);
        Ok(())
    }
}
