//! Timelocked execution queue
//!
//! Scheduled actions are keyed by a content hash over (target, value,
//! payload, eta). A hash is marked on queuing and consumed exactly once on
//! execution or cancellation; the same action can be queued again later with
//! a different eta.

use crate::checkpoint::Timestamp;
use crate::proposal::ProposalAction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Domain tag for queued-action content hashes.
pub const QUEUE_DOMAIN: &str = "AGORA_TIMELOCK_ACTION_V1";

/// Hex-encoded SHA-256 content hash identifying a queued action. Variable
/// length fields are length-prefixed so distinct inputs cannot collide by
/// concatenation.
pub fn action_hash(action: &ProposalAction, eta: Timestamp) -> String {
    let mut preimage =
        Vec::with_capacity(QUEUE_DOMAIN.len() + action.target.len() + action.payload.len() + 32);
    preimage.extend_from_slice(QUEUE_DOMAIN.as_bytes());
    preimage.extend_from_slice(&(action.target.len() as u64).to_be_bytes());
    preimage.extend_from_slice(action.target.as_bytes());
    preimage.extend_from_slice(&action.value.to_be_bytes());
    preimage.extend_from_slice(&(action.payload.len() as u64).to_be_bytes());
    preimage.extend_from_slice(&action.payload);
    preimage.extend_from_slice(&eta.to_be_bytes());
    agora_crypto::hash_sha256_hex(&preimage)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelockQueue {
    queued: HashSet<String>,
}

impl TimelockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_queued(&self, hash: &str) -> bool {
        self.queued.contains(hash)
    }

    /// Mark a hash queued. Returns false if it was already present.
    pub fn insert(&mut self, hash: String) -> bool {
        self.queued.insert(hash)
    }

    /// Consume a queued mark. Returns false if the hash was not queued.
    pub fn remove(&mut self, hash: &str) -> bool {
        self.queued.remove(hash)
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}
