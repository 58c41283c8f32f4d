//! Signed governance messages
//!
//! Gasless voting and delegation: a client signs a domain-separated message
//! off-band and anyone may submit it. Verification is a pure function from
//! (message, signature, public key) to the signer's address; the recovered
//! address then flows through the ordinary authorization checks. Both
//! message kinds bind a per-account nonce and an expiry time, enforced by
//! the engine.

use crate::checkpoint::Timestamp;
use crate::error::Result;
use crate::proposal::VoteChoice;
use crate::Address;
use agora_crypto::KeyPair;
use serde::{Deserialize, Serialize};

/// Domain tag for signed votes.
pub const VOTE_DOMAIN: &str = "AGORA_GOVERNANCE_VOTE_V1";

/// Domain tag for signed delegations.
pub const DELEGATION_DOMAIN: &str = "AGORA_GOVERNANCE_DELEGATION_V1";

fn choice_byte(choice: VoteChoice) -> u8 {
    match choice {
        VoteChoice::For => 0,
        VoteChoice::Against => 1,
        VoteChoice::Abstain => 2,
    }
}

/// Domain-separated vote message:
/// VOTE_DOMAIN || proposal_id || choice || nonce || expiry
pub fn vote_message(
    proposal_id: u64,
    choice: VoteChoice,
    nonce: u64,
    expiry: Timestamp,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(VOTE_DOMAIN.len() + 25);
    message.extend_from_slice(VOTE_DOMAIN.as_bytes());
    message.extend_from_slice(&proposal_id.to_be_bytes());
    message.push(choice_byte(choice));
    message.extend_from_slice(&nonce.to_be_bytes());
    message.extend_from_slice(&expiry.to_be_bytes());
    message
}

/// Domain-separated delegation message:
/// DELEGATION_DOMAIN || delegatee || nonce || expiry
pub fn delegation_message(delegatee: &str, nonce: u64, expiry: Timestamp) -> Vec<u8> {
    let mut message = Vec::with_capacity(DELEGATION_DOMAIN.len() + delegatee.len() + 24);
    message.extend_from_slice(DELEGATION_DOMAIN.as_bytes());
    message.extend_from_slice(&(delegatee.len() as u64).to_be_bytes());
    message.extend_from_slice(delegatee.as_bytes());
    message.extend_from_slice(&nonce.to_be_bytes());
    message.extend_from_slice(&expiry.to_be_bytes());
    message
}

/// A vote authorized by signature instead of direct submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedVote {
    pub proposal_id: u64,
    pub choice: VoteChoice,
    pub nonce: u64,
    pub expiry: Timestamp,
    /// Hex-encoded Ed25519 public key of the signer.
    pub public_key: String,
    pub signature: Vec<u8>,
}

impl SignedVote {
    pub fn sign(
        keypair: &KeyPair,
        proposal_id: u64,
        choice: VoteChoice,
        nonce: u64,
        expiry: Timestamp,
    ) -> Self {
        let message = vote_message(proposal_id, choice, nonce, expiry);
        Self {
            proposal_id,
            choice,
            nonce,
            expiry,
            public_key: keypair.public_key_hex(),
            signature: keypair.sign(&message),
        }
    }

    /// Verify the signature and return the signer's address.
    pub fn verify(&self) -> Result<Address> {
        let message = vote_message(self.proposal_id, self.choice, self.nonce, self.expiry);
        agora_crypto::verify(&self.public_key, &message, &self.signature)?;
        Ok(agora_crypto::public_key_to_address(&self.public_key))
    }
}

/// A delegation authorized by signature instead of direct submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDelegation {
    pub delegatee: Address,
    pub nonce: u64,
    pub expiry: Timestamp,
    /// Hex-encoded Ed25519 public key of the signer.
    pub public_key: String,
    pub signature: Vec<u8>,
}

impl SignedDelegation {
    pub fn sign(keypair: &KeyPair, delegatee: &str, nonce: u64, expiry: Timestamp) -> Self {
        let message = delegation_message(delegatee, nonce, expiry);
        Self {
            delegatee: delegatee.to_string(),
            nonce,
            expiry,
            public_key: keypair.public_key_hex(),
            signature: keypair.sign(&message),
        }
    }

    /// Verify the signature and return the signer's address.
    pub fn verify(&self) -> Result<Address> {
        let message = delegation_message(&self.delegatee, self.nonce, self.expiry);
        agora_crypto::verify(&self.public_key, &message, &self.signature)?;
        Ok(agora_crypto::public_key_to_address(&self.public_key))
    }
}
