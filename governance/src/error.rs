//! Governance error types

use crate::proposal::ProposalState;
use thiserror::Error;

/// Stable classification of rejections, so callers can distinguish error
/// classes without matching on message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    State,
    AlreadyActed,
    Timing,
    Validation,
    Signature,
    ExternalCall,
}

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("insufficient voting power: required {required}, available {available}")]
    InsufficientPower { required: u64, available: u64 },

    #[error("proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("operation {op} not allowed while proposal is {state:?}")]
    InvalidState {
        op: &'static str,
        state: ProposalState,
    },

    #[error("account {account} already voted on proposal {proposal}")]
    AlreadyVoted { account: String, proposal: u64 },

    #[error("action already queued: {0}")]
    AlreadyQueued(String),

    #[error("action not queued: {0}")]
    NotQueued(String),

    #[error("too early: {0}")]
    TooEarly(String),

    #[error("too late: {0}")]
    TooLate(String),

    #[error("height {queried} is not yet finalized (current height {current})")]
    HeightNotFinalized { queried: u64, current: u64 },

    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("signature rejected: {0}")]
    Signature(String),

    #[error("signature expired: deadline {deadline}, now {now}")]
    SignatureExpired { deadline: u64, now: u64 },

    #[error("nonce {nonce} already consumed for {account}")]
    NonceConsumed { account: String, nonce: u64 },

    #[error("action call to {target} failed: {reason}")]
    ExternalCall { target: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::Unauthorized(_) | GovernanceError::InsufficientPower { .. } => {
                ErrorKind::Authorization
            }
            GovernanceError::InvalidState { .. } | GovernanceError::NotQueued(_) => ErrorKind::State,
            GovernanceError::AlreadyVoted { .. } | GovernanceError::AlreadyQueued(_) => {
                ErrorKind::AlreadyActed
            }
            GovernanceError::TooEarly(_)
            | GovernanceError::TooLate(_)
            | GovernanceError::HeightNotFinalized { .. } => ErrorKind::Timing,
            GovernanceError::ProposalNotFound(_)
            | GovernanceError::InvalidProposal(_)
            | GovernanceError::InvalidInput(_)
            | GovernanceError::Serialization(_) => ErrorKind::Validation,
            GovernanceError::Signature(_)
            | GovernanceError::SignatureExpired { .. }
            | GovernanceError::NonceConsumed { .. } => ErrorKind::Signature,
            GovernanceError::ExternalCall { .. } => ErrorKind::ExternalCall,
        }
    }
}

impl From<agora_crypto::CryptoError> for GovernanceError {
    fn from(err: agora_crypto::CryptoError) -> Self {
        GovernanceError::Signature(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
