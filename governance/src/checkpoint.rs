//! Checkpointed voting-power ledger
//!
//! Each account owns an append-only stream of (height, power) checkpoints.
//! Writes only touch the tail: a write at the tail's height amends it in
//! place, a write at a later height appends. Historical lookups binary-search
//! the stream, so `prior_power` is O(log n) with O(1) shortcuts for the two
//! common cases (at-or-after the last checkpoint, before the first).

use crate::error::{GovernanceError, Result};
use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ledger height: the monotonically increasing transaction-ordering position.
pub type Height = u64;

/// Wall-clock seconds.
pub type Timestamp = u64;

/// A recorded (height, power) pair for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub height: Height,
    pub power: u64,
}

/// Per-account checkpoint streams.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointLedger {
    streams: HashMap<Address, Vec<Checkpoint>>,
}

impl CheckpointLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `power` for `account` at `height`. Amends the tail checkpoint
    /// when it already sits at `height`, appends otherwise. Heights must not
    /// regress.
    pub fn write(&mut self, account: &str, height: Height, power: u64) -> Result<()> {
        let stream = self.streams.entry(account.to_string()).or_default();

        match stream.last_mut() {
            Some(last) if last.height == height => {
                last.power = power;
            }
            Some(last) if last.height > height => {
                return Err(GovernanceError::InvalidInput(format!(
                    "checkpoint height regression for {}: last {}, write {}",
                    account, last.height, height
                )));
            }
            _ => stream.push(Checkpoint { height, power }),
        }

        Ok(())
    }

    /// Power of `account` as of `height`: the power of the checkpoint with
    /// the greatest height <= `height`, or zero if none. The queried height
    /// must be strictly below `current_height`, since the present value may
    /// still change within the same ledger position.
    pub fn prior_power(
        &self,
        account: &str,
        height: Height,
        current_height: Height,
    ) -> Result<u64> {
        if height >= current_height {
            return Err(GovernanceError::HeightNotFinalized {
                queried: height,
                current: current_height,
            });
        }

        let stream = match self.streams.get(account) {
            Some(stream) if !stream.is_empty() => stream,
            _ => return Ok(0),
        };

        // Most recent checkpoint already applies
        let last = stream[stream.len() - 1];
        if last.height <= height {
            return Ok(last.power);
        }

        // Queried before the first checkpoint
        if stream[0].height > height {
            return Ok(0);
        }

        // Binary search for the nearest checkpoint at or below `height`
        let mut low = 0usize;
        let mut high = stream.len() - 1;
        while low < high {
            let mid = high - (high - low) / 2;
            if stream[mid].height <= height {
                low = mid;
            } else {
                high = mid - 1;
            }
        }

        Ok(stream[low].power)
    }

    /// Power at the account's last checkpoint, or zero.
    pub fn current_power(&self, account: &str) -> u64 {
        self.streams
            .get(account)
            .and_then(|stream| stream.last())
            .map(|checkpoint| checkpoint.power)
            .unwrap_or(0)
    }

    pub fn checkpoint_count(&self, account: &str) -> usize {
        self.streams.get(account).map(|s| s.len()).unwrap_or(0)
    }

    pub fn checkpoints(&self, account: &str) -> &[Checkpoint] {
        self.streams
            .get(account)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }
}
