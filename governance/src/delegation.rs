//! Delegation registry
//!
//! Tracks each account's chosen delegate and its last reported power. An
//! absent mapping means the account has no delegate: its reported power is
//! remembered but not checkpointed to anyone until a delegate is chosen.
//! Self-delegation is an ordinary explicit delegation.

use crate::checkpoint::{CheckpointLedger, Height};
use crate::error::Result;
use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One delegate's checkpoint stream moving from `previous` to `current`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerMovement {
    pub delegate: Address,
    pub previous: u64,
    pub current: u64,
}

/// Result of rewriting a delegation mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationOutcome {
    /// Delegate before the rewrite, if any.
    pub previous: Option<Address>,
    /// Checkpoint movements performed, one per affected delegate.
    pub movements: Vec<PowerMovement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegationRegistry {
    delegates: HashMap<Address, Address>,
    reported: HashMap<Address, u64>,
}

impl DelegationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current delegate of `account`, or `None` if unset.
    pub fn delegate_of(&self, account: &str) -> Option<&str> {
        self.delegates.get(account).map(|d| d.as_str())
    }

    /// Last power reported for `account` by the power oracle.
    pub fn reported_power(&self, account: &str) -> u64 {
        self.reported.get(account).copied().unwrap_or(0)
    }

    /// Rewrite `delegator`'s delegate and move its reported power between the
    /// old and new delegates' checkpoint streams. A `None` side performs no
    /// checkpoint write.
    pub fn delegate(
        &mut self,
        ledger: &mut CheckpointLedger,
        height: Height,
        delegator: &str,
        delegatee: Option<&str>,
    ) -> Result<DelegationOutcome> {
        let previous = self.delegates.get(delegator).cloned();
        let amount = self.reported_power(delegator);

        match delegatee {
            Some(delegatee) => {
                self.delegates
                    .insert(delegator.to_string(), delegatee.to_string());
            }
            None => {
                self.delegates.remove(delegator);
            }
        }

        let movements = move_power(ledger, height, previous.as_deref(), delegatee, amount)?;

        Ok(DelegationOutcome {
            previous,
            movements,
        })
    }

    /// Apply a new reported power for `account`, forwarding the delta to its
    /// delegate's checkpoint stream. Returns the movement performed, or
    /// `None` when the account has no delegate (the report is still
    /// remembered for later delegation).
    pub fn report_power_change(
        &mut self,
        ledger: &mut CheckpointLedger,
        height: Height,
        account: &str,
        new_power: u64,
    ) -> Result<Option<PowerMovement>> {
        let previous = self.reported_power(account);
        self.reported.insert(account.to_string(), new_power);

        let delegate = match self.delegates.get(account) {
            Some(delegate) => delegate.clone(),
            None => return Ok(None),
        };

        if new_power == previous {
            return Ok(None);
        }

        let before = ledger.current_power(&delegate);
        let after = if new_power >= previous {
            before.saturating_add(new_power - previous)
        } else {
            before.saturating_sub(previous - new_power)
        };
        ledger.write(&delegate, height, after)?;

        Ok(Some(PowerMovement {
            delegate,
            previous: before,
            current: after,
        }))
    }
}

/// Move `amount` between two delegates' checkpoint streams. Either side may
/// be `None`; equal sides or a zero amount are no-ops.
fn move_power(
    ledger: &mut CheckpointLedger,
    height: Height,
    from: Option<&str>,
    to: Option<&str>,
    amount: u64,
) -> Result<Vec<PowerMovement>> {
    let mut movements = Vec::new();
    if amount == 0 || from == to {
        return Ok(movements);
    }

    if let Some(source) = from {
        let previous = ledger.current_power(source);
        let current = previous.saturating_sub(amount);
        ledger.write(source, height, current)?;
        movements.push(PowerMovement {
            delegate: source.to_string(),
            previous,
            current,
        });
    }

    if let Some(destination) = to {
        let previous = ledger.current_power(destination);
        let current = previous.saturating_add(amount);
        ledger.write(destination, height, current)?;
        movements.push(PowerMovement {
            delegate: destination.to_string(),
            previous,
            current,
        });
    }

    Ok(movements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_without_delegate_writes_no_checkpoint() {
        let mut ledger = CheckpointLedger::new();
        let mut registry = DelegationRegistry::new();

        let movement = registry
            .report_power_change(&mut ledger, 5, "alice", 1_000)
            .unwrap();

        assert!(movement.is_none());
        assert_eq!(registry.reported_power("alice"), 1_000);
        assert_eq!(ledger.checkpoint_count("alice"), 0);
    }

    #[test]
    fn test_delegate_moves_reported_power() {
        let mut ledger = CheckpointLedger::new();
        let mut registry = DelegationRegistry::new();

        registry
            .report_power_change(&mut ledger, 5, "alice", 1_000)
            .unwrap();
        let outcome = registry
            .delegate(&mut ledger, 6, "alice", Some("bob"))
            .unwrap();

        assert_eq!(outcome.previous, None);
        assert_eq!(ledger.current_power("bob"), 1_000);
        // Delegation moves the delegate's tally, not the delegator's own stream
        assert_eq!(ledger.checkpoint_count("alice"), 0);
    }

    #[test]
    fn test_redelegation_conserves_power() {
        let mut ledger = CheckpointLedger::new();
        let mut registry = DelegationRegistry::new();

        registry
            .report_power_change(&mut ledger, 5, "alice", 1_000)
            .unwrap();
        registry
            .delegate(&mut ledger, 6, "alice", Some("bob"))
            .unwrap();
        let outcome = registry
            .delegate(&mut ledger, 7, "alice", Some("carol"))
            .unwrap();

        assert_eq!(outcome.previous.as_deref(), Some("bob"));
        assert_eq!(ledger.current_power("bob"), 0);
        assert_eq!(ledger.current_power("carol"), 1_000);
        assert_eq!(outcome.movements.len(), 2);
    }

    #[test]
    fn test_redelegation_to_same_delegate_is_noop() {
        let mut ledger = CheckpointLedger::new();
        let mut registry = DelegationRegistry::new();

        registry
            .report_power_change(&mut ledger, 5, "alice", 1_000)
            .unwrap();
        registry
            .delegate(&mut ledger, 6, "alice", Some("bob"))
            .unwrap();
        let count_before = ledger.checkpoint_count("bob");

        let outcome = registry
            .delegate(&mut ledger, 7, "alice", Some("bob"))
            .unwrap();

        assert!(outcome.movements.is_empty());
        assert_eq!(ledger.checkpoint_count("bob"), count_before);
        assert_eq!(ledger.current_power("bob"), 1_000);
    }

    #[test]
    fn test_undelegate_returns_power_to_none() {
        let mut ledger = CheckpointLedger::new();
        let mut registry = DelegationRegistry::new();

        registry
            .report_power_change(&mut ledger, 5, "alice", 1_000)
            .unwrap();
        registry
            .delegate(&mut ledger, 6, "alice", Some("bob"))
            .unwrap();
        let outcome = registry.delegate(&mut ledger, 7, "alice", None).unwrap();

        assert_eq!(ledger.current_power("bob"), 0);
        assert_eq!(outcome.movements.len(), 1);
        assert_eq!(registry.delegate_of("alice"), None);
    }

    #[test]
    fn test_report_delta_flows_to_delegate() {
        let mut ledger = CheckpointLedger::new();
        let mut registry = DelegationRegistry::new();

        registry
            .report_power_change(&mut ledger, 5, "alice", 1_000)
            .unwrap();
        registry
            .delegate(&mut ledger, 6, "alice", Some("bob"))
            .unwrap();

        // Increase: +500 lands on bob
        registry
            .report_power_change(&mut ledger, 8, "alice", 1_500)
            .unwrap();
        assert_eq!(ledger.current_power("bob"), 1_500);

        // Decrease: -1200 comes back off bob
        registry
            .report_power_change(&mut ledger, 9, "alice", 300)
            .unwrap();
        assert_eq!(ledger.current_power("bob"), 300);
    }

    #[test]
    fn test_self_delegation_checkpoints_own_stream() {
        let mut ledger = CheckpointLedger::new();
        let mut registry = DelegationRegistry::new();

        registry
            .report_power_change(&mut ledger, 5, "alice", 700)
            .unwrap();
        registry
            .delegate(&mut ledger, 6, "alice", Some("alice"))
            .unwrap();

        assert_eq!(ledger.current_power("alice"), 700);
        assert_eq!(registry.delegate_of("alice"), Some("alice"));
    }
}
