use serde::{Deserialize, Serialize};
use shade_core::error::{LedgerError, LedgerResult};
use shade_core::id::{HashKey, TokenId};
use std::collections::BTreeMap;

use crate::store::LedgerState;

/// A read-only export of the four ledger maps for inspection and auditing.
///
/// Maps are ordered so that two exports of the same state are byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub ownership: BTreeMap<TokenId, HashKey>,
    pub approvals: BTreeMap<TokenId, HashKey>,
    pub balances: BTreeMap<HashKey, u64>,
    pub operators: BTreeMap<HashKey, bool>,
}

impl LedgerSnapshot {
    /// Export a committed state
    pub fn capture(state: &LedgerState) -> Self {
        Self {
            ownership: state.ownership.iter().map(|(k, v)| (*k, *v)).collect(),
            approvals: state.approvals.iter().map(|(k, v)| (*k, *v)).collect(),
            balances: state.balances.iter().map(|(k, v)| (*k, *v)).collect(),
            operators: state.operators.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }

    /// Check that the maps agree with each other:
    /// every balance equals the number of tokens owned under its key, and
    /// every approval references an existing token.
    pub fn verify_invariants(&self) -> LedgerResult<()> {
        let mut counts: BTreeMap<HashKey, u64> = BTreeMap::new();
        for owner in self.ownership.values() {
            *counts.entry(*owner).or_insert(0) += 1;
        }

        for (owner, count) in &counts {
            let balance = self.balances.get(owner).copied().unwrap_or(0);
            if balance != *count {
                return Err(LedgerError::InvariantViolation(format!(
                    "{} owns {} tokens but has balance {}",
                    owner, count, balance
                )));
            }
        }

        for (key, balance) in &self.balances {
            if *balance != 0 && !counts.contains_key(key) {
                return Err(LedgerError::InvariantViolation(format!(
                    "{} owns no tokens but has balance {}",
                    key, balance
                )));
            }
        }

        for token in self.approvals.keys() {
            if !self.ownership.contains_key(token) {
                return Err(LedgerError::InvariantViolation(format!(
                    "approval outstanding for missing {}",
                    token
                )));
            }
        }

        Ok(())
    }

    pub fn to_json(&self) -> LedgerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> LedgerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> LedgerResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl LedgerState {
    /// Rebuild a state from an export, refusing inconsistent snapshots
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> LedgerResult<Self> {
        snapshot.verify_invariants()?;

        Ok(Self {
            ownership: snapshot.ownership.iter().map(|(k, v)| (*k, *v)).collect(),
            approvals: snapshot.approvals.iter().map(|(k, v)| (*k, *v)).collect(),
            balances: snapshot.balances.iter().map(|(k, v)| (*k, *v)).collect(),
            operators: snapshot.operators.iter().map(|(k, v)| (*k, *v)).collect(),
        })
    }

    /// Export this state
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::capture(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LedgerWrite;

    fn key(byte: u8) -> HashKey {
        HashKey::new([byte; 32])
    }

    fn sample_state() -> LedgerState {
        let base = LedgerState::new();
        let mut tx = base.begin();
        tx.set_owner(TokenId::new(1), key(1));
        tx.increment_balance(&key(1)).unwrap();
        tx.set_owner(TokenId::new(2), key(1));
        tx.increment_balance(&key(1)).unwrap();
        tx.set_approval(TokenId::new(2), key(2)).unwrap();
        tx.set_operator_approval(key(9), true);
        let delta = tx.into_delta();
        base.with_delta(&delta)
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let snapshot = sample_state().snapshot();
        assert_eq!(snapshot.ownership.len(), 2);
        assert_eq!(snapshot.balances.get(&key(1)), Some(&2));
        snapshot.verify_invariants().unwrap();
    }

    #[test]
    fn test_balance_mismatch_is_detected() {
        let mut snapshot = sample_state().snapshot();
        snapshot.balances.insert(key(1), 1);

        assert!(matches!(
            snapshot.verify_invariants(),
            Err(LedgerError::InvariantViolation(_))
        ));
        assert!(LedgerState::from_snapshot(&snapshot).is_err());
    }

    #[test]
    fn test_orphan_approval_is_detected() {
        let mut snapshot = sample_state().snapshot();
        snapshot.approvals.insert(TokenId::new(77), key(3));
        assert!(snapshot.verify_invariants().is_err());
    }

    #[test]
    fn test_stray_balance_is_detected() {
        let mut snapshot = sample_state().snapshot();
        snapshot.balances.insert(key(5), 1);
        assert!(snapshot.verify_invariants().is_err());
    }

    #[test]
    fn test_state_restores_from_exports() {
        let state = sample_state();
        let snapshot = state.snapshot();

        let from_bytes = LedgerSnapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
        assert_eq!(LedgerState::from_snapshot(&from_bytes).unwrap(), state);

        let from_json = LedgerSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(from_json, snapshot);
    }
}
