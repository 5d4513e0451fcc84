use serde::{Deserialize, Serialize};
use shade_commitment::CommitmentEngine;
use shade_core::disclose;
use shade_core::error::{LedgerError, LedgerResult};
use shade_core::id::{HashKey, TokenId};
use std::collections::{BTreeMap, HashMap};

/// Read access to the four ledger maps
pub trait LedgerRead {
    /// Check whether a token is present in the ownership map
    fn exists(&self, token: TokenId) -> bool;

    /// Get the owner key of a token
    ///
    /// # Returns
    /// The owner key, or `NotFound` if the token does not exist
    fn owner_of(&self, token: TokenId) -> LedgerResult<HashKey>;

    /// Get the approved key of a token
    ///
    /// # Returns
    /// The approved key, or `NotFound` if no approval is outstanding
    fn approved_of(&self, token: TokenId) -> LedgerResult<HashKey>;

    /// Number of tokens held under a key. Never fails; absent keys hold 0.
    fn balance_of(&self, key: &HashKey) -> u64;

    /// Look up an entry of the operator-approval set by its combined key
    fn is_operator_approved(&self, pair_key: &HashKey) -> bool;

    /// Look up an operator approval by its owner and operator keys
    fn is_operator_approved_for(
        &self,
        engine: &dyn CommitmentEngine,
        owner: &HashKey,
        operator: &HashKey,
    ) -> bool {
        let pair_key = disclose::operator_key(&engine.pair_hash_key(owner, operator));
        self.is_operator_approved(&pair_key)
    }
}

/// Mutators of the ledger maps. Only implemented by [`LedgerTransaction`], so
/// committed state is never written to directly.
pub trait LedgerWrite: LedgerRead {
    fn set_owner(&mut self, token: TokenId, owner: HashKey);

    /// Delete a token's ownership entry
    fn remove_owner(&mut self, token: TokenId) -> LedgerResult<()>;

    fn clear_approval(&mut self, token: TokenId);

    /// Replace a token's approval; the token must exist
    fn set_approval(&mut self, token: TokenId, approved: HashKey) -> LedgerResult<()>;

    /// Credit one token to a key, creating its counter if needed
    fn increment_balance(&mut self, key: &HashKey) -> LedgerResult<u64>;

    /// Debit one token from a key, failing with `Underflow` at zero
    fn decrement_balance(&mut self, key: &HashKey) -> LedgerResult<u64>;

    fn set_operator_approval(&mut self, pair_key: HashKey, approved: bool);
}

/// The committed ledger state: an immutable snapshot between operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub(crate) ownership: HashMap<TokenId, HashKey>,
    pub(crate) approvals: HashMap<TokenId, HashKey>,
    pub(crate) balances: HashMap<HashKey, u64>,
    pub(crate) operators: HashMap<HashKey, bool>,
}

impl LedgerState {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens currently in existence
    pub fn token_count(&self) -> usize {
        self.ownership.len()
    }

    /// Open a transaction that buffers writes on top of this state
    pub fn begin(&self) -> LedgerTransaction<'_> {
        LedgerTransaction::new(self)
    }

    /// Commit a delta in place
    pub fn apply(&mut self, delta: &LedgerDelta) {
        for (token, owner) in &delta.ownership {
            match owner {
                Some(owner) => self.ownership.insert(*token, *owner),
                None => self.ownership.remove(token),
            };
        }

        for (token, approved) in &delta.approvals {
            match approved {
                Some(approved) => self.approvals.insert(*token, *approved),
                None => self.approvals.remove(token),
            };
        }

        for (key, balance) in &delta.balances {
            self.balances.insert(*key, *balance);
        }

        for (pair_key, approved) in &delta.operators {
            self.operators.insert(*pair_key, *approved);
        }
    }

    /// Consume this state and produce the state after `delta`
    pub fn with_delta(mut self, delta: &LedgerDelta) -> Self {
        self.apply(delta);
        self
    }
}

impl LedgerRead for LedgerState {
    fn exists(&self, token: TokenId) -> bool {
        self.ownership.contains_key(&token)
    }

    fn owner_of(&self, token: TokenId) -> LedgerResult<HashKey> {
        self.ownership
            .get(&token)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(format!("owner of {}", token)))
    }

    fn approved_of(&self, token: TokenId) -> LedgerResult<HashKey> {
        self.approvals
            .get(&token)
            .copied()
            .ok_or_else(|| LedgerError::NotFound(format!("approval of {}", token)))
    }

    fn balance_of(&self, key: &HashKey) -> u64 {
        self.balances.get(key).copied().unwrap_or(0)
    }

    fn is_operator_approved(&self, pair_key: &HashKey) -> bool {
        self.operators.get(pair_key).copied().unwrap_or(false)
    }
}

/// Buffered writes produced by one operation.
///
/// Entries hold final values: `None` in `ownership` or `approvals` means the
/// entry is deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub ownership: BTreeMap<TokenId, Option<HashKey>>,
    pub approvals: BTreeMap<TokenId, Option<HashKey>>,
    pub balances: BTreeMap<HashKey, u64>,
    pub operators: BTreeMap<HashKey, bool>,
}

impl LedgerDelta {
    pub fn is_empty(&self) -> bool {
        self.ownership.is_empty()
            && self.approvals.is_empty()
            && self.balances.is_empty()
            && self.operators.is_empty()
    }

    /// Describe every entry this delta changes relative to `before`
    pub fn effects(&self, before: &LedgerState) -> Vec<LedgerEffect> {
        let mut effects = Vec::new();

        for (token, after) in &self.ownership {
            let prior = before.ownership.get(token).copied();
            if prior != *after {
                effects.push(LedgerEffect::Ownership {
                    token: *token,
                    before: prior,
                    after: *after,
                });
            }
        }

        for (token, after) in &self.approvals {
            let prior = before.approvals.get(token).copied();
            if prior != *after {
                effects.push(LedgerEffect::Approval {
                    token: *token,
                    before: prior,
                    after: *after,
                });
            }
        }

        for (key, after) in &self.balances {
            let prior = before.balance_of(key);
            if prior != *after || !before.balances.contains_key(key) {
                effects.push(LedgerEffect::Balance {
                    key: *key,
                    before: prior,
                    after: *after,
                });
            }
        }

        for (pair_key, after) in &self.operators {
            let prior = before.is_operator_approved(pair_key);
            if prior != *after {
                effects.push(LedgerEffect::OperatorApproval {
                    pair_key: *pair_key,
                    before: prior,
                    after: *after,
                });
            }
        }

        effects
    }
}

/// The before and after image of one ledger entry touched by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEffect {
    Ownership {
        token: TokenId,
        before: Option<HashKey>,
        after: Option<HashKey>,
    },
    Approval {
        token: TokenId,
        before: Option<HashKey>,
        after: Option<HashKey>,
    },
    Balance {
        key: HashKey,
        before: u64,
        after: u64,
    },
    OperatorApproval {
        pair_key: HashKey,
        before: bool,
        after: bool,
    },
}

impl LedgerEffect {
    /// Check if this effect represents a token creation
    pub fn is_creation(&self) -> bool {
        matches!(self, LedgerEffect::Ownership { before: None, after: Some(_), .. })
    }

    /// Check if this effect represents a token deletion
    pub fn is_deletion(&self) -> bool {
        matches!(self, LedgerEffect::Ownership { before: Some(_), after: None, .. })
    }
}

/// An open transaction over a committed [`LedgerState`].
///
/// Reads see the transaction's own writes. Nothing reaches the base state
/// until the delta from [`LedgerTransaction::into_delta`] is applied;
/// dropping the transaction discards everything.
#[derive(Debug)]
pub struct LedgerTransaction<'a> {
    base: &'a LedgerState,
    delta: LedgerDelta,
}

impl<'a> LedgerTransaction<'a> {
    pub fn new(base: &'a LedgerState) -> Self {
        Self {
            base,
            delta: LedgerDelta::default(),
        }
    }

    /// The committed state this transaction reads through to
    pub fn base(&self) -> &'a LedgerState {
        self.base
    }

    /// Close the transaction and hand back its buffered writes
    pub fn into_delta(self) -> LedgerDelta {
        self.delta
    }
}

impl LedgerRead for LedgerTransaction<'_> {
    fn exists(&self, token: TokenId) -> bool {
        match self.delta.ownership.get(&token) {
            Some(owner) => owner.is_some(),
            None => self.base.exists(token),
        }
    }

    fn owner_of(&self, token: TokenId) -> LedgerResult<HashKey> {
        match self.delta.ownership.get(&token) {
            Some(Some(owner)) => Ok(*owner),
            Some(None) => Err(LedgerError::NotFound(format!("owner of {}", token))),
            None => self.base.owner_of(token),
        }
    }

    fn approved_of(&self, token: TokenId) -> LedgerResult<HashKey> {
        match self.delta.approvals.get(&token) {
            Some(Some(approved)) => Ok(*approved),
            Some(None) => Err(LedgerError::NotFound(format!("approval of {}", token))),
            None => self.base.approved_of(token),
        }
    }

    fn balance_of(&self, key: &HashKey) -> u64 {
        match self.delta.balances.get(key) {
            Some(balance) => *balance,
            None => self.base.balance_of(key),
        }
    }

    fn is_operator_approved(&self, pair_key: &HashKey) -> bool {
        match self.delta.operators.get(pair_key) {
            Some(approved) => *approved,
            None => self.base.is_operator_approved(pair_key),
        }
    }
}

impl LedgerWrite for LedgerTransaction<'_> {
    fn set_owner(&mut self, token: TokenId, owner: HashKey) {
        self.delta.ownership.insert(token, Some(owner));
    }

    fn remove_owner(&mut self, token: TokenId) -> LedgerResult<()> {
        if !self.exists(token) {
            return Err(LedgerError::NotFound(format!("owner of {}", token)));
        }
        self.delta.ownership.insert(token, None);
        Ok(())
    }

    fn clear_approval(&mut self, token: TokenId) {
        self.delta.approvals.insert(token, None);
    }

    fn set_approval(&mut self, token: TokenId, approved: HashKey) -> LedgerResult<()> {
        if !self.exists(token) {
            return Err(LedgerError::NotFound(format!("owner of {}", token)));
        }
        self.delta.approvals.insert(token, Some(approved));
        Ok(())
    }

    fn increment_balance(&mut self, key: &HashKey) -> LedgerResult<u64> {
        let balance = self
            .balance_of(key)
            .checked_add(1)
            .ok_or_else(|| LedgerError::precondition(format!("balance overflow for {}", key)))?;
        self.delta.balances.insert(*key, balance);
        Ok(balance)
    }

    fn decrement_balance(&mut self, key: &HashKey) -> LedgerResult<u64> {
        let balance = self
            .balance_of(key)
            .checked_sub(1)
            .ok_or(LedgerError::Underflow(*key))?;
        self.delta.balances.insert(*key, balance);
        Ok(balance)
    }

    fn set_operator_approval(&mut self, pair_key: HashKey, approved: bool) {
        self.delta.operators.insert(pair_key, approved);
    }
}
