//! Ownership and transfer state machine.
//!
//! Every operation takes the committed [`LedgerState`] by reference and
//! returns either a [`Transition`] describing the writes to commit or an
//! error. The input state is never modified: writes are buffered in a
//! [`LedgerTransaction`] and dropped on any failure.

use log::debug;
use shade_commitment::CommitmentEngine;
use shade_core::disclose::{self, Private};
use shade_core::error::{LedgerError, LedgerResult};
use shade_core::id::{HashKey, PublicIdentity, TokenId};
use shade_ledger::{LedgerDelta, LedgerEffect, LedgerRead, LedgerState, LedgerTransaction, LedgerWrite};

use crate::identity::{CallContext, Identity};

/// The committed outcome of a successful operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Writes to apply to the input state
    pub delta: LedgerDelta,

    /// Before and after images of every changed entry
    pub effects: Vec<LedgerEffect>,
}

impl Transition {
    fn finish(tx: LedgerTransaction<'_>) -> Self {
        let base = tx.base();
        let delta = tx.into_delta();
        let effects = delta.effects(base);
        Self { delta, effects }
    }
}

/// How a caller is entitled to act on a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Owner,
    Approved,
    Operator,
}

fn caller_keys(caller: &Identity) -> [HashKey; 2] {
    [
        disclose::hash_key(caller.as_self()),
        disclose::hash_key(caller.as_counterparty()),
    ]
}

/// Decide whether the caller may act on `token`, owned by `owner`.
///
/// Either of the caller's keys counts: tokens the caller minted to itself
/// sit under its local-secret key, tokens it received under its
/// shared-secret key.
fn authorize<L: LedgerRead>(
    ledger: &L,
    ctx: &CallContext<'_>,
    caller: &Identity,
    token: TokenId,
    owner: &HashKey,
    allow_approved: bool,
) -> LedgerResult<Authority> {
    let keys = caller_keys(caller);

    if keys.contains(owner) {
        return Ok(Authority::Owner);
    }

    if allow_approved {
        if let Ok(approved) = ledger.approved_of(token) {
            if keys.contains(&approved) {
                return Ok(Authority::Approved);
            }
        }
    }

    if keys
        .iter()
        .any(|key| ledger.is_operator_approved_for(ctx.engine(), owner, key))
    {
        return Ok(Authority::Operator);
    }

    Err(LedgerError::precondition("not authorized"))
}

fn require_existing(state: &LedgerState, token: TokenId) -> LedgerResult<HashKey> {
    if !state.exists(token) {
        return Err(LedgerError::precondition(format!("{} does not exist", token)));
    }
    state.owner_of(token)
}

/// Create `token` and give it to `to`.
///
/// The recipient is recorded under the caller's local-secret key when the
/// caller mints to itself and under the shared-secret key otherwise.
pub fn mint(
    state: &LedgerState,
    ctx: &CallContext<'_>,
    to: &PublicIdentity,
    token: TokenId,
) -> LedgerResult<Transition> {
    if token.is_zero() {
        return Err(LedgerError::precondition("token id cannot be zero"));
    }
    ctx.validate(to, "recipient")?;
    if state.exists(token) {
        return Err(LedgerError::precondition(format!("{} already exists", token)));
    }

    let owner = disclose::hash_key(&ctx.recipient_key(to)?);
    if owner.is_default() {
        return Err(LedgerError::precondition("recipient key cannot be default"));
    }

    let mut tx = state.begin();
    tx.set_owner(token, owner);
    tx.increment_balance(&owner)?;

    debug!("minted {} to {}", token, owner);
    Ok(Transition::finish(tx))
}

/// Approve `to` to transfer `token`. The approved party is always keyed as a
/// counterparty.
pub fn approve(
    state: &LedgerState,
    ctx: &CallContext<'_>,
    to: &PublicIdentity,
    token: TokenId,
) -> LedgerResult<Transition> {
    ctx.validate(to, "approved party")?;
    if to == ctx.caller() {
        return Err(LedgerError::precondition("cannot approve yourself"));
    }

    let owner = require_existing(state, token)?;
    let caller = ctx.caller_identity()?;
    authorize(state, ctx, &caller, token, &owner, false)?;

    let approved = disclose::hash_key(&ctx.counterparty_key(to)?);
    if approved == owner {
        return Err(LedgerError::precondition("cannot approve yourself"));
    }

    let mut tx = state.begin();
    tx.set_approval(token, approved)?;

    debug!("approved {} for {}", approved, token);
    Ok(Transition::finish(tx))
}

/// Grant or revoke `operator` the right to act on all of the caller's tokens
pub fn set_approval_for_all(
    state: &LedgerState,
    ctx: &CallContext<'_>,
    operator: &PublicIdentity,
    approved: bool,
) -> LedgerResult<Transition> {
    ctx.validate(operator, "operator")?;
    if operator == ctx.caller() {
        return Err(LedgerError::precondition("cannot set yourself as operator"));
    }

    let owner_key = disclose::hash_key(&ctx.self_key(ctx.caller())?);
    let operator_key = disclose::hash_key(&ctx.counterparty_key(operator)?);
    if owner_key == operator_key {
        return Err(LedgerError::precondition("cannot set yourself as operator"));
    }

    let pair_key = disclose::operator_key(&ctx.pair_key(&owner_key, &operator_key));
    let approved = disclose::approval_flag(Private::new(approved));

    let mut tx = state.begin();
    tx.set_operator_approval(pair_key, approved);

    debug!("operator {} for {} set to {}", operator_key, owner_key, approved);
    Ok(Transition::finish(tx))
}

/// Transfer a token the caller holds under its own local-secret key
pub fn transfer(
    state: &LedgerState,
    ctx: &CallContext<'_>,
    to: &PublicIdentity,
    token: TokenId,
) -> LedgerResult<Transition> {
    let from = disclose::hash_key(&ctx.self_key(ctx.caller())?);
    transfer_from(state, ctx, &from, to, token)
}

/// Move `token` from `from` to `to`.
///
/// The caller must own the token, be its approved party, or be an operator
/// of its owner, and `from` must be the recorded owner. The recipient is
/// keyed as a counterparty.
pub fn transfer_from(
    state: &LedgerState,
    ctx: &CallContext<'_>,
    from: &HashKey,
    to: &PublicIdentity,
    token: TokenId,
) -> LedgerResult<Transition> {
    let owner = require_existing(state, token)?;
    ctx.validate(to, "recipient")?;

    let caller = ctx.caller_identity()?;
    let authority = authorize(state, ctx, &caller, token, &owner, true)?;

    if *from != owner {
        return Err(LedgerError::precondition("sender is not the token owner"));
    }

    let mut tx = state.begin();
    tx.clear_approval(token);
    tx.decrement_balance(from)?;

    let recipient = disclose::hash_key(&ctx.counterparty_key(to)?);
    if recipient.is_default() {
        return Err(LedgerError::precondition("recipient key cannot be default"));
    }
    tx.set_owner(token, recipient);
    tx.increment_balance(&recipient)?;

    debug!("transferred {} from {} to {} as {:?}", token, from, recipient, authority);
    Ok(Transition::finish(tx))
}

/// Destroy `token`, which must be recorded under `owner`.
///
/// Performs no caller check: anyone presenting the owner's key may burn.
/// Deployments restrict this with a [`crate::policy::MintBurnPolicy`].
pub fn burn(state: &LedgerState, owner: &HashKey, token: TokenId) -> LedgerResult<Transition> {
    let recorded = require_existing(state, token)?;
    if *owner != recorded {
        return Err(LedgerError::precondition("not the token owner"));
    }

    let mut tx = state.begin();
    tx.clear_approval(token);
    tx.decrement_balance(owner)?;
    tx.remove_owner(token)?;

    debug!("burned {}", token);
    Ok(Transition::finish(tx))
}

/// Number of tokens held by `identity`: looked up under the local-secret key
/// when the caller asks about itself and the shared-secret key otherwise
pub fn balance_of(
    state: &LedgerState,
    ctx: &CallContext<'_>,
    identity: &PublicIdentity,
) -> LedgerResult<u64> {
    let key = disclose::hash_key(&ctx.recipient_key(identity)?);
    Ok(state.balance_of(&key))
}

pub fn owner_of(state: &LedgerState, token: TokenId) -> LedgerResult<HashKey> {
    state.owner_of(token)
}

pub fn token_exists(state: &LedgerState, token: TokenId) -> bool {
    state.exists(token)
}

pub fn get_approved(state: &LedgerState, token: TokenId) -> LedgerResult<HashKey> {
    state.approved_of(token)
}

pub fn is_approved_for_all(
    state: &LedgerState,
    engine: &dyn CommitmentEngine,
    owner: &HashKey,
    operator: &HashKey,
) -> bool {
    state.is_operator_approved_for(engine, owner, operator)
}
