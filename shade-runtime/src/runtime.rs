use log::{debug, info, warn};
use shade_commitment::{CommitmentEngine, CommitmentKind};
use shade_core::error::{LedgerError, LedgerResult};
use shade_core::id::{HashKey, PublicIdentity, TokenId};
use shade_ledger::{FileLedgerJournal, JournalEntry, LedgerJournal, LedgerSnapshot, LedgerState};

use crate::config::RuntimeConfig;
use crate::identity::CallContext;
use crate::operations::{self, Transition};
use crate::policy::{MintBurnPolicy, OpenPolicy};
use crate::receipt::{OperationKind, OperationReceipt};
use crate::witness::WitnessProvider;

/// Owns a committed ledger and runs operations against it.
///
/// Every operation either commits in full, producing a successful receipt,
/// or leaves the ledger untouched and produces a failed one.
pub struct ShadeRuntime {
    /// The committed ledger
    state: LedgerState,
    engine: Box<dyn CommitmentEngine>,
    policy: Box<dyn MintBurnPolicy>,
    /// Durable record of committed deltas, if configured
    journal: Option<Box<dyn LedgerJournal>>,
    /// Receipts not yet drained, committed or not
    receipts: Vec<OperationReceipt>,
    /// Number of submitted operations; the next receipt sequence
    submitted: u64,
    /// Number of committed operations; the next journal sequence
    committed: u64,
    require_curve_identities: bool,
}

impl ShadeRuntime {
    /// Create an empty in-memory runtime with the default engine and an open policy
    pub fn new() -> Self {
        Self {
            state: LedgerState::new(),
            engine: CommitmentKind::default().engine(),
            policy: Box::new(OpenPolicy),
            journal: None,
            receipts: Vec::new(),
            submitted: 0,
            committed: 0,
            require_curve_identities: false,
        }
    }

    /// Create a runtime from configuration, replaying the journal if one exists
    pub fn from_config(config: &RuntimeConfig) -> LedgerResult<Self> {
        let mut runtime = Self {
            engine: config.commitment.engine(),
            policy: config.policy.build(),
            require_curve_identities: config.require_curve_identities,
            ..Self::new()
        };

        if let Some(path) = &config.journal_path {
            let journal = FileLedgerJournal::open(path)?;
            let state = journal.replay()?;
            state.snapshot().verify_invariants()?;
            runtime.committed = journal.entries().count() as u64;
            runtime.state = state;
            runtime.journal = Some(Box::new(journal));
            info!(
                "replayed {} operations from {}",
                runtime.committed,
                path.display()
            );
        }

        info!(
            "runtime ready: engine {}, policy {}",
            runtime.engine.name(),
            runtime.policy.name()
        );
        Ok(runtime)
    }

    /// Replace the ledger with a previously captured state
    pub fn with_state(mut self, state: LedgerState) -> LedgerResult<Self> {
        state.snapshot().verify_invariants()?;
        self.state = state;
        Ok(self)
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.snapshot()
    }

    pub fn engine(&self) -> &dyn CommitmentEngine {
        self.engine.as_ref()
    }

    pub fn policy(&self) -> &dyn MintBurnPolicy {
        self.policy.as_ref()
    }

    pub fn receipts(&self) -> &[OperationReceipt] {
        &self.receipts
    }

    /// Hand over the receipts collected so far and stop holding them
    pub fn drain_receipts(&mut self) -> Vec<OperationReceipt> {
        std::mem::take(&mut self.receipts)
    }

    pub fn committed_count(&self) -> u64 {
        self.committed
    }

    fn context<'a>(
        &'a self,
        caller: &PublicIdentity,
        witness: &'a dyn WitnessProvider,
    ) -> LedgerResult<CallContext<'a>> {
        let ctx = CallContext::new(*caller, witness, self.engine.as_ref())
            .with_curve_check(self.require_curve_identities);
        ctx.validate(caller, "caller")?;
        Ok(ctx)
    }

    /// Journal and apply a successful transition, and record a receipt either way
    fn commit(
        &mut self,
        operation: OperationKind,
        token: Option<TokenId>,
        result: LedgerResult<Transition>,
    ) -> LedgerResult<OperationReceipt> {
        let sequence = self.submitted;
        self.submitted += 1;

        let transition = match result.and_then(|transition| self.journal(operation, transition)) {
            Ok(transition) => transition,
            Err(err) => {
                warn!("{} rejected: {}", operation, err);
                self.receipts
                    .push(OperationReceipt::rejected(sequence, operation, token, &err));
                return Err(err);
            }
        };

        self.state.apply(&transition.delta);
        self.committed += 1;

        let receipt = OperationReceipt::committed(sequence, operation, token, transition.effects);
        debug!(
            "{} committed with {} effects",
            operation,
            receipt.effect_count()
        );
        self.receipts.push(receipt.clone());
        Ok(receipt)
    }

    fn journal(&self, operation: OperationKind, transition: Transition) -> LedgerResult<Transition> {
        if let Some(journal) = &self.journal {
            let entry = JournalEntry::new(self.committed, operation.name(), transition.delta.clone());
            journal.record(&entry)?;
        }
        Ok(transition)
    }

    pub fn mint(
        &mut self,
        caller: &PublicIdentity,
        witness: &dyn WitnessProvider,
        to: &PublicIdentity,
        token: TokenId,
    ) -> LedgerResult<OperationReceipt> {
        let result = self.policy.authorize_mint(caller, to, token).and_then(|_| {
            let ctx = self.context(caller, witness)?;
            operations::mint(&self.state, &ctx, to, token)
        });
        self.commit(OperationKind::Mint, Some(token), result)
    }

    pub fn approve(
        &mut self,
        caller: &PublicIdentity,
        witness: &dyn WitnessProvider,
        to: &PublicIdentity,
        token: TokenId,
    ) -> LedgerResult<OperationReceipt> {
        let result = self
            .context(caller, witness)
            .and_then(|ctx| operations::approve(&self.state, &ctx, to, token));
        self.commit(OperationKind::Approve, Some(token), result)
    }

    pub fn set_approval_for_all(
        &mut self,
        caller: &PublicIdentity,
        witness: &dyn WitnessProvider,
        operator: &PublicIdentity,
        approved: bool,
    ) -> LedgerResult<OperationReceipt> {
        let result = self.context(caller, witness).and_then(|ctx| {
            operations::set_approval_for_all(&self.state, &ctx, operator, approved)
        });
        self.commit(OperationKind::SetApprovalForAll, None, result)
    }

    pub fn transfer(
        &mut self,
        caller: &PublicIdentity,
        witness: &dyn WitnessProvider,
        to: &PublicIdentity,
        token: TokenId,
    ) -> LedgerResult<OperationReceipt> {
        let result = self
            .context(caller, witness)
            .and_then(|ctx| operations::transfer(&self.state, &ctx, to, token));
        self.commit(OperationKind::Transfer, Some(token), result)
    }

    pub fn transfer_from(
        &mut self,
        caller: &PublicIdentity,
        witness: &dyn WitnessProvider,
        from: &HashKey,
        to: &PublicIdentity,
        token: TokenId,
    ) -> LedgerResult<OperationReceipt> {
        let result = self
            .context(caller, witness)
            .and_then(|ctx| operations::transfer_from(&self.state, &ctx, from, to, token));
        self.commit(OperationKind::TransferFrom, Some(token), result)
    }

    /// Burn `token`, presented as held under `owner_key`. Needs no witness.
    pub fn burn(
        &mut self,
        caller: &PublicIdentity,
        owner_key: &HashKey,
        token: TokenId,
    ) -> LedgerResult<OperationReceipt> {
        let result = self
            .policy
            .authorize_burn(caller, owner_key, token)
            .and_then(|_| operations::burn(&self.state, owner_key, token));
        self.commit(OperationKind::Burn, Some(token), result)
    }

    pub fn balance_of(
        &self,
        caller: &PublicIdentity,
        witness: &dyn WitnessProvider,
        identity: &PublicIdentity,
    ) -> LedgerResult<u64> {
        let ctx = self.context(caller, witness)?;
        operations::balance_of(&self.state, &ctx, identity)
    }

    pub fn owner_of(&self, token: TokenId) -> LedgerResult<HashKey> {
        operations::owner_of(&self.state, token)
    }

    pub fn token_exists(&self, token: TokenId) -> bool {
        operations::token_exists(&self.state, token)
    }

    pub fn get_approved(&self, token: TokenId) -> LedgerResult<HashKey> {
        operations::get_approved(&self.state, token)
    }

    pub fn is_approved_for_all(&self, owner: &HashKey, operator: &HashKey) -> bool {
        operations::is_approved_for_all(&self.state, self.engine.as_ref(), owner, operator)
    }
}

impl Default for ShadeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShadeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadeRuntime")
            .field("tokens", &self.state.token_count())
            .field("engine", &self.engine.name())
            .field("policy", &self.policy.name())
            .field("journaled", &self.journal.is_some())
            .field("committed", &self.committed)
            .finish()
    }
}
