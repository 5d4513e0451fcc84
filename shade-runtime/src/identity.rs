use shade_commitment::CommitmentEngine;
use shade_core::disclose::Private;
use shade_core::error::{LedgerError, LedgerResult};
use shade_core::id::{HashKey, PublicIdentity};

use crate::witness::WitnessProvider;

/// Whether an identity is the caller of the current operation or someone else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Caller,
    Counterparty,
}

/// A public identity together with both of its ledger keys, as seen by the
/// current caller.
///
/// `as_self` is the key derived with the caller's local secret and
/// `as_counterparty` the key derived with the shared secret. The two are
/// unlinkable on the ledger.
#[derive(Debug, Clone)]
pub struct Identity {
    public: PublicIdentity,
    role: Role,
    self_key: Private<HashKey>,
    counterparty_key: Private<HashKey>,
}

impl Identity {
    pub fn public(&self) -> &PublicIdentity {
        &self.public
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn as_self(&self) -> &Private<HashKey> {
        &self.self_key
    }

    pub fn as_counterparty(&self) -> &Private<HashKey> {
        &self.counterparty_key
    }
}

/// Everything an operation needs to know about who is calling it
pub struct CallContext<'a> {
    caller: PublicIdentity,
    witness: &'a dyn WitnessProvider,
    engine: &'a dyn CommitmentEngine,
    require_curve_identities: bool,
}

impl<'a> CallContext<'a> {
    pub fn new(
        caller: PublicIdentity,
        witness: &'a dyn WitnessProvider,
        engine: &'a dyn CommitmentEngine,
    ) -> Self {
        Self {
            caller,
            witness,
            engine,
            require_curve_identities: false,
        }
    }

    /// Reject identities that are not valid curve points
    pub fn with_curve_check(mut self, enabled: bool) -> Self {
        self.require_curve_identities = enabled;
        self
    }

    pub fn caller(&self) -> &PublicIdentity {
        &self.caller
    }

    pub fn engine(&self) -> &'a dyn CommitmentEngine {
        self.engine
    }

    /// Check that an identity argument names somebody
    ///
    /// # Parameters
    /// * `identity` - The identity to check
    /// * `what` - The argument's role, used in the error message
    pub fn validate(&self, identity: &PublicIdentity, what: &str) -> LedgerResult<()> {
        if identity.is_empty() {
            return Err(LedgerError::precondition(format!("{} cannot be empty", what)));
        }
        if self.require_curve_identities && !identity.is_on_curve() {
            return Err(LedgerError::precondition(format!(
                "{} {} is not a valid public key",
                what, identity
            )));
        }
        Ok(())
    }

    pub fn role_of(&self, identity: &PublicIdentity) -> Role {
        if *identity == self.caller {
            Role::Caller
        } else {
            Role::Counterparty
        }
    }

    /// Key of `identity` under the caller's local secret
    pub fn self_key(&self, identity: &PublicIdentity) -> LedgerResult<Private<HashKey>> {
        let secret = self.witness.local_secret()?;
        Ok(self.engine.derive_hash_key(identity, &secret))
    }

    /// Key of `identity` under the caller's shared secret
    pub fn counterparty_key(&self, identity: &PublicIdentity) -> LedgerResult<Private<HashKey>> {
        let secret = self.witness.shared_secret()?;
        Ok(self.engine.derive_hash_key(identity, &secret))
    }

    /// Key under which `identity` receives a token from the caller: the
    /// local-secret key when the caller is the recipient, the shared-secret
    /// key otherwise
    pub fn recipient_key(&self, identity: &PublicIdentity) -> LedgerResult<Private<HashKey>> {
        match self.role_of(identity) {
            Role::Caller => self.self_key(identity),
            Role::Counterparty => self.counterparty_key(identity),
        }
    }

    /// Resolve both keys of an identity
    pub fn identify(&self, identity: &PublicIdentity) -> LedgerResult<Identity> {
        Ok(Identity {
            public: *identity,
            role: self.role_of(identity),
            self_key: self.self_key(identity)?,
            counterparty_key: self.counterparty_key(identity)?,
        })
    }

    /// Resolve both keys of the caller
    pub fn caller_identity(&self) -> LedgerResult<Identity> {
        self.identify(&self.caller)
    }

    /// Combined key for the operator-approval set
    pub fn pair_key(&self, owner: &HashKey, operator: &HashKey) -> Private<HashKey> {
        self.engine.pair_hash_key(owner, operator)
    }
}
