use sha2::{Digest, Sha256};
use shade_core::error::{LedgerError, LedgerResult};
use shade_core::id::{PublicIdentity, Secret};
use std::collections::HashMap;
use std::sync::Arc;

const LOCAL_SECRET_TAG: &[u8] = b"shade/witness/local:v1";
const SHARED_SECRET_TAG: &[u8] = b"shade/witness/shared:v1";

/// Supplies the secrets of the party invoking an operation
pub trait WitnessProvider: Send + Sync {
    /// Secret used when the caller derives its own key
    fn local_secret(&self) -> LedgerResult<Secret>;

    /// Secret used when deriving the key of a counterparty
    fn shared_secret(&self) -> LedgerResult<Secret>;
}

/// A witness holding fixed secrets, either of which may be missing
#[derive(Debug, Clone, Default)]
pub struct StaticWitness {
    local: Option<Secret>,
    shared: Option<Secret>,
}

impl StaticWitness {
    pub fn new(local: Secret, shared: Secret) -> Self {
        Self {
            local: Some(local),
            shared: Some(shared),
        }
    }

    /// A witness with no secrets configured
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, local: Secret) -> Self {
        self.local = Some(local);
        self
    }

    pub fn with_shared(mut self, shared: Secret) -> Self {
        self.shared = Some(shared);
        self
    }
}

impl WitnessProvider for StaticWitness {
    fn local_secret(&self) -> LedgerResult<Secret> {
        self.local
            .clone()
            .ok_or_else(|| LedgerError::SecretUnavailable("no local secret configured".to_string()))
    }

    fn shared_secret(&self) -> LedgerResult<Secret> {
        self.shared
            .clone()
            .ok_or_else(|| LedgerError::SecretUnavailable("no shared secret configured".to_string()))
    }
}

/// A witness that derives its secrets from seeds.
///
/// The local secret comes from the party's own seed; the shared secret from
/// a seed the party shares with its counterparties.
#[derive(Debug, Clone)]
pub struct SeededWitness {
    local: Secret,
    shared: Secret,
}

impl SeededWitness {
    pub fn new(own_seed: &[u8; 32], shared_seed: &[u8; 32]) -> Self {
        Self {
            local: Self::derive(LOCAL_SECRET_TAG, own_seed),
            shared: Self::derive(SHARED_SECRET_TAG, shared_seed),
        }
    }

    fn derive(tag: &[u8], seed: &[u8; 32]) -> Secret {
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(seed);
        Secret::new(hasher.finalize().into())
    }
}

impl WitnessProvider for SeededWitness {
    fn local_secret(&self) -> LedgerResult<Secret> {
        Ok(self.local.clone())
    }

    fn shared_secret(&self) -> LedgerResult<Secret> {
        Ok(self.shared.clone())
    }
}

/// Witnesses for several parties, looked up by public identity
#[derive(Default, Clone)]
pub struct WitnessRegistry {
    witnesses: HashMap<PublicIdentity, Arc<dyn WitnessProvider>>,
}

impl WitnessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identity: PublicIdentity, witness: Arc<dyn WitnessProvider>) {
        self.witnesses.insert(identity, witness);
    }

    /// Get the witness of a party
    pub fn witness_for(&self, identity: &PublicIdentity) -> LedgerResult<Arc<dyn WitnessProvider>> {
        self.witnesses
            .get(identity)
            .cloned()
            .ok_or_else(|| LedgerError::SecretUnavailable(format!("no witness for {}", identity)))
    }

    pub fn len(&self) -> usize {
        self.witnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_witness_missing_secrets() {
        let witness = StaticWitness::empty().with_shared(Secret::new([2; 32]));

        assert!(matches!(
            witness.local_secret(),
            Err(LedgerError::SecretUnavailable(_))
        ));
        assert_eq!(witness.shared_secret().unwrap(), Secret::new([2; 32]));
    }

    #[test]
    fn test_seeded_witness_roles_differ() {
        let witness = SeededWitness::new(&[1; 32], &[1; 32]);
        assert_ne!(witness.local_secret().unwrap(), witness.shared_secret().unwrap());
    }

    #[test]
    fn test_seeded_witnesses_share_the_shared_secret() {
        let alice = SeededWitness::new(&[1; 32], &[9; 32]);
        let bob = SeededWitness::new(&[2; 32], &[9; 32]);

        assert_eq!(alice.shared_secret().unwrap(), bob.shared_secret().unwrap());
        assert_ne!(alice.local_secret().unwrap(), bob.local_secret().unwrap());
    }

    #[test]
    fn test_registry_lookup() {
        let alice = PublicIdentity::new([1; 32]);
        let mut registry = WitnessRegistry::new();
        registry.register(alice, Arc::new(SeededWitness::new(&[1; 32], &[9; 32])));

        assert_eq!(registry.len(), 1);
        assert!(registry.witness_for(&alice).is_ok());
        assert!(registry.witness_for(&PublicIdentity::new([2; 32])).is_err());
    }
}
