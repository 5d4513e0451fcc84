use serde::{Deserialize, Serialize};
use shade_core::disclose::Private;
use shade_core::id::{HashKey, PublicIdentity, Secret};
use std::fmt;

use crate::blake3_engine::Blake3Commitment;
use crate::sha256::Sha256Commitment;

/// Domain separation tag for identity commitments
pub const HASH_KEY_TAG: &[u8] = b"shade/hash-key:v1";

/// Domain separation tag for owner/operator pair keys
pub const OPERATOR_PAIR_TAG: &[u8] = b"shade/operator-pair:v1";

/// A one-way commitment from identities to ledger keys
///
/// Implementations must be pure and deterministic, and must keep
/// `derive_hash_key` and `pair_hash_key` in separate domains so that an
/// identity commitment can never equal a pair key.
pub trait CommitmentEngine: fmt::Debug + Send + Sync {
    /// Get a string identifier for this engine
    fn name(&self) -> &str;

    /// Commit to an identity under a secret
    ///
    /// # Parameters
    /// * `identity` - The raw public identity
    /// * `secret` - The local or shared secret supplied by the witness
    ///
    /// # Returns
    /// The derived key, still private until disclosed
    fn derive_hash_key(&self, identity: &PublicIdentity, secret: &Secret) -> Private<HashKey>;

    /// Combine an owner key and an operator key into the single key used by
    /// the operator-approval set. The order of the arguments matters.
    fn pair_hash_key(&self, owner: &HashKey, operator: &HashKey) -> Private<HashKey>;
}

/// The commitment engines a deployment can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentKind {
    #[default]
    Sha256,
    Blake3,
}

impl CommitmentKind {
    /// Build the engine for this kind
    pub fn engine(&self) -> Box<dyn CommitmentEngine> {
        match self {
            CommitmentKind::Sha256 => Box::new(Sha256Commitment::new()),
            CommitmentKind::Blake3 => Box::new(Blake3Commitment::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::disclose;

    #[test]
    fn test_kind_builds_matching_engine() {
        assert_eq!(CommitmentKind::Sha256.engine().name(), "sha256");
        assert_eq!(CommitmentKind::Blake3.engine().name(), "blake3");
        assert_eq!(CommitmentKind::default(), CommitmentKind::Sha256);
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&CommitmentKind::Blake3).unwrap();
        assert_eq!(json, "\"blake3\"");
    }

    #[test]
    fn test_engines_disagree() {
        let identity = PublicIdentity::new([4; 32]);
        let secret = Secret::new([8; 32]);

        let sha = CommitmentKind::Sha256.engine();
        let blake = CommitmentKind::Blake3.engine();

        assert_ne!(
            disclose::hash_key(&sha.derive_hash_key(&identity, &secret)),
            disclose::hash_key(&blake.derive_hash_key(&identity, &secret)),
        );
    }
}
