use log::trace;
use sha2::{Digest, Sha256};
use shade_core::disclose::Private;
use shade_core::id::{HashKey, PublicIdentity, Secret};

use crate::engine::{CommitmentEngine, HASH_KEY_TAG, OPERATOR_PAIR_TAG};

/// SHA-256 commitment engine, the default
#[derive(Debug, Clone, Default)]
pub struct Sha256Commitment;

impl Sha256Commitment {
    pub fn new() -> Self {
        Self
    }

    fn digest(tag: &[u8], left: &[u8; 32], right: &[u8; 32]) -> HashKey {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(tag);
        hasher.update(left);
        hasher.update(right);

        HashKey::new(hasher.finalize().into())
    }
}

impl CommitmentEngine for Sha256Commitment {
    fn name(&self) -> &str {
        "sha256"
    }

    fn derive_hash_key(&self, identity: &PublicIdentity, secret: &Secret) -> Private<HashKey> {
        trace!("sha256 commitment for {}", identity);
        Private::new(Self::digest(HASH_KEY_TAG, identity, secret.expose_bytes()))
    }

    fn pair_hash_key(&self, owner: &HashKey, operator: &HashKey) -> Private<HashKey> {
        Private::new(Self::digest(OPERATOR_PAIR_TAG, owner, operator))
    }
}
