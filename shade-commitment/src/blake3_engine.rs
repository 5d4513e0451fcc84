use shade_core::disclose::Private;
use shade_core::id::{HashKey, PublicIdentity, Secret};

use crate::engine::CommitmentEngine;

const HASH_KEY_CONTEXT: &str = "shade 2026-01-01 hash-key v1";
const OPERATOR_PAIR_CONTEXT: &str = "shade 2026-01-01 operator-pair v1";

/// BLAKE3 commitment engine using derive-key mode, one context per domain
#[derive(Debug, Clone, Default)]
pub struct Blake3Commitment;

impl Blake3Commitment {
    pub fn new() -> Self {
        Self
    }

    fn digest(context: &str, left: &[u8; 32], right: &[u8; 32]) -> HashKey {
        let mut hasher = blake3::Hasher::new_derive_key(context);
        hasher.update(left);
        hasher.update(right);
        HashKey::new(*hasher.finalize().as_bytes())
    }
}

impl CommitmentEngine for Blake3Commitment {
    fn name(&self) -> &str {
        "blake3"
    }

    fn derive_hash_key(&self, identity: &PublicIdentity, secret: &Secret) -> Private<HashKey> {
        Private::new(Self::digest(HASH_KEY_CONTEXT, identity, secret.expose_bytes()))
    }

    fn pair_hash_key(&self, owner: &HashKey, operator: &HashKey) -> Private<HashKey> {
        Private::new(Self::digest(OPERATOR_PAIR_CONTEXT, owner, operator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::disclose;

    #[test]
    fn test_blake3_domains_are_separate() {
        let engine = Blake3Commitment::new();
        let identity = PublicIdentity::new([7; 32]);
        let secret = Secret::new([9; 32]);

        let key = disclose::hash_key(&engine.derive_hash_key(&identity, &secret));
        let pair = disclose::operator_key(
            &engine.pair_hash_key(&HashKey::new([7; 32]), &HashKey::new([9; 32])),
        );

        assert_ne!(key, pair);
        assert_eq!(key, disclose::hash_key(&engine.derive_hash_key(&identity, &secret)));
    }
}
