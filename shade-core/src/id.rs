use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;
use std::ops::Deref;

/// Serde helper for 32-byte values: hex strings in human-readable formats,
/// raw bytes otherwise.
pub(crate) mod hex32 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            bytes.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        if deserializer.is_human_readable() {
            let encoded = String::deserialize(deserializer)?;
            let decoded = hex::decode(&encoded).map_err(D::Error::custom)?;
            decoded
                .try_into()
                .map_err(|_| D::Error::custom("expected 32 bytes of hex"))
        } else {
            <[u8; 32]>::deserialize(deserializer)
        }
    }
}

/// TokenId identifies a single non-fungible token.
///
/// Zero is representable but never names an existing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TokenId(u64);

impl TokenId {
    pub fn new(id: u64) -> Self {
        TokenId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        TokenId(id)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token:{}", self.0)
    }
}

/// An opaque 32 byte commitment derived from a raw identity and a secret.
/// The same identity maps to different keys under different secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct HashKey(#[serde(with = "hex32")] [u8; 32]);

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hk:{}", hex::encode(&self.0[0..6]))
    }
}

impl Deref for HashKey {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl HashKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        HashKey(bytes)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// True for the all-zero key, which never identifies a holder
    pub fn is_default(&self) -> bool {
        self.0 == [0; 32]
    }
}

/// PublicIdentity is a raw identity as presented by a caller: the bytes of
/// its public key. The ledger never stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PublicIdentity(#[serde(with = "hex32")] [u8; 32]);

impl fmt::Display for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "id:{}", prefix)
    }
}

impl Deref for PublicIdentity {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PublicIdentity {
    pub fn new(bytes: [u8; 32]) -> Self {
        PublicIdentity(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// The all-zero identity stands for "no recipient"
    pub fn is_empty(&self) -> bool {
        self.0 == [0; 32]
    }

    /// Derive the compressed Edwards public key for a 32 byte signing seed
    pub fn from_signing_seed(seed: &[u8; 32]) -> Self {
        let digest = Sha512::digest(seed);
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&digest);

        let scalar = Scalar::from_bytes_mod_order_wide(&wide);
        PublicIdentity(EdwardsPoint::mul_base(&scalar).compress().to_bytes())
    }

    /// Check that the bytes decode to a point on the ed25519 curve
    pub fn is_on_curve(&self) -> bool {
        let Ok(compressed_edwards_y) = CompressedEdwardsY::from_slice(self.0.as_ref()) else {
            return false;
        };
        compressed_edwards_y.decompress().is_some()
    }
}

/// A 32 byte secret supplied by the witness. Never printed, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; 32]);

impl Secret {
    pub fn new(bytes: [u8; 32]) -> Self {
        Secret(bytes)
    }

    /// Raw secret bytes, for feeding a commitment engine
    pub fn expose_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_default_hash_key() {
        let default_key = HashKey::default();
        assert_eq!(*default_key, [0u8; 32]);
        assert!(default_key.is_default());
        assert!(!HashKey::new([1; 32]).is_default());
    }

    #[test]
    fn test_token_id_zero() {
        assert!(TokenId::new(0).is_zero());
        assert!(!TokenId::from(7).is_zero());
        assert_eq!(TokenId::new(7).to_string(), "token:7");
    }

    #[test]
    fn test_hash_key_ordering() {
        let low = HashKey::new([1; 32]);
        let high = HashKey::new([2; 32]);
        assert!(low < high);
    }

    #[test]
    fn test_hash_key_json_is_hex() {
        let key = HashKey::new([0x0f; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "0f".repeat(32)));

        let back: HashKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_hash_key_json_rejects_short_hex() {
        let result: Result<HashKey, _> = serde_json::from_str("\"abcd\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_hash_key_bincode_is_raw() {
        let key = HashKey::new([3; 32]);
        let bytes = bincode::serialize(&key).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bincode::deserialize::<HashKey>(&bytes).unwrap(), key);
    }

    #[test]
    fn test_identity_from_seed_is_on_curve() {
        let alice = PublicIdentity::from_signing_seed(&[1; 32]);
        let again = PublicIdentity::from_signing_seed(&[1; 32]);
        let bob = PublicIdentity::from_signing_seed(&[2; 32]);

        assert_eq!(alice, again);
        assert_ne!(alice, bob);
        assert!(alice.is_on_curve());
        assert!(!alice.is_empty());
    }

    #[test]
    fn test_empty_identity() {
        assert!(PublicIdentity::default().is_empty());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new([9; 32]);
        assert_eq!(format!("{:?}", secret), "Secret(<redacted>)");
    }
}
