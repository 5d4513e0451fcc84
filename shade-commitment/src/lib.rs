pub mod blake3_engine;
pub mod engine;
pub mod sha256;

// Re-export the main types for convenience
pub use blake3_engine::Blake3Commitment;
pub use engine::{CommitmentEngine, CommitmentKind, HASH_KEY_TAG, OPERATOR_PAIR_TAG};
pub use sha256::Sha256Commitment;
