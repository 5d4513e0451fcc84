pub mod disclose;
pub mod error;
pub mod id;

// Re-export the main types for convenience
pub use disclose::Private;
pub use error::{LedgerError, LedgerResult};
pub use id::{HashKey, PublicIdentity, Secret, TokenId};
