use crate::id::HashKey;
use std::io;
use thiserror::Error;

/// Represents all possible errors that can occur when operating on the Shade ledger
///
/// Every error aborts the operation that raised it; no partial effect is
/// ever committed.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// An operation's input or authorization check failed
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// A ledger lookup on an absent key
    #[error("Not found: {0}")]
    NotFound(String),

    /// A balance counter decrement that would go negative
    #[error("Balance underflow for {0}")]
    Underflow(HashKey),

    /// The witness has no secret configured for the caller
    #[error("Secret unavailable: {0}")]
    SecretUnavailable(String),

    /// A snapshot whose maps disagree with each other
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),

    /// IO errors that occur when reading/writing files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors that occur while appending to or replaying the ledger journal
    #[error("Journal error: {0}")]
    Journal(String),

    /// Invalid or unreadable runtime configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

/// Result alias used throughout the Shade crates
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// Shorthand for a named precondition failure
    pub fn precondition(reason: impl Into<String>) -> Self {
        LedgerError::PreconditionViolation(reason.into())
    }

    /// True for the error kinds raised by operation checks and store lookups,
    /// as opposed to IO or configuration failures
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::PreconditionViolation(_)
                | LedgerError::NotFound(_)
                | LedgerError::Underflow(_)
                | LedgerError::SecretUnavailable(_)
        )
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_message() {
        let err = LedgerError::precondition("token already exists");
        assert_eq!(err.to_string(), "Precondition violated: token already exists");
        assert!(err.is_rejection());
    }

    #[test]
    fn test_underflow_displays_key() {
        let err = LedgerError::Underflow(HashKey::new([0xab; 32]));
        assert_eq!(err.to_string(), "Balance underflow for hk:abababababab");
    }

    #[test]
    fn test_io_is_not_rejection() {
        let err: LedgerError = io::Error::new(io::ErrorKind::Other, "disk").into();
        assert!(!err.is_rejection());
    }
}
