use chrono::Utc;
use serde::{Deserialize, Serialize};
use shade_core::id::TokenId;
use shade_ledger::LedgerEffect;
use std::fmt;

/// The ledger operation a receipt was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Mint,
    Approve,
    SetApprovalForAll,
    Transfer,
    TransferFrom,
    Burn,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Mint => "mint",
            OperationKind::Approve => "approve",
            OperationKind::SetApprovalForAll => "set_approval_for_all",
            OperationKind::Transfer => "transfer",
            OperationKind::TransferFrom => "transfer_from",
            OperationKind::Burn => "burn",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one operation submitted to a runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReceipt {
    /// Position of the operation in the runtime's history
    pub sequence: u64,

    pub operation: OperationKind,

    /// The token acted on, if the operation names one
    pub token: Option<TokenId>,

    /// Whether the operation was committed
    pub success: bool,

    /// Milliseconds since the Unix epoch when the operation was processed
    pub timestamp: i64,

    /// Why the operation was rejected (if not successful)
    pub error_message: Option<String>,

    /// Before and after images of every ledger entry the operation changed
    #[serde(default)]
    pub effects: Vec<LedgerEffect>,
}

impl OperationReceipt {
    /// Receipt for a committed operation
    pub fn committed(
        sequence: u64,
        operation: OperationKind,
        token: Option<TokenId>,
        effects: Vec<LedgerEffect>,
    ) -> Self {
        Self {
            sequence,
            operation,
            token,
            success: true,
            timestamp: Utc::now().timestamp_millis(),
            error_message: None,
            effects,
        }
    }

    /// Receipt for a rejected operation
    pub fn rejected(
        sequence: u64,
        operation: OperationKind,
        token: Option<TokenId>,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            sequence,
            operation,
            token,
            success: false,
            timestamp: Utc::now().timestamp_millis(),
            error_message: Some(error.to_string()),
            effects: Vec::new(),
        }
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::error::LedgerError;
    use shade_core::id::HashKey;

    #[test]
    fn test_receipt_states() {
        let effect = LedgerEffect::Balance {
            key: HashKey::new([1; 32]),
            before: 0,
            after: 1,
        };
        let ok = OperationReceipt::committed(0, OperationKind::Mint, Some(TokenId::new(1)), vec![effect]);
        assert!(ok.success);
        assert!(ok.error_message.is_none());
        assert_eq!(ok.effect_count(), 1);

        let failed = OperationReceipt::rejected(
            1,
            OperationKind::Burn,
            Some(TokenId::new(1)),
            LedgerError::precondition("not the token owner"),
        );
        assert!(!failed.success);
        assert_eq!(failed.effect_count(), 0);
        assert!(failed
            .error_message
            .as_deref()
            .is_some_and(|msg| msg.contains("not the token owner")));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(OperationKind::SetApprovalForAll.to_string(), "set_approval_for_all");
        let json = serde_json::to_string(&OperationKind::TransferFrom).unwrap();
        assert_eq!(json, r#""transfer_from""#);
    }
}
