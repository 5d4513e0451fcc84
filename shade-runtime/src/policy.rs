use serde::{Deserialize, Serialize};
use shade_core::error::{LedgerError, LedgerResult};
use shade_core::id::{HashKey, PublicIdentity, TokenId};
use std::fmt::Debug;

/// Decides who may create and destroy tokens.
///
/// The mint and burn operations themselves perform no caller check beyond
/// what the ledger requires; a runtime consults its policy first.
pub trait MintBurnPolicy: Debug + Send + Sync {
    /// Get the name of this policy
    fn name(&self) -> &'static str;

    /// Check whether `caller` may mint `token` to `to`
    fn authorize_mint(
        &self,
        caller: &PublicIdentity,
        to: &PublicIdentity,
        token: TokenId,
    ) -> LedgerResult<()>;

    /// Check whether `caller` may burn `token`, presented as held by `owner_key`
    fn authorize_burn(
        &self,
        caller: &PublicIdentity,
        owner_key: &HashKey,
        token: TokenId,
    ) -> LedgerResult<()>;
}

/// Anyone may mint and burn
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenPolicy;

impl MintBurnPolicy for OpenPolicy {
    fn name(&self) -> &'static str {
        "open"
    }

    fn authorize_mint(&self, _: &PublicIdentity, _: &PublicIdentity, _: TokenId) -> LedgerResult<()> {
        Ok(())
    }

    fn authorize_burn(&self, _: &PublicIdentity, _: &HashKey, _: TokenId) -> LedgerResult<()> {
        Ok(())
    }
}

/// Only a single controller identity may mint and burn
#[derive(Debug, Clone, Copy)]
pub struct ControllerPolicy {
    controller: PublicIdentity,
}

impl ControllerPolicy {
    pub fn new(controller: PublicIdentity) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &PublicIdentity {
        &self.controller
    }

    fn require_controller(&self, caller: &PublicIdentity, action: &str) -> LedgerResult<()> {
        if *caller != self.controller {
            return Err(LedgerError::precondition(format!(
                "only the controller may {}",
                action
            )));
        }
        Ok(())
    }
}

impl MintBurnPolicy for ControllerPolicy {
    fn name(&self) -> &'static str {
        "controller"
    }

    fn authorize_mint(
        &self,
        caller: &PublicIdentity,
        _to: &PublicIdentity,
        _token: TokenId,
    ) -> LedgerResult<()> {
        self.require_controller(caller, "mint")
    }

    fn authorize_burn(
        &self,
        caller: &PublicIdentity,
        _owner_key: &HashKey,
        _token: TokenId,
    ) -> LedgerResult<()> {
        self.require_controller(caller, "burn")
    }
}

/// Serializable choice of mint/burn policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    #[default]
    Open,
    Controller { controller: PublicIdentity },
}

impl PolicyConfig {
    pub fn build(&self) -> Box<dyn MintBurnPolicy> {
        match self {
            PolicyConfig::Open => Box::new(OpenPolicy),
            PolicyConfig::Controller { controller } => Box::new(ControllerPolicy::new(*controller)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_policy_allows_everyone() {
        let policy = PolicyConfig::default().build();
        let anyone = PublicIdentity::new([3; 32]);

        assert_eq!(policy.name(), "open");
        assert!(policy.authorize_mint(&anyone, &anyone, TokenId::new(1)).is_ok());
        assert!(policy.authorize_burn(&anyone, &HashKey::default(), TokenId::new(1)).is_ok());
    }

    #[test]
    fn test_controller_policy() {
        let controller = PublicIdentity::new([1; 32]);
        let other = PublicIdentity::new([2; 32]);
        let policy = PolicyConfig::Controller { controller }.build();

        assert_eq!(policy.name(), "controller");
        assert!(policy.authorize_mint(&controller, &other, TokenId::new(1)).is_ok());

        let err = policy.authorize_mint(&other, &other, TokenId::new(1)).unwrap_err();
        assert!(err.is_rejection());
        assert!(policy
            .authorize_burn(&other, &HashKey::default(), TokenId::new(1))
            .is_err());
    }

    #[test]
    fn test_policy_config_json() {
        let config: PolicyConfig = serde_json::from_str(r#"{"kind":"open"}"#).unwrap();
        assert_eq!(config, PolicyConfig::Open);

        let controller = PublicIdentity::new([7; 32]);
        let json = serde_json::to_string(&PolicyConfig::Controller { controller }).unwrap();
        assert!(json.contains(r#""kind":"controller""#));
        let back: PolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PolicyConfig::Controller { controller });
    }
}
