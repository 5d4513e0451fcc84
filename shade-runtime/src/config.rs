use anyhow::Context;
use serde::{Deserialize, Serialize};
use shade_commitment::CommitmentKind;
use shade_core::error::{LedgerError, LedgerResult};
use std::fs;
use std::path::{Path, PathBuf};

use crate::policy::PolicyConfig;

/// Settings for a [`crate::runtime::ShadeRuntime`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub commitment: CommitmentKind,

    #[serde(default)]
    pub policy: PolicyConfig,

    /// Where committed operations are journaled; no journal when unset
    #[serde(default)]
    pub journal_path: Option<PathBuf>,

    /// Reject identities that are not compressed Edwards points
    #[serde(default)]
    pub require_curve_identities: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            commitment: CommitmentKind::default(),
            policy: PolicyConfig::default(),
            journal_path: None,
            require_curve_identities: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> LedgerResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| LedgerError::Config(format!("unable to parse config: {}", err)))
    }

    pub fn load(path: &Path) -> LedgerResult<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_string_pretty(self)
            .map_err(|err| LedgerError::Config(format!("unable to encode config: {}", err)))?;
        fs::write(path, encoded)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }
}
