//! Per-chain configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use tidal_types::{ChainId, HolderId, Rate};

use crate::NodeError;

/// Configuration for one chain.
///
/// Loaded from TOML via [`ChainConfig::from_toml_file`] or built directly in
/// tests. Missing keys take the defaults below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Human label used in logs and reports.
    #[serde(default = "default_name")]
    pub name: String,

    /// Starting global rate as an annual simple rate in basis points.
    #[serde(default = "default_initial_rate_bps")]
    pub initial_rate_bps: u32,

    /// Holds the admin role; granted `RateSetter` at startup.
    #[serde(default = "default_admin")]
    pub admin: HolderId,

    /// Identity the bridge coordinator mints and burns as.
    #[serde(default = "default_bridge_operator")]
    pub bridge_operator: HolderId,

    /// Identity the vault mints and burns as.
    #[serde(default = "default_vault_operator")]
    pub vault_operator: HolderId,

    /// Chains this chain accepts bridge messages from and sends to.
    #[serde(default)]
    pub peers: Vec<u64>,

    /// Native value placed in the reserve at startup to pay interest.
    #[serde(default)]
    pub rewards_pool: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_chain_id() -> u64 {
    1
}

fn default_name() -> String {
    "local".to_string()
}

fn default_initial_rate_bps() -> u32 {
    500
}

fn default_admin() -> HolderId {
    HolderId::new("tdl_admin")
}

fn default_bridge_operator() -> HolderId {
    HolderId::new("tdl_bridge")
}

fn default_vault_operator() -> HolderId {
    HolderId::new("tdl_vault")
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ChainConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn chain(&self) -> ChainId {
        ChainId::new(self.chain_id)
    }

    pub fn initial_rate(&self) -> Rate {
        Rate::from_annual_bps(self.initial_rate_bps)
    }

    pub fn peer_chains(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.peers.iter().map(|p| ChainId::new(*p))
    }

    /// Reject configurations a node cannot start from.
    pub fn validate(&self) -> Result<(), NodeError> {
        for (field, id) in [
            ("admin", &self.admin),
            ("bridge_operator", &self.bridge_operator),
            ("vault_operator", &self.vault_operator),
        ] {
            if !id.is_valid() {
                return Err(NodeError::Config(format!(
                    "{field} {:?} is not a valid holder id",
                    id.as_str()
                )));
            }
        }
        if self.peers.contains(&self.chain_id) {
            return Err(NodeError::Config(format!(
                "chain {} lists itself as a peer",
                self.chain_id
            )));
        }
        let unique: HashSet<_> = self.peers.iter().collect();
        if unique.len() != self.peers.len() {
            return Err(NodeError::Config("duplicate peer chain ids".into()));
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            name: default_name(),
            initial_rate_bps: default_initial_rate_bps(),
            admin: default_admin(),
            bridge_operator: default_bridge_operator(),
            vault_operator: default_vault_operator(),
            peers: Vec::new(),
            rewards_pool: 0,
        }
    }
}
