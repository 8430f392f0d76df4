//! Well-known Solana clusters.

use serde::{Deserialize, Serialize};

/// Public JSON-RPC endpoint for Solana devnet.
pub const DEVNET_ENDPOINT: &str = "https://api.devnet.solana.com";

/// Public JSON-RPC endpoint for Solana mainnet-beta.
pub const MAINNET_BETA_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

/// A Solana cluster payments are confirmed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    /// Devnet, used in test mode.
    #[default]
    Devnet,
    /// Mainnet-beta, used in production.
    MainnetBeta,
}

impl Cluster {
    /// Devnet when `test_mode` is set, mainnet-beta otherwise.
    #[must_use]
    pub const fn from_test_mode(test_mode: bool) -> Self {
        if test_mode {
            Self::Devnet
        } else {
            Self::MainnetBeta
        }
    }

    /// The public JSON-RPC endpoint of this cluster.
    #[must_use]
    pub const fn rpc_endpoint(self) -> &'static str {
        match self {
            Self::Devnet => DEVNET_ENDPOINT,
            Self::MainnetBeta => MAINNET_BETA_ENDPOINT,
        }
    }
}
