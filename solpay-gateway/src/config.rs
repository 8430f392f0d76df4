//! Gateway configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 4021
//! enabled = true
//! test_mode = false
//! merchant_wallet = "$MERCHANT_WALLET"
//! currency = "USDC"
//! label = "Acme Coffee"
//! session_ttl_secs = 86400
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `config.toml`)
//! - `HOST` - Override server bind address
//! - `PORT` - Override server port
//! - Any variable referenced by `$VAR` in the config file

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solpay::address::InvalidAddress;
use solpay::{Address, Cluster, Currency, PaymentConfirmer, RpcClient, RpcClientError};

use crate::handlers::CheckoutSettings;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Server port (default: `4021`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether Solana Pay is offered at checkout.
    #[serde(default)]
    pub enabled: bool,

    /// Devnet when set, mainnet-beta otherwise (default: `true`).
    #[serde(default = "default_true")]
    pub test_mode: bool,

    /// Explicit JSON-RPC endpoint; overrides the cluster endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Outbound RPC timeout, also the bound on one confirmation (default: `45`).
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Lifetime of a stored session and its reference (default: 24 hours).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Merchant wallet receiving all payments.
    /// Supports `$VAR` / `${VAR}` for environment variable expansion.
    #[serde(default)]
    pub merchant_wallet: String,

    /// Token products are priced in.
    #[serde(default)]
    pub currency: Currency,

    /// Store name shown in the payer's wallet.
    #[serde(default = "default_label")]
    pub label: String,

    /// Payment method description shown at checkout.
    #[serde(default = "default_description")]
    pub description: String,

    /// Text shown after a successful payment.
    #[serde(default = "default_instructions")]
    pub instructions: String,
}

/// Errors raised while loading or applying configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`GatewayConfig`].
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// `merchant_wallet` is set but is not a Solana address.
    #[error("invalid merchant_wallet: {0}")]
    MerchantWallet(#[from] InvalidAddress),

    /// The RPC endpoint is not a valid URL.
    #[error("invalid rpc_url: {0}")]
    RpcUrl(#[from] RpcClientError),

    /// A duration setting is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0))
}

const fn default_port() -> u16 {
    4021
}

const fn default_true() -> bool {
    true
}

const fn default_rpc_timeout_secs() -> u64 {
    45
}

const fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_label() -> String {
    "Solana Pay".to_owned()
}

fn default_description() -> String {
    "Complete your payment with Solana Pay.".to_owned()
}

fn default_instructions() -> String {
    "Thank you for using Solana Pay".to_owned()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enabled: false,
            test_mode: true,
            rpc_url: None,
            rpc_timeout_secs: default_rpc_timeout_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            merchant_wallet: String::new(),
            currency: Currency::default(),
            label: default_label(),
            description: default_description(),
            instructions: default_instructions(),
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from a specific file path.
    ///
    /// A missing file yields the defaults. After parsing, `HOST` and `PORT`
    /// env vars override the file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };

        let mut config = Self::from_toml_str(&content)?;

        if let Ok(host) = std::env::var("HOST") {
            if let Ok(addr) = host.parse() {
                config.host = addr;
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }

        Ok(config)
    }

    /// Parses configuration from TOML text, expanding environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// The cluster selected by `test_mode`.
    #[must_use]
    pub const fn cluster(&self) -> Cluster {
        Cluster::from_test_mode(self.test_mode)
    }

    /// The JSON-RPC endpoint confirmations are sent to.
    #[must_use]
    pub fn rpc_endpoint(&self) -> &str {
        self.rpc_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.cluster().rpc_endpoint())
    }

    /// Outbound RPC timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroDuration`] when `rpc_timeout_secs` is 0.
    pub const fn rpc_timeout(&self) -> Result<Duration, ConfigError> {
        non_zero_secs("rpc_timeout_secs", self.rpc_timeout_secs)
    }

    /// Lifetime of stored sessions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroDuration`] when `session_ttl_secs` is 0.
    pub const fn session_ttl(&self) -> Result<Duration, ConfigError> {
        non_zero_secs("session_ttl_secs", self.session_ttl_secs)
    }

    /// The merchant wallet, or `None` when it is empty or an unresolved `$VAR`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MerchantWallet`] when it is set but invalid.
    pub fn merchant_address(&self) -> Result<Option<Address>, ConfigError> {
        let wallet = self.merchant_wallet.trim();
        if wallet.is_empty() || wallet.starts_with('$') {
            return Ok(None);
        }
        Ok(Some(wallet.parse()?))
    }

    /// Builds the payment confirmer for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RpcUrl`] when the endpoint is not a valid URL
    /// and [`ConfigError::ZeroDuration`] when the timeout is 0.
    pub fn confirmer(&self) -> Result<PaymentConfirmer, ConfigError> {
        let rpc = RpcClient::try_from(self.rpc_endpoint())?.with_timeout(self.rpc_timeout()?);
        Ok(PaymentConfirmer::new(rpc))
    }

    /// Checkout settings handed to the route handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MerchantWallet`] when the wallet is invalid and
    /// [`ConfigError::ZeroDuration`] when the timeout is 0.
    pub fn checkout_settings(&self) -> Result<CheckoutSettings, ConfigError> {
        Ok(CheckoutSettings {
            enabled: self.enabled,
            merchant: self.merchant_address()?,
            currency: self.currency,
            label: self.label.clone(),
            description: self.description.clone(),
            instructions: self.instructions.clone(),
            confirm_timeout: self.rpc_timeout()?,
        })
    }
}

const fn non_zero_secs(key: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        Err(ConfigError::ZeroDuration(key))
    } else {
        Ok(Duration::from_secs(secs))
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut var_name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        let value = if var_name.is_empty() {
            None
        } else {
            std::env::var(&var_name).ok()
        };
        match value {
            Some(val) => result.push_str(&val),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
