//! Tokens a checkout can be priced and paid in.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Payment token accepted at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Circle USD Coin (SPL token).
    #[default]
    #[serde(rename = "USDC")]
    Usdc,
    /// Native SOL.
    #[serde(rename = "SOL")]
    Sol,
}

impl Currency {
    /// All supported currencies.
    pub const ALL: [Self; 2] = [Self::Usdc, Self::Sol];

    /// Ticker symbol, also used as the store currency code and price symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Usdc => "USDC",
            Self::Sol => "SOL",
        }
    }

    /// Human-readable name for currency pickers.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Usdc => "USDC",
            Self::Sol => "SOL (Solana)",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Error returned when parsing an unsupported currency symbol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency: {0} (expected USDC or SOL)")]
pub struct UnsupportedCurrency(pub String);

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.symbol().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnsupportedCurrency(s.to_owned()))
    }
}
