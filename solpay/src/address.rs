//! Base58-encoded Solana addresses.
//!
//! Wraps [`Pubkey`] so that it serializes as the familiar base58 string
//! (`"9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"`) rather than a byte array.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rand::{RngExt, rng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_pubkey::Pubkey;

/// A Solana public key, serialized as a base58 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Pubkey);

impl Address {
    /// Wraps a raw public key.
    #[must_use]
    pub const fn new(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }

    /// Generates a fresh, never-before-seen address from 32 random bytes.
    ///
    /// Used for one-time payment references. The address has no known
    /// private key, which is fine: references are only ever read-only
    /// accounts attached to the payer's transfer instruction.
    #[must_use]
    pub fn random() -> Self {
        let bytes: [u8; 32] = rng().random();
        Self(Pubkey::new_from_array(bytes))
    }

    /// Returns the underlying public key.
    #[must_use]
    pub const fn pubkey(&self) -> &Pubkey {
        &self.0
    }
}

impl From<Pubkey> for Address {
    fn from(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }
}

impl From<Address> for Pubkey {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Error returned when a string is not a valid base58 Solana address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid Solana address: {0}")]
pub struct InvalidAddress(pub String);

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pubkey::from_str(s.trim())
            .map(Self)
            .map_err(|_| InvalidAddress(s.to_owned()))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
