//! Memo nonces binding an on-chain transfer to one payment session.
//!
//! A nonce is the only thing proving that a transaction found for a
//! reference belongs to *this* session, so it is drawn from the thread-local
//! CSPRNG and never derived from time or hashes of predictable input.

use std::fmt::{Display, Formatter};

use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};

/// Number of random bytes in a nonce.
pub const NONCE_BYTES: usize = 12;

/// Entropy carried by every generated nonce.
pub const NONCE_ENTROPY_BITS: usize = NONCE_BYTES * 8;

/// Random token embedded in the payer's transaction memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    /// Generates a fresh base58-encoded nonce with [`NONCE_ENTROPY_BITS`] of entropy.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; NONCE_BYTES] = rng().random();
        Self(bs58::encode(bytes).into_string())
    }

    /// Returns the nonce text as it appears in a memo.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `memo` carries this nonce.
    #[must_use]
    pub fn is_in_memo(&self, memo: &str) -> bool {
        !self.0.is_empty() && memo.contains(self.0.as_str())
    }
}

impl From<&str> for Nonce {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Nonce {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for Nonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
