//! One-time payment sessions.
//!
//! A [`PaymentSession`] is issued per checkout attempt and stored under the
//! caller's [`CheckoutId`]. The checkout client receives it as JSON,
//! builds a Solana Pay transfer request from it, and the
//! [`PaymentConfirmer`](crate::PaymentConfirmer) later reads it back to look
//! for the matching transaction.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::currency::Currency;
use crate::nonce::Nonce;
use crate::store::SessionStore;

/// Identifier of the buyer's checkout (cart) session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutId(String);

impl CheckoutId {
    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CheckoutId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for CheckoutId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for CheckoutId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the caller wants paid: supplied per session by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTerms {
    /// Merchant's receiving address.
    pub recipient: Address,
    /// Amount due, in units of `currency`.
    pub amount: Decimal,
    /// Token the amount is denominated in.
    pub currency: Currency,
    /// Store name shown to the payer.
    pub label: String,
    /// Reference chosen by the client. A fresh one is generated when absent.
    pub reference: Option<Address>,
}

/// A one-time payment session, also the JSON payload handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Merchant's receiving address.
    pub recipient: Address,
    /// One-time address used to find the payer's transaction on chain.
    pub reference: Address,
    /// Store name shown to the payer.
    pub label: String,
    /// Amount due.
    pub amount: Decimal,
    /// Token the amount is denominated in.
    pub currency: Currency,
    /// Token the payer's memo must contain.
    pub nonce: Nonce,
}

/// Errors raised while issuing a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The reference was already issued to another checkout.
    #[error("reference {0} is already in use by another checkout")]
    ReferenceInUse(Address),
    /// The amount due is negative.
    #[error("amount must not be negative, got {0}")]
    NegativeAmount(Decimal),
}

/// Issues, stores and retrieves payment sessions.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager persisting into `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Issues a new session for `checkout` and stores it, replacing any
    /// earlier session of the same checkout.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NegativeAmount`] for a negative amount and
    /// [`SessionError::ReferenceInUse`] when a client-supplied reference was
    /// already issued to a different checkout.
    pub async fn create_session(
        &self,
        checkout: &CheckoutId,
        terms: PaymentTerms,
    ) -> Result<PaymentSession, SessionError> {
        if terms.amount < Decimal::ZERO {
            return Err(SessionError::NegativeAmount(terms.amount));
        }

        let reference = terms.reference.unwrap_or_else(Address::random);
        if !self.store.claim_reference(&reference, checkout).await {
            #[cfg(feature = "telemetry")]
            tracing::warn!(checkout = %checkout, reference = %reference, "Rejected reused payment reference");
            return Err(SessionError::ReferenceInUse(reference));
        }

        let session = PaymentSession {
            recipient: terms.recipient,
            reference,
            label: terms.label,
            amount: terms.amount,
            currency: terms.currency,
            nonce: Nonce::generate(),
        };
        self.store_session(checkout, session.clone()).await;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            checkout = %checkout,
            reference = %session.reference,
            amount = %session.amount,
            currency = %session.currency,
            "Issued payment session"
        );

        Ok(session)
    }

    /// Returns the latest session stored for `checkout`, or `None`.
    pub async fn get_session(&self, checkout: &CheckoutId) -> Option<PaymentSession> {
        self.store.get(checkout).await
    }

    /// Stores `session` for `checkout`, overwriting any prior one.
    pub async fn store_session(&self, checkout: &CheckoutId, session: PaymentSession) {
        self.store.put(checkout, session).await;
    }
}
