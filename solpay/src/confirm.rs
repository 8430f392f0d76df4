//! Payment confirmation.
//!
//! [`PaymentConfirmer::confirm`] performs exactly one `getSignaturesForAddress`
//! round trip for the session's reference and inspects only the newest
//! signature: its memo must contain the session nonce. References are issued
//! once per checkout, so the newest signature for a reference is the payer's
//! transfer or nothing at all.
//!
//! There is no retry inside the confirmer. A failed confirmation is a
//! recoverable state; the host re-invokes confirmation when the buyer
//! resubmits the order.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::address::Address;
use crate::nonce::Nonce;
use crate::rpc::{Commitment, RpcClient, RpcClientError, SignatureInfo};
use crate::session::PaymentSession;

/// Order metadata key for the payment reference.
pub const META_REFERENCE: &str = "solana_pay_reference";
/// Order metadata key for the transaction signature.
pub const META_SIGNATURE: &str = "solana_pay_signature";
/// Order metadata key for the session nonce.
pub const META_NONCE: &str = "solana_pay_nonce";

/// Outcome of one confirmation attempt.
pub type ConfirmationResult = Result<ConfirmedPayment, ConfirmationError>;

/// A payment found on chain for a session.
///
/// The host records these fields on the order permanently, for audit and
/// dispute resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedPayment {
    /// Signature of the matching transaction.
    pub signature: String,
    /// The session reference the transaction was found under.
    pub reference: Address,
    /// The nonce found in the transaction memo.
    pub nonce: Nonce,
}

impl ConfirmedPayment {
    /// Key/value pairs to attach to the order.
    #[must_use]
    pub fn order_meta(&self) -> [(&'static str, String); 3] {
        [
            (META_REFERENCE, self.reference.to_string()),
            (META_SIGNATURE, self.signature.clone()),
            (META_NONCE, self.nonce.to_string()),
        ]
    }
}

/// Why a confirmation attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The RPC endpoint could not be reached.
    TransportError,
    /// The endpoint answered with a non-200 status, malformed JSON or a
    /// JSON-RPC error.
    UnexpectedResponse,
    /// No signature exists for the reference yet.
    NoTransactionFound,
    /// The newest signature's memo does not carry the session nonce.
    NonceMismatch,
    /// The newest signature belongs to a transaction that failed on chain.
    TransactionFailed,
}

impl FailureReason {
    /// Stable snake-case name, as used in logs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransportError => "transport_error",
            Self::UnexpectedResponse => "unexpected_response",
            Self::NoTransactionFound => "no_transaction_found",
            Self::NonceMismatch => "nonce_mismatch",
            Self::TransactionFailed => "transaction_failed",
        }
    }
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by [`PaymentConfirmer::confirm`].
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    /// The RPC endpoint could not be reached.
    #[error("transport error: {0}")]
    Transport(#[source] RpcClientError),
    /// The RPC endpoint answered with something unusable.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(#[source] RpcClientError),
    /// No transaction references the session yet.
    #[error("no transaction found for reference {reference}")]
    NoTransactionFound {
        /// The reference that was queried.
        reference: Address,
    },
    /// The newest transaction does not carry the session nonce.
    #[error("transaction {signature} does not carry the session nonce")]
    NonceMismatch {
        /// Signature of the inspected transaction.
        signature: String,
    },
    /// The newest transaction failed on chain.
    #[error("transaction {signature} failed on chain")]
    TransactionFailed {
        /// Signature of the inspected transaction.
        signature: String,
    },
}

impl ConfirmationError {
    /// Classifies the failure.
    #[must_use]
    pub const fn reason(&self) -> FailureReason {
        match self {
            Self::Transport(_) => FailureReason::TransportError,
            Self::UnexpectedResponse(_) => FailureReason::UnexpectedResponse,
            Self::NoTransactionFound { .. } => FailureReason::NoTransactionFound,
            Self::NonceMismatch { .. } => FailureReason::NonceMismatch,
            Self::TransactionFailed { .. } => FailureReason::TransactionFailed,
        }
    }
}

impl From<RpcClientError> for ConfirmationError {
    fn from(err: RpcClientError) -> Self {
        if err.is_transport() {
            Self::Transport(err)
        } else {
            Self::UnexpectedResponse(err)
        }
    }
}

/// Confirms sessions against a Solana RPC endpoint.
#[derive(Debug, Clone)]
pub struct PaymentConfirmer {
    rpc: RpcClient,
    commitment: Commitment,
}

impl PaymentConfirmer {
    /// Creates a confirmer querying at [`Commitment::Confirmed`].
    #[must_use]
    pub const fn new(rpc: RpcClient) -> Self {
        Self {
            rpc,
            commitment: Commitment::Confirmed,
        }
    }

    /// Overrides the commitment level.
    #[must_use]
    pub const fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = commitment;
        self
    }

    /// Returns the RPC client.
    #[must_use]
    pub const fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Looks for the payment of `session` on chain.
    ///
    /// Performs one RPC request. Dropping the returned future cancels the
    /// request.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfirmationError`] whose [`reason`](ConfirmationError::reason)
    /// tells transport problems, bad responses, a missing transaction and a
    /// nonce mismatch apart.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "solpay.confirm",
            skip_all,
            fields(
                reference = %session.reference,
                otel.status_code = tracing::field::Empty,
                reason = tracing::field::Empty,
                signature = tracing::field::Empty,
            )
        )
    )]
    pub async fn confirm(&self, session: &PaymentSession) -> ConfirmationResult {
        let result = match self
            .rpc
            .get_signatures_for_address(&session.reference, self.commitment)
            .await
        {
            Ok(signatures) => inspect_newest(session, &signatures),
            Err(err) => Err(err.into()),
        };
        record_result_on_span(&result);
        result
    }
}

/// Matches the newest signature against `session`.
///
/// Only `signatures[0]` is considered; older entries are never searched.
fn inspect_newest(session: &PaymentSession, signatures: &[SignatureInfo]) -> ConfirmationResult {
    let Some(newest) = signatures.first() else {
        return Err(ConfirmationError::NoTransactionFound {
            reference: session.reference,
        });
    };

    let memo = newest.memo.as_deref().unwrap_or_default();
    if !session.nonce.is_in_memo(memo) {
        return Err(ConfirmationError::NonceMismatch {
            signature: newest.signature.clone(),
        });
    }
    if newest.err.is_some() {
        return Err(ConfirmationError::TransactionFailed {
            signature: newest.signature.clone(),
        });
    }

    Ok(ConfirmedPayment {
        signature: newest.signature.clone(),
        reference: session.reference,
        nonce: session.nonce.clone(),
    })
}

/// Records the outcome of a confirmation on the current span and logs it.
#[cfg(feature = "telemetry")]
fn record_result_on_span(result: &ConfirmationResult) {
    let span = Span::current();
    match result {
        Ok(payment) => {
            span.record("otel.status_code", "OK");
            span.record("signature", payment.signature.as_str());
            tracing::info!(signature = %payment.signature, "Payment confirmed");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("reason", err.reason().as_str());
            match err {
                ConfirmationError::Transport(_) | ConfirmationError::UnexpectedResponse(_) => {
                    tracing::warn!(reason = %err.reason(), error = %err, "Payment confirmation failed");
                }
                _ => {
                    tracing::info!(reason = %err.reason(), error = %err, "Payment not confirmed");
                }
            }
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
const fn record_result_on_span(_result: &ConfirmationResult) {}
