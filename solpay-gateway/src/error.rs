//! Error types for the gateway routes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use solpay::{FailureReason, SessionError};

/// Message shown to the buyer when a payment is not (yet) confirmed.
pub const PAYMENT_ERROR_MESSAGE: &str = "Payment error: payment not yet confirmed";

/// Errors that can occur while serving a checkout request.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Solana Pay is switched off for this store.
    #[error("Solana Pay is not enabled")]
    Disabled,

    /// No merchant wallet is configured, so no session can be issued.
    #[error("merchant wallet is not configured")]
    MerchantNotConfigured,

    /// The checkout has no payment session.
    #[error("no payment session for this checkout")]
    SessionNotFound,

    /// Issuing the session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The payment could not be confirmed on chain.
    #[error("Payment error: payment not yet confirmed")]
    PaymentNotConfirmed(FailureReason),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Disabled | Self::MerchantNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::Session(SessionError::ReferenceInUse(_)) => StatusCode::CONFLICT,
            Self::Session(SessionError::NegativeAmount(_)) => StatusCode::BAD_REQUEST,
            Self::PaymentNotConfirmed(_) => StatusCode::PAYMENT_REQUIRED,
        };
        let body = match &self {
            Self::PaymentNotConfirmed(reason) => serde_json::json!({
                "result": "failure",
                "reason": reason,
                "message": PAYMENT_ERROR_MESSAGE,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
