#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana Pay checkout sessions and on-chain payment confirmation.
//!
//! This crate holds the logic a checkout needs to accept Solana Pay:
//! issuing a one-time payment session for a checkout, and later confirming
//! that a transaction carrying the session's nonce landed for its reference
//! address.
//!
//! # Overview
//!
//! 1. The host asks the [`SessionManager`] for a session. A fresh
//!    [`Nonce`] and (unless supplied) a fresh reference [`Address`] are
//!    issued and stored under the caller's [`CheckoutId`].
//! 2. The payer's wallet transfers funds to the merchant, tagging the
//!    transaction with the reference account and a memo containing the nonce.
//! 3. The host calls [`PaymentConfirmer::confirm`], which performs exactly one
//!    `getSignaturesForAddress` round trip and inspects the newest signature.
//!
//! # Modules
//!
//! - [`address`] - Base58 Solana addresses
//! - [`cluster`] - Well-known Solana clusters and their RPC endpoints
//! - [`currency`] - Supported payment tokens
//! - [`nonce`] - Memo nonce generation
//! - [`session`] - Payment sessions and the session manager
//! - [`store`] - Session persistence
//! - [`rpc`] - Minimal JSON-RPC client
//! - [`confirm`] - Payment confirmation
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod address;
pub mod cluster;
pub mod confirm;
pub mod currency;
pub mod nonce;
pub mod rpc;
pub mod session;
pub mod store;

pub use address::Address;
pub use cluster::Cluster;
pub use confirm::{
    ConfirmationError, ConfirmationResult, ConfirmedPayment, FailureReason, PaymentConfirmer,
};
pub use currency::Currency;
pub use nonce::Nonce;
pub use rpc::{Commitment, RpcClient, RpcClientError, SignatureInfo};
pub use session::{CheckoutId, PaymentSession, PaymentTerms, SessionError, SessionManager};
pub use store::{MemorySessionStore, SessionStore};
