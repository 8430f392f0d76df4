//! HTTP gateway for Solana Pay checkouts.
//!
//! Exposes payment session issuance and on-chain payment confirmation to a
//! host checkout over JSON routes. The host owns order state; this service
//! only tells it whether a checkout's payment landed.
//!
//! # Modules
//!
//! - [`handlers`] - Axum route handlers and router builder
//! - [`error`] - Route error types and their HTTP mapping
//! - [`config`] - Server configuration with environment variable expansion
//! - [`util`] - Shutdown signal handling

pub mod config;
pub mod error;
pub mod handlers;
pub mod util;

pub use handlers::{AppState, CheckoutSettings, GatewayState, gateway_router};
