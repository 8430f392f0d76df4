//! Axum route handlers for the checkout gateway.
//!
//! Every route takes the buyer's checkout session id from the path, so no
//! handler depends on ambient cookie state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solpay::{
    Address, CheckoutId, Currency, FailureReason, Nonce, PaymentConfirmer, PaymentSession,
    PaymentTerms, SessionManager,
};

use crate::error::GatewayError;

/// Identifier of this payment method, reported to checkout clients.
pub const GATEWAY_ID: &str = "solana_pay";

/// Store-wide checkout settings.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Whether Solana Pay is offered.
    pub enabled: bool,
    /// Merchant wallet; sessions cannot be issued without one.
    pub merchant: Option<Address>,
    /// Token prices are denominated in.
    pub currency: Currency,
    /// Store name shown to the payer.
    pub label: String,
    /// Payment method description.
    pub description: String,
    /// Text shown after a successful payment.
    pub instructions: String,
    /// Upper bound on one confirmation attempt.
    pub confirm_timeout: Duration,
}

/// Everything the handlers need.
#[derive(Debug)]
pub struct AppState {
    sessions: SessionManager,
    confirmer: PaymentConfirmer,
    settings: CheckoutSettings,
}

impl AppState {
    /// Bundles the session manager, confirmer and settings.
    #[must_use]
    pub const fn new(
        sessions: SessionManager,
        confirmer: PaymentConfirmer,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            sessions,
            confirmer,
            settings,
        }
    }

    /// Returns the checkout settings.
    #[must_use]
    pub const fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }
}

/// Shared application state for the gateway.
pub type GatewayState = Arc<AppState>;

/// Body of `POST /checkout/{checkout_id}/session`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    /// Cart total, in the store currency.
    pub amount: Decimal,
    /// Reference generated by the client, if any.
    #[serde(default)]
    pub reference: Option<Address>,
}

/// The order field of the bootstrap payload: the session or `{}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OrderPayload {
    /// A session was issued for this checkout.
    Session(PaymentSession),
    /// No session yet.
    Empty {},
}

/// Data a checkout client needs before it can start a payment.
#[derive(Debug, Serialize)]
pub struct CheckoutBootstrap {
    /// Payment method id.
    pub id: &'static str,
    /// Whether Solana Pay is offered.
    pub enabled: bool,
    /// Store currency symbol.
    pub currency: Currency,
    /// Store currency display name.
    pub currency_name: &'static str,
    /// Payment method description.
    pub description: String,
    /// Current session of this checkout.
    pub order: OrderPayload,
}

/// Successful payment processing.
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    /// Always `"success"`.
    pub result: &'static str,
    /// Session reference.
    pub reference: Address,
    /// Signature of the confirming transaction; absent for free orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Session nonce.
    pub nonce: Nonce,
    /// Metadata to attach to the order permanently.
    pub meta: BTreeMap<&'static str, String>,
    /// Thank-you text.
    pub instructions: String,
}

/// `GET /health` - liveness probe.
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /checkout/{checkout_id}` - bootstrap data for the checkout client.
pub async fn get_checkout(
    State(state): State<GatewayState>,
    Path(checkout_id): Path<String>,
) -> Json<CheckoutBootstrap> {
    let checkout = CheckoutId::from(checkout_id);
    let settings = state.settings();
    let order = state
        .sessions
        .get_session(&checkout)
        .await
        .map_or(OrderPayload::Empty {}, OrderPayload::Session);
    Json(CheckoutBootstrap {
        id: GATEWAY_ID,
        enabled: settings.enabled,
        currency: settings.currency,
        currency_name: settings.currency.display_name(),
        description: settings.description.clone(),
        order,
    })
}

/// `POST /checkout/{checkout_id}/session` - issues a payment session.
///
/// # Errors
///
/// Returns 503 when the gateway is disabled or has no merchant wallet,
/// 409 when the supplied reference belongs to another checkout and 400 for a
/// negative amount.
pub async fn post_session(
    State(state): State<GatewayState>,
    Path(checkout_id): Path<String>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<PaymentSession>, GatewayError> {
    let settings = state.settings();
    if !settings.enabled {
        return Err(GatewayError::Disabled);
    }
    let recipient = settings
        .merchant
        .ok_or(GatewayError::MerchantNotConfigured)?;

    let terms = PaymentTerms {
        recipient,
        amount: body.amount,
        currency: settings.currency,
        label: settings.label.clone(),
        reference: body.reference,
    };
    let session = state
        .sessions
        .create_session(&CheckoutId::from(checkout_id), terms)
        .await?;
    Ok(Json(session))
}

/// `GET /checkout/{checkout_id}/session` - returns the stored session.
///
/// # Errors
///
/// Returns 404 if the checkout has no session.
pub async fn get_session(
    State(state): State<GatewayState>,
    Path(checkout_id): Path<String>,
) -> Result<Json<PaymentSession>, GatewayError> {
    state
        .sessions
        .get_session(&CheckoutId::from(checkout_id))
        .await
        .map(Json)
        .ok_or(GatewayError::SessionNotFound)
}

/// `POST /checkout/{checkout_id}/confirm` - processes the order payment.
///
/// Free orders complete without touching the chain. Otherwise one
/// confirmation is attempted, bounded by the configured timeout.
///
/// # Errors
///
/// Returns 404 if the checkout has no session and 402 if the payment is not
/// confirmed. The 402 body names the failure reason but never internal
/// error details.
pub async fn post_confirm(
    State(state): State<GatewayState>,
    Path(checkout_id): Path<String>,
) -> Result<Json<PaymentReceipt>, GatewayError> {
    let checkout = CheckoutId::from(checkout_id);
    let session = state
        .sessions
        .get_session(&checkout)
        .await
        .ok_or(GatewayError::SessionNotFound)?;
    let instructions = state.settings().instructions.clone();

    if session.amount <= Decimal::ZERO {
        tracing::info!(checkout = %checkout, "Free order, skipping on-chain confirmation");
        return Ok(Json(PaymentReceipt {
            result: "success",
            reference: session.reference,
            signature: None,
            nonce: session.nonce,
            meta: BTreeMap::new(),
            instructions,
        }));
    }

    let timeout = state.settings().confirm_timeout;
    let payment = match tokio::time::timeout(timeout, state.confirmer.confirm(&session)).await {
        Ok(Ok(payment)) => payment,
        Ok(Err(err)) => {
            tracing::info!(checkout = %checkout, reason = %err.reason(), "Order payment not confirmed");
            return Err(GatewayError::PaymentNotConfirmed(err.reason()));
        }
        Err(_) => {
            tracing::warn!(checkout = %checkout, ?timeout, "Payment confirmation timed out");
            return Err(GatewayError::PaymentNotConfirmed(
                FailureReason::TransportError,
            ));
        }
    };

    tracing::info!(
        checkout = %checkout,
        reference = %payment.reference,
        signature = %payment.signature,
        "Order paid"
    );
    Ok(Json(PaymentReceipt {
        result: "success",
        meta: payment.order_meta().into_iter().collect(),
        reference: payment.reference,
        signature: Some(payment.signature),
        nonce: payment.nonce,
        instructions,
    }))
}

/// Creates an Axum [`axum::Router`] with all gateway endpoints.
///
/// Endpoints:
/// - `GET /health` - liveness probe
/// - `GET /checkout/{checkout_id}` - checkout bootstrap data
/// - `POST /checkout/{checkout_id}/session` - issue a payment session
/// - `GET /checkout/{checkout_id}/session` - fetch the current session
/// - `POST /checkout/{checkout_id}/confirm` - confirm and complete payment
pub fn gateway_router(state: GatewayState) -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(get_health))
        .route("/checkout/{checkout_id}", axum::routing::get(get_checkout))
        .route(
            "/checkout/{checkout_id}/session",
            axum::routing::get(get_session).post(post_session),
        )
        .route(
            "/checkout/{checkout_id}/confirm",
            axum::routing::post(post_confirm),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use solpay::{MemorySessionStore, RpcClient};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn settings(enabled: bool) -> CheckoutSettings {
        CheckoutSettings {
            enabled,
            merchant: Some(WALLET.parse().unwrap()),
            currency: Currency::Usdc,
            label: "Test Store".to_owned(),
            description: "Complete your payment with Solana Pay.".to_owned(),
            instructions: "Thank you for using Solana Pay".to_owned(),
            confirm_timeout: Duration::from_secs(5),
        }
    }

    fn router(rpc_url: &str, settings: CheckoutSettings) -> axum::Router {
        let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));
        let confirmer = PaymentConfirmer::new(RpcClient::try_from(rpc_url).unwrap());
        gateway_router(Arc::new(AppState::new(sessions, confirmer, settings)))
    }

    async fn send(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn rpc_returning(result: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": result,
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_health() {
        let app = router("http://127.0.0.1:1/", settings(true));
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_then_get_session() {
        let app = router("http://127.0.0.1:1/", settings(true));

        let (status, created) = send(
            &app,
            "POST",
            "/checkout/cart-1/session",
            Some(serde_json::json!({ "amount": "12.50" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["recipient"], WALLET);
        assert_eq!(created["label"], "Test Store");
        assert_eq!(created["amount"], "12.50");
        assert_eq!(created["currency"], "USDC");
        assert!(created["nonce"].as_str().is_some_and(|n| !n.is_empty()));
        assert!(created["reference"].as_str().is_some());

        let (status, fetched) = send(&app, "GET", "/checkout/cart-1/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (_, bootstrap) = send(&app, "GET", "/checkout/cart-1", None).await;
        assert_eq!(bootstrap["id"], GATEWAY_ID);
        assert_eq!(bootstrap["order"], created);
    }

    #[tokio::test]
    async fn test_bootstrap_without_session_has_empty_order() {
        let app = router("http://127.0.0.1:1/", settings(true));
        let (status, body) = send(&app, "GET", "/checkout/unknown", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"], serde_json::json!({}));
        assert_eq!(body["currency"], "USDC");
        assert_eq!(body["enabled"], true);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = router("http://127.0.0.1:1/", settings(true));
        let (status, _) = send(&app, "GET", "/checkout/unknown/session", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "POST", "/checkout/unknown/confirm", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_disabled_gateway_refuses_sessions() {
        let app = router("http://127.0.0.1:1/", settings(false));
        let (status, _) = send(
            &app,
            "POST",
            "/checkout/cart-1/session",
            Some(serde_json::json!({ "amount": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_merchant_refuses_sessions() {
        let mut settings = settings(true);
        settings.merchant = None;
        let app = router("http://127.0.0.1:1/", settings);
        let (status, body) = send(
            &app,
            "POST",
            "/checkout/cart-1/session",
            Some(serde_json::json!({ "amount": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "merchant wallet is not configured");
    }

    #[tokio::test]
    async fn test_reference_reuse_across_checkouts_conflicts() {
        let app = router("http://127.0.0.1:1/", settings(true));
        let reference = Address::random().to_string();
        let body = serde_json::json!({ "amount": "1", "reference": reference });

        let (status, created) =
            send(&app, "POST", "/checkout/cart-1/session", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["reference"], reference.as_str());

        let (status, _) = send(&app, "POST", "/checkout/cart-2/session", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_confirm_success_returns_order_meta() {
        let server = MockServer::start().await;
        let app = router(&server.uri(), settings(true));
        let (_, created) = send(
            &app,
            "POST",
            "/checkout/cart-1/session",
            Some(serde_json::json!({ "amount": "3" })),
        )
        .await;
        let nonce = created["nonce"].as_str().unwrap().to_owned();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": [
                    { "signature": "sig1", "memo": format!("order:{nonce}"), "err": null }
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (status, receipt) = send(&app, "POST", "/checkout/cart-1/confirm", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["result"], "success");
        assert_eq!(receipt["signature"], "sig1");
        assert_eq!(receipt["meta"]["solana_pay_signature"], "sig1");
        assert_eq!(receipt["meta"]["solana_pay_nonce"], nonce.as_str());
        assert_eq!(receipt["meta"]["solana_pay_reference"], created["reference"]);
        assert_eq!(receipt["instructions"], "Thank you for using Solana Pay");
    }

    #[tokio::test]
    async fn test_confirm_without_transaction_is_402() {
        let server = rpc_returning(serde_json::json!([])).await;
        let app = router(&server.uri(), settings(true));
        send(
            &app,
            "POST",
            "/checkout/cart-1/session",
            Some(serde_json::json!({ "amount": "3" })),
        )
        .await;

        let (status, body) = send(&app, "POST", "/checkout/cart-1/confirm", None).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["result"], "failure");
        assert_eq!(body["reason"], "no_transaction_found");
        assert_eq!(body["message"], crate::error::PAYMENT_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_confirm_transport_error_hides_details() {
        let app = router("http://127.0.0.1:1/", settings(true));
        send(
            &app,
            "POST",
            "/checkout/cart-1/session",
            Some(serde_json::json!({ "amount": "3" })),
        )
        .await;

        let (status, body) = send(&app, "POST", "/checkout/cart-1/confirm", None).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["reason"], "transport_error");
        assert!(!body.to_string().contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_slow_rpc_is_cut_off_at_confirm_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": [] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let mut settings = settings(true);
        settings.confirm_timeout = Duration::from_millis(300);
        let app = router(&server.uri(), settings);
        send(
            &app,
            "POST",
            "/checkout/cart-1/session",
            Some(serde_json::json!({ "amount": "3" })),
        )
        .await;

        let started = std::time::Instant::now();
        let (status, body) = send(&app, "POST", "/checkout/cart-1/confirm", None).await;
        let elapsed = started.elapsed();

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["result"], "failure");
        assert_eq!(body["reason"], "transport_error");
        assert_eq!(body["message"], crate::error::PAYMENT_ERROR_MESSAGE);
        assert!(elapsed >= Duration::from_millis(300), "returned early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "not cut off: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_free_order_skips_rpc() {
        let app = router("http://127.0.0.1:1/", settings(true));
        send(
            &app,
            "POST",
            "/checkout/cart-1/session",
            Some(serde_json::json!({ "amount": "0" })),
        )
        .await;

        let (status, body) = send(&app, "POST", "/checkout/cart-1/confirm", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "success");
        assert!(body.get("signature").is_none());
    }
}
