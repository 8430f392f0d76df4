//! Minimal Solana JSON-RPC client.
//!
//! Only `getSignaturesForAddress` is implemented: it is the one call payment
//! confirmation needs. Requests are JSON-RPC 2.0 over HTTP `POST`.
//!
//! ## Error Handling
//!
//! [`RpcClientError`] keeps the failure context apart:
//! - URL construction
//! - HTTP transport failures (connect, timeout)
//! - Unexpected HTTP status responses
//! - JSON deserialization errors
//! - JSON-RPC error objects returned by the node

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::address::Address;

/// How settled a transaction must be before the node reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the connected node.
    Processed,
    /// Voted on by a supermajority of the cluster.
    #[default]
    Confirmed,
    /// Rooted; will not be rolled back.
    Finalized,
}

/// One entry of a `getSignaturesForAddress` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    /// Base58 transaction signature.
    pub signature: String,
    /// Slot containing the transaction.
    #[serde(default)]
    pub slot: Option<u64>,
    /// Transaction error, `None` when the transaction succeeded.
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    /// Memo attached to the transaction, if any.
    #[serde(default)]
    pub memo: Option<String>,
    /// Estimated production time, as Unix seconds.
    #[serde(default)]
    pub block_time: Option<i64>,
    /// Cluster confirmation status.
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Errors that can occur while calling the JSON-RPC endpoint.
#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error (connection refused, timeout, TLS...).
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// The node answered with a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {context}: {message}")]
    Rpc {
        /// Human-readable context.
        context: &'static str,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// The response had neither `result` nor `error`.
    #[error("JSON-RPC response without result: {context}")]
    MissingResult {
        /// Human-readable context.
        context: &'static str,
    },
}

impl RpcClientError {
    /// Whether the failure happened on the wire rather than in what the
    /// node answered.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::ResponseBodyRead { .. })
    }
}

/// A JSON-RPC client for one Solana RPC endpoint.
#[derive(Clone, Debug)]
pub struct RpcClient {
    /// Endpoint URL.
    url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Per-request timeout
    timeout: Option<Duration>,
}

impl RpcClient {
    /// Default request timeout (45 seconds).
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

    /// Creates a client for `url` using [`Self::DEFAULT_TIMEOUT`].
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            client: Client::new(),
            timeout: Some(Self::DEFAULT_TIMEOUT),
        }
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Removes the request timeout.
    #[must_use]
    pub const fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Calls `getSignaturesForAddress` for `address`.
    ///
    /// The node returns signatures newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RpcClientError`] if the request cannot be sent, the status
    /// is not `200 OK`, the body is not a JSON-RPC response, or the node
    /// reports an error.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "solpay.rpc.get_signatures_for_address",
            skip_all,
            fields(address = %address, commitment = ?commitment),
            err
        )
    )]
    pub async fn get_signatures_for_address(
        &self,
        address: &Address,
        commitment: Commitment,
    ) -> Result<Vec<SignatureInfo>, RpcClientError> {
        let params = (
            address.to_string(),
            serde_json::json!({ "commitment": commitment }),
        );
        self.call("getSignaturesForAddress", params).await
    }

    /// Sends one JSON-RPC request and unwraps its `result`.
    ///
    /// `method` doubles as the context in error messages.
    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R, RpcClientError>
    where
        P: Serialize + Send + Sync,
        R: serde::de::DeserializeOwned,
    {
        let context = method;
        let payload = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let mut req = self.client.post(self.url.clone()).json(&payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| RpcClientError::Http { context, source: e })?;

        let status = http_response.status();
        let body = http_response
            .text()
            .await
            .map_err(|e| RpcClientError::ResponseBodyRead { context, source: e })?;
        if status != StatusCode::OK {
            return Err(RpcClientError::HttpStatus {
                context,
                status,
                body,
            });
        }

        let response: RpcResponse<R> = serde_json::from_str(&body)
            .map_err(|e| RpcClientError::JsonDeserialization { context, source: e })?;
        if let Some(error) = response.error {
            return Err(RpcClientError::Rpc {
                context,
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or(RpcClientError::MissingResult { context })
    }
}

/// Parses a string URL into an [`RpcClient`].
impl TryFrom<&str> for RpcClient {
    type Error = RpcClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(value).map_err(|e| RpcClientError::UrlParse {
            context: "Failed to parse RPC url",
            source: e,
        })?;
        Ok(Self::new(url))
    }
}
