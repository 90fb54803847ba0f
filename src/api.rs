//! Backend REST client.
//!
//! Talks to the store backend for the product catalog, barcode lookups, order
//! inserts and payments. The session depends on the collaborator traits
//! below rather than on [`BackendClient`] directly, so tests can swap in
//! in-memory fakes.

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{value_to_code, CatalogSnapshot, ProductRecord};
use crate::checkout::{PaymentReceipt, PaymentRequest};
use crate::config::{normalize_base_url, PosConfig};
use crate::order::{OrderPayload, OrderReceipt};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Cannot reach backend at {url}")]
    Connect { url: String },

    #[error("Connection to {url} timed out")]
    Timeout { url: String },

    #[error("Invalid backend URL: {url}")]
    InvalidUrl { url: String },

    /// Non-2xx response. `message` is the backend's own text when it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response from backend: {0}")]
    Decode(String),

    #[error("Network error communicating with {url}: {detail}")]
    Network { url: String, detail: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convert a `reqwest::Error` into a user-facing error.
fn friendly_error(url: &str, err: &reqwest::Error) -> ApiError {
    let url = url.to_string();
    if err.is_connect() {
        return ApiError::Connect { url };
    }
    if err.is_timeout() {
        return ApiError::Timeout { url };
    }
    if err.is_builder() {
        return ApiError::InvalidUrl { url };
    }
    ApiError::Network {
        url,
        detail: err.to_string(),
    }
}

/// Fallback message when the backend sent no usable text.
fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "Bad request: please check your input".to_string(),
        401 => "Unauthorized: please log in".to_string(),
        404 => "Not found: the requested resource could not be found".to_string(),
        s if s >= 500 => format!("Backend server error (HTTP {s}), please try again later"),
        s => format!("Unexpected response from backend (HTTP {s})"),
    }
}

/// Pull the human-readable message out of an error body.
///
/// The backend answers `{"error": "..."}` and sometimes `{"message": "..."}`;
/// a short plain-text body is used as-is.
pub fn backend_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => ["error", "message"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string),
        Err(_) if trimmed.len() <= 200 && !trimmed.starts_with('<') => {
            Some(trimmed.to_string())
        }
        Err(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Source of the product catalog.
#[allow(async_fn_in_trait)]
pub trait CatalogProvider {
    async fn fetch_catalog(&self) -> Result<CatalogSnapshot, ApiError>;

    /// Resolve a barcode the local snapshot does not know. `Ok(None)` when
    /// the backend has no such product.
    async fn lookup_barcode(&self, barcode: &str) -> Result<Option<ProductRecord>, ApiError>;
}

/// Accepts a finished order.
#[allow(async_fn_in_trait)]
pub trait OrderSubmitter {
    async fn submit_order(&self, order: &OrderPayload) -> Result<OrderReceipt, ApiError>;
}

/// Settles payment for a submitted order.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    async fn process_payment(&self, request: &PaymentRequest) -> Result<PaymentReceipt, ApiError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InsertOrderResponse {
    order_id: Value,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessPaymentResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    payment_id: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(config: &PosConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.api_base_url);
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Network {
                url: base_url.clone(),
                detail: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let start = Instant::now();
        let resp = req.send().await.map_err(|e| friendly_error(&url, &e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| friendly_error(&url, &e))?;
        debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Backend request completed"
        );

        if !status.is_success() {
            let message = backend_message(&text).unwrap_or_else(|| status_message(status));
            warn!(path = %path, status = status.as_u16(), message = %message, "Backend request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }
}

impl CatalogProvider for BackendClient {
    async fn fetch_catalog(&self) -> Result<CatalogSnapshot, ApiError> {
        let rows: Vec<Value> = self
            .request(Method::GET, "/getProducts", &[], None::<&Value>)
            .await?;
        let snapshot = CatalogSnapshot::from_rows(rows);
        if snapshot.is_empty() {
            warn!("Backend returned an empty catalog");
        } else {
            info!(products = snapshot.len(), "Catalog fetched");
        }
        Ok(snapshot)
    }

    async fn lookup_barcode(&self, barcode: &str) -> Result<Option<ProductRecord>, ApiError> {
        let result: Result<Value, ApiError> = self
            .request(
                Method::GET,
                "/getProductByBarcode",
                &[("barcode", barcode)],
                None::<&Value>,
            )
            .await;
        match result {
            Ok(v) if v.get("product_id").is_some() => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| ApiError::Decode(format!("/getProductByBarcode: {e}"))),
            // `{"status": "fail", "message": "Product not found"}` arrives as 200
            Ok(_) => Ok(None),
            Err(ApiError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl OrderSubmitter for BackendClient {
    async fn submit_order(&self, order: &OrderPayload) -> Result<OrderReceipt, ApiError> {
        let resp: InsertOrderResponse = self
            .request(Method::POST, "/insertOrder", &[], Some(order))
            .await?;
        let order_id = value_to_code(&resp.order_id)
            .ok_or_else(|| ApiError::Decode(format!("invalid order_id {}", resp.order_id)))?;
        info!(order_id = %order_id, total = %order.grand_total(), "Order inserted");
        Ok(OrderReceipt {
            order_id,
            message: resp.message,
        })
    }
}

impl PaymentProcessor for BackendClient {
    async fn process_payment(&self, request: &PaymentRequest) -> Result<PaymentReceipt, ApiError> {
        let resp: ProcessPaymentResponse = self
            .request(Method::POST, "/processPayment", &[], Some(request))
            .await?;
        let message = resp
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ApiError::Decode("payment response without message".into()))?;
        Ok(PaymentReceipt {
            message,
            payment_id: resp.payment_id.as_ref().and_then(value_to_code),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
