//! HTTP client for a storefront's cart endpoints.
//!
//! `RemoteCart` talks to the JSON contract served by this crate's routes:
//! `GET /cart`, `POST /cart`, `POST /coupon`, `GET /checkout`, and
//! `POST /checkout`. Transport failures and server errors are retried with
//! the configured fixed-delay policy; HTTP 4xx rejections are terminal.
//!
//! Mutating calls are serialized through an internal mutex so no two
//! mutations from the same handle are ever in flight concurrently, which
//! would otherwise race on the server's read-modify-write cart document.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;

use sokoni_core::{ProductId, SaleId};

use crate::checkout::CheckoutRequest;
use crate::retry::{RetryPolicy, with_retry};

use super::engine::LineItem;

/// Errors surfaced by the remote cart client.
#[derive(Debug, Error)]
pub enum RemoteCartError {
    /// The request could not be completed after exhausting retries.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected the request; not retried.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The server answered with an unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Deserialize)]
struct CartEnvelope {
    #[serde(default)]
    cart: Vec<LineItem>,
    #[serde(default)]
    csrf_token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CouponEnvelope {
    discount: Decimal,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutEnvelope {
    sale_id: SaleId,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
}

/// The order summary as served by `GET /checkout`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSummary {
    pub cart: Vec<LineItem>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub coupon_discount: Decimal,
    pub total: Decimal,
}

/// Client for a remotely hosted cart.
#[derive(Debug, Clone)]
pub struct RemoteCart {
    inner: Arc<RemoteCartInner>,
}

#[derive(Debug)]
struct RemoteCartInner {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
    /// Held for the duration of every mutating call.
    mutation_gate: Mutex<()>,
    csrf: Mutex<Option<String>>,
}

impl RemoteCart {
    /// Create a client for the storefront at `base_url` with the default
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError::Network` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteCartError> {
        Self::with_policy(base_url, RetryPolicy::default())
    }

    /// Create a client with an explicit retry policy.
    ///
    /// The client keeps a cookie jar so the server sees one session across
    /// calls.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError::Network` if the HTTP client cannot be built.
    pub fn with_policy(
        base_url: impl Into<String>,
        policy: RetryPolicy,
    ) -> Result<Self, RemoteCartError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let base_url = base_url.into();
        Ok(Self {
            inner: Arc::new(RemoteCartInner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                policy,
                mutation_gate: Mutex::new(()),
                csrf: Mutex::new(None),
            }),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch the current cart.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError` after exhausting retries or on rejection.
    pub async fn fetch_cart(&self) -> Result<Vec<LineItem>, RemoteCartError> {
        Ok(self.fetch_envelope().await?.cart)
    }

    /// Fetch the order summary.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError` after exhausting retries or on rejection.
    pub async fn fetch_summary(&self) -> Result<RemoteSummary, RemoteCartError> {
        self.get_json("/checkout").await
    }

    async fn fetch_envelope(&self) -> Result<CartEnvelope, RemoteCartError> {
        let envelope: CartEnvelope = self.get_json("/cart").await?;
        if let Some(token) = &envelope.csrf_token {
            *self.inner.csrf.lock().await = Some(token.clone());
        }
        Ok(envelope)
    }

    async fn csrf_token(&self) -> Result<String, RemoteCartError> {
        if let Some(token) = self.inner.csrf.lock().await.clone() {
            return Ok(token);
        }
        let envelope = self.fetch_envelope().await?;
        envelope
            .csrf_token
            .ok_or_else(|| RemoteCartError::Protocol("server issued no csrf token".to_string()))
    }

    // =========================================================================
    // Mutations (serialized per handle)
    // =========================================================================

    /// Add a product to the cart, returning the updated cart.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError` after exhausting retries or on rejection.
    pub async fn add_item(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
        quantity: u32,
    ) -> Result<Vec<LineItem>, RemoteCartError> {
        let _gate = self.inner.mutation_gate.lock().await;
        let csrf_token = self.csrf_token().await?;
        let body = serde_json::json!({
            "action": "add",
            "product_id": product_id,
            "quantity": quantity,
            "size": size,
            "color": color,
            "csrf_token": csrf_token,
        });
        let envelope: CartEnvelope = self.post_json("/cart", &body).await?;
        Ok(envelope.cart)
    }

    /// Set a line's quantity, returning the updated cart. A quantity of zero
    /// removes the line.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError` after exhausting retries or on rejection.
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
        quantity: u32,
    ) -> Result<Vec<LineItem>, RemoteCartError> {
        let _gate = self.inner.mutation_gate.lock().await;
        let csrf_token = self.csrf_token().await?;
        let body = serde_json::json!({
            "action": "update",
            "product_id": product_id,
            "quantity": quantity,
            "size": size,
            "color": color,
            "csrf_token": csrf_token,
        });
        let envelope: CartEnvelope = self.post_json("/cart", &body).await?;
        Ok(envelope.cart)
    }

    /// Remove the line matching the key, returning the updated cart.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError` after exhausting retries or on rejection.
    pub async fn remove_item(
        &self,
        product_id: ProductId,
        size: &str,
        color: &str,
    ) -> Result<Vec<LineItem>, RemoteCartError> {
        let _gate = self.inner.mutation_gate.lock().await;
        let csrf_token = self.csrf_token().await?;
        let body = serde_json::json!({
            "action": "remove",
            "product_id": product_id,
            "size": size,
            "color": color,
            "csrf_token": csrf_token,
        });
        let envelope: CartEnvelope = self.post_json("/cart", &body).await?;
        Ok(envelope.cart)
    }

    /// Apply a coupon code, returning the discount.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError::Rejected` for unknown codes.
    pub async fn apply_coupon(&self, code: &str) -> Result<Decimal, RemoteCartError> {
        let _gate = self.inner.mutation_gate.lock().await;
        let csrf_token = self.csrf_token().await?;
        let body = serde_json::json!({
            "code": code,
            "csrf_token": csrf_token,
        });
        let envelope: CouponEnvelope = self.post_json("/coupon", &body).await?;
        if let Some(message) = envelope.message {
            tracing::debug!(message = %message, "coupon applied");
        }
        Ok(envelope.discount)
    }

    /// Place an order, returning the sale id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteCartError::Rejected` for validation failures.
    pub async fn place_order(&self, order: &CheckoutRequest) -> Result<SaleId, RemoteCartError> {
        let _gate = self.inner.mutation_gate.lock().await;
        let csrf_token = self.csrf_token().await?;
        let mut body = serde_json::to_value(order)
            .map_err(|e| RemoteCartError::Protocol(e.to_string()))?;
        if let Some(object) = body.as_object_mut() {
            object.insert(
                "csrf_token".to_string(),
                serde_json::Value::String(csrf_token),
            );
        }
        let envelope: CheckoutEnvelope = self.post_json("/checkout", &body).await?;
        Ok(envelope.sale_id)
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteCartError> {
        let url = format!("{}{}", self.inner.base_url, path);
        let response = with_retry(
            self.inner.policy,
            || async {
                let response = self.inner.http.get(&url).send().await?;
                // Server errors count as transient; 4xx falls through to decode.
                if response.status().is_server_error() {
                    return response.error_for_status();
                }
                Ok(response)
            },
            |_| true,
        )
        .await?;
        decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, RemoteCartError> {
        let url = format!("{}{}", self.inner.base_url, path);
        let response = with_retry(
            self.inner.policy,
            || async {
                let response = self.inner.http.post(&url).json(body).send().await?;
                if response.status().is_server_error() {
                    return response.error_for_status();
                }
                Ok(response)
            },
            |_| true,
        )
        .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteCartError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let message = response
        .json::<ErrorEnvelope>()
        .await
        .map_or_else(|_| format!("HTTP {status}"), |envelope| envelope.error);

    Err(RemoteCartError::Rejected {
        status: status.as_u16(),
        message,
    })
}
