//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Responses carry the `{"error": message}` JSON body
//! the storefront clients expect.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cart::engine::CartError;
use crate::cart::store::StoreError;
use crate::checkout::LedgerError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Cart store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Order placement failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Checkout form validation failed; all violations collected.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// CSRF token missing or mismatched.
    #[error("Invalid CSRF token")]
    InvalidCsrf,

    /// Checkout attempted against an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Store(_) | Self::Internal(_) | Self::Cart(CartError::Store(_))
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Cart(err) => match err {
                CartError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                CartError::InvalidCoupon(_) => StatusCode::BAD_REQUEST,
                CartError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ledger(LedgerError::InsufficientStock { .. })
            | Self::Validation(_)
            | Self::EmptyCart
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCsrf => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Cart(err) => match err {
                CartError::ProductNotFound(_) => "Product not found".to_string(),
                CartError::InvalidCoupon(_) => "Invalid coupon code".to_string(),
                CartError::Store(_) => "Internal server error".to_string(),
            },
            Self::Store(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Ledger(err) => err.to_string(),
            Self::Validation(_) => "Validation failed".to_string(),
            Self::InvalidCsrf => "Invalid CSRF token".to_string(),
            Self::EmptyCart => "Cart is empty".to_string(),
            Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
        };

        let body = match &self {
            Self::Validation(details) => serde_json::json!({
                "error": message,
                "details": details,
            }),
            _ => serde_json::json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sokoni_core::ProductId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Cart(CartError::ProductNotFound(
                ProductId::new(9)
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::InvalidCoupon(
                "BOGUS".to_string()
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::InvalidCsrf), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AppError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::Validation(vec!["City is required.".to_string()])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Ledger(LedgerError::InsufficientStock {
                product: "Blue Jacket".to_string()
            })),
            StatusCode::BAD_REQUEST
        );
    }
}
