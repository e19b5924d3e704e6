//! Coupon handler.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use sokoni_core::Money;

use crate::cart::store::SessionStore;
use crate::error::Result;
use crate::middleware::verify_csrf_token;
use crate::state::AppState;

/// Coupon application request.
#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

/// Coupon application response.
#[derive(Debug, Serialize)]
pub struct CouponResponse {
    pub discount: Decimal,
    pub message: String,
}

/// Apply a coupon code to the session's cart.
///
/// Unknown codes clear any stored discount and respond with 400.
#[instrument(skip(state, session, request))]
pub async fn apply(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CouponRequest>,
) -> Result<Json<CouponResponse>> {
    verify_csrf_token(&session, request.csrf_token.as_deref()).await?;

    let store = SessionStore::new(session.clone());
    let code = request.code.unwrap_or_default();
    let discount = state.engine().apply_coupon(&store, &code).await?;

    let amount = Money::new(discount, state.engine().config().currency);
    Ok(Json(CouponResponse {
        discount,
        message: format!("Coupon applied! {amount} discount"),
    }))
}
