//! Checkout handlers.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use sokoni_core::SaleId;

use crate::cart::engine::LineItem;
use crate::cart::store::{CartStore, SessionStore};
use crate::checkout::{self, CheckoutRequest};
use crate::error::{AppError, Result};
use crate::middleware::verify_csrf_token;
use crate::state::AppState;

/// Order summary response.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub cart: Vec<LineItem>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub coupon_discount: Decimal,
    pub total: Decimal,
}

/// Successful order response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub sale_id: SaleId,
    pub message: String,
}

/// Order summary for the checkout page.
#[instrument(skip(state, session))]
pub async fn summary(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<SummaryResponse>> {
    let engine = state.engine();
    let store = SessionStore::new(session);
    let cart = engine.reconcile(&store).await?;
    let discount = store.discount().await?;
    let summary = engine.compute_summary(&cart, discount);

    Ok(Json(SummaryResponse {
        cart,
        subtotal: summary.subtotal,
        shipping: summary.shipping,
        coupon_discount: summary.discount,
        total: summary.total,
    }))
}

/// Place the order.
///
/// The cart must be non-empty and the form valid; totals are recomputed from
/// the cart, never taken from the client. On success the cart and any
/// discount are cleared.
#[instrument(skip(state, session, request))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    verify_csrf_token(&session, request.csrf_token.as_deref()).await?;

    let engine = state.engine();
    let store = SessionStore::new(session.clone());
    let cart = engine.reconcile(&store).await?;
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let order = checkout::validate(&request).map_err(AppError::Validation)?;

    let discount = store.discount().await?;
    let summary = engine.compute_summary(&cart, discount);
    checkout::log_total_drift(&request, &summary);

    let sale_id = state.ledger().place_order(&order, &cart, &summary)?;

    store.save(&[]).await?;
    store.clear_discount().await?;

    tracing::info!(%sale_id, total = %summary.total, "order placed");

    Ok(Json(CheckoutResponse {
        sale_id,
        message: "Order placed successfully".to_string(),
    }))
}
