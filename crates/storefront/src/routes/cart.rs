//! Cart route handlers.
//!
//! `GET /cart` repairs and returns the session's cart along with the CSRF
//! token mutations must echo. `POST /cart` carries an action verb, matching
//! the single mutation endpoint the cart page calls.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use sokoni_core::ProductId;

use crate::cart::engine::{CartEngine, CartError, LineItem};
use crate::cart::store::{CartStore, SessionStore};
use crate::error::{AppError, Result};
use crate::middleware::{ensure_csrf_token, verify_csrf_token};
use crate::state::AppState;

/// Cart document response.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Vec<LineItem>,
    pub csrf_token: String,
}

/// Response to a cart mutation.
#[derive(Debug, Serialize)]
pub struct CartMutationResponse {
    pub cart: Vec<LineItem>,
    pub message: String,
}

/// Cart mutation verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartAction {
    Add,
    Update,
    Remove,
}

/// Cart mutation request.
#[derive(Debug, Deserialize)]
pub struct CartActionRequest {
    pub action: CartAction,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

/// Display the cart.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CartResponse>> {
    let store = SessionStore::new(session.clone());
    let cart = state.engine().reconcile(&store).await?;
    let csrf_token = ensure_csrf_token(&session).await?;

    Ok(Json(CartResponse { cart, csrf_token }))
}

/// Apply a cart mutation.
#[instrument(skip(state, session, request))]
pub async fn mutate(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CartActionRequest>,
) -> Result<Json<CartMutationResponse>> {
    verify_csrf_token(&session, request.csrf_token.as_deref()).await?;

    let engine = state.engine();
    let product_id = ProductId::new(request.product_id.unwrap_or_default());
    if state.catalog().find_by_id(product_id).is_none() {
        return Err(CartError::ProductNotFound(product_id).into());
    }

    let size = request
        .size
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| engine.config().default_size.clone());
    let color = request
        .color
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| engine.config().default_color.clone());

    let store = SessionStore::new(session.clone());
    let mut cart = engine.reconcile(&store).await?;

    match request.action {
        CartAction::Add => {
            let requested = CartEngine::coerce_quantity(request.quantity);
            if state.ledger().available(product_id) < requested {
                return Err(AppError::BadRequest("Insufficient stock".to_string()));
            }
            engine.add_item(&mut cart, product_id, &size, &color, request.quantity)?;
        }
        CartAction::Update => {
            let quantity = absolute_quantity(request.quantity);
            if quantity > 0 {
                let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
                if state.ledger().available(product_id) < requested {
                    return Err(AppError::BadRequest("Insufficient stock".to_string()));
                }
            }
            engine.set_quantity(&mut cart, product_id, &size, &color, quantity);
        }
        CartAction::Remove => {
            engine.remove_matching(&mut cart, product_id, &size, &color);
        }
    }

    store.save(&cart).await?;
    if cart.is_empty() {
        store.clear_discount().await?;
    }

    Ok(Json(CartMutationResponse {
        cart,
        message: "Cart updated successfully".to_string(),
    }))
}

/// Floor an absolute quantity for the `update` action; a missing or invalid
/// value defaults to 1, and non-positive values mean removal.
fn absolute_quantity(quantity: Option<f64>) -> i64 {
    let quantity = quantity.unwrap_or(1.0);
    if !quantity.is_finite() {
        return 1;
    }
    let floored = quantity.floor();
    if floored >= 9.2e18 {
        i64::MAX
    } else if floored <= -9.2e18 {
        i64::MIN
    } else {
        #[allow(clippy::cast_possible_truncation)] // bounded above
        {
            floored as i64
        }
    }
}
