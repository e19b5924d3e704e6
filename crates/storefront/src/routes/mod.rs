//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                  - Featured and recent products
//! GET  /health            - Health check
//!
//! # Products
//! GET  /products          - Full product listing
//! GET  /products/{id}     - Product detail with related products
//! GET  /shop              - Filtered listing (category, price, search, sort)
//!
//! # Cart
//! GET  /cart              - Cart document plus the session's CSRF token
//! POST /cart              - Mutations: {action: add|update|remove, ...}
//! POST /coupon            - Apply a coupon code
//!
//! # Checkout
//! GET  /checkout          - Order summary (cart + totals)
//! POST /checkout          - Place the order
//! ```

pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod home;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/shop", get(products::shop))
}

/// Create the cart and coupon routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).post(cart::mutate))
        .route("/coupon", post(coupon::apply))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/checkout", get(checkout::summary).post(checkout::place))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product routes
        .merge(product_routes())
        // Cart routes
        .merge(cart_routes())
        // Checkout routes
        .merge(checkout_routes())
}
