//! Integration tests for Sokoni.
//!
//! The test harness binds the real storefront router to an ephemeral port
//! and drives it over HTTP with a cookie-jar client, so session, CSRF, and
//! cart semantics are exercised exactly as a browser would see them.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sokoni-integration-tests
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use rust_decimal::Decimal;
use secrecy::SecretString;

use sokoni_core::ProductId;
use sokoni_storefront::catalog::{Product, ProductCatalog};
use sokoni_storefront::config::{CartConfig, StorefrontConfig};
use sokoni_storefront::coupons::CouponBook;
use sokoni_storefront::middleware::create_session_layer;
use sokoni_storefront::routes;
use sokoni_storefront::state::AppState;

/// A storefront bound to an ephemeral local port.
pub struct TestContext {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
}

impl TestContext {
    /// Spawn a storefront with the demo fixture catalog.
    ///
    /// # Panics
    ///
    /// Panics if the server or client cannot be started.
    pub async fn new() -> Self {
        Self::with_state(test_state()).await
    }

    /// Spawn a storefront with explicit state.
    ///
    /// # Panics
    ///
    /// Panics if the server or client cannot be started.
    pub async fn with_state(state: AppState) -> Self {
        let session_layer = create_session_layer(state.config());
        let app = axum::Router::new()
            .merge(routes::routes())
            .layer(session_layer)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr: SocketAddr = listener.local_addr().expect("listener address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("build http client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            state,
        }
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetch the cart document, returning the body JSON.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn fetch_cart(&self) -> serde_json::Value {
        self.client
            .get(self.url("/cart"))
            .send()
            .await
            .expect("GET /cart")
            .json()
            .await
            .expect("cart body")
    }

    /// Fetch the cart and return the session's CSRF token.
    ///
    /// # Panics
    ///
    /// Panics if the server issues no token.
    pub async fn csrf_token(&self) -> String {
        self.fetch_cart().await["csrf_token"]
            .as_str()
            .expect("csrf token")
            .to_string()
    }
}

/// Configuration for tests; never read from the environment.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().expect("loopback address"),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        session_secret: SecretString::from("wJ9#kQ2$vN8@xB5!mC3^zR7&pL1*dF6%"),
        catalog_path: PathBuf::from("unused/products.json"),
        coupons_path: PathBuf::from("unused/coupons.json"),
        cart: CartConfig::default(),
        sentry_dsn: None,
    }
}

/// The fixture catalog used by the integration tests.
#[must_use]
pub fn fixture_products() -> Vec<Product> {
    let product = |id: i64, name: &str, price: i64, category: &str| Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Decimal::new(price, 0),
        image: format!("img/product-{id}.jpg"),
        rating: 4.5,
        category: category.to_string(),
        description: "A sample product.".to_string(),
    };

    vec![
        product(1, "Nikon Camera", 25000, "devices"),
        product(2, "Blue Jacket", 1500, "jackets"),
        product(3, "Stand Lamp", 1200, "accessories"),
    ]
}

/// Application state over the fixture catalog and built-in coupons.
///
/// # Panics
///
/// Panics if the fixture catalog is invalid.
#[must_use]
pub fn test_state() -> AppState {
    let catalog = ProductCatalog::from_products(fixture_products()).expect("fixture catalog");
    AppState::new(test_config(), catalog, CouponBook::builtin())
}

/// A complete, valid checkout form body (without the CSRF token).
#[must_use]
pub fn checkout_form() -> serde_json::Value {
    serde_json::json!({
        "billing-first-name": "Asha",
        "billing-last-name": "Mwangi",
        "billing-email": "asha@example.com",
        "billing-mobile": "+254712345678",
        "billing-address1": "12 Biashara Street",
        "billing-country": "Kenya",
        "billing-city": "Nairobi",
        "billing-state": "Nairobi",
        "billing-zip": "00100",
        "payment": "mpesa"
    })
}
