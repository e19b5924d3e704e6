//! Application state shared across handlers.

use std::sync::Arc;

use crate::cart::engine::CartEngine;
use crate::catalog::{CatalogError, ProductCatalog};
use crate::checkout::OrderLedger;
use crate::config::StorefrontConfig;
use crate::coupons::CouponBook;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to shared
/// resources: the configuration, the product catalog, the cart engine, and
/// the order ledger.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Arc<ProductCatalog>,
    engine: CartEngine,
    ledger: OrderLedger,
}

impl AppState {
    /// Create the application state from configuration, loading the catalog
    /// and coupon table from their configured paths.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the catalog file cannot be loaded.
    pub fn from_config(config: StorefrontConfig) -> Result<Self, CatalogError> {
        let catalog = ProductCatalog::load(&config.catalog_path)?;
        let coupons = CouponBook::load_or_builtin(&config.coupons_path);
        Ok(Self::new(config, catalog, coupons))
    }

    /// Create the application state from already-loaded collaborators.
    #[must_use]
    pub fn new(config: StorefrontConfig, catalog: ProductCatalog, coupons: CouponBook) -> Self {
        let catalog = Arc::new(catalog);
        let ledger = OrderLedger::new(&catalog, config.cart.default_stock);
        let engine = CartEngine::new(Arc::clone(&catalog), coupons, config.cart.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                engine,
                ledger,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }

    /// Get a reference to the cart engine.
    #[must_use]
    pub fn engine(&self) -> &CartEngine {
        &self.inner.engine
    }

    /// Get a reference to the order ledger.
    #[must_use]
    pub fn ledger(&self) -> &OrderLedger {
        &self.inner.ledger
    }
}
