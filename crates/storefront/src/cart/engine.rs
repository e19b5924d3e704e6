//! Cart normalization, mutation, and summary computation.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use sokoni_core::ProductId;

use crate::catalog::ProductCatalog;
use crate::config::CartConfig;
use crate::coupons::CouponBook;

use super::store::{CartStore, StoreError};

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The requested product does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The coupon code is unknown.
    #[error("Invalid coupon code: {0}")]
    InvalidCoupon(String),

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A normalized cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub quantity: u32,
    pub size: String,
    pub color: String,
}

impl LineItem {
    /// Price times quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Whether this line matches the `(product, size, color)` merge key.
    #[must_use]
    pub fn matches(&self, product_id: ProductId, size: &str, color: &str) -> bool {
        self.product_id == product_id && self.size == size && self.color == color
    }
}

/// A cart line as persisted, before repair.
///
/// Every field is optional and type-tolerant: a wrong-typed value reads as
/// absent and is re-defaulted during normalization instead of poisoning the
/// whole document. `product_id` is also accepted under the legacy `id` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLineItem {
    #[serde(default, alias = "id", deserialize_with = "lenient_i64")]
    pub product_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub color: Option<String>,
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?.as_i64())
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?.as_f64())
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Derived order summary. Never stored; recomputed from the cart on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub item_count: u32,
}

/// The cart engine.
///
/// Owns normalization, mutation, coupon application, and total computation,
/// against an injected catalog/coupon table and a single `CartConfig`.
#[derive(Debug, Clone)]
pub struct CartEngine {
    catalog: Arc<ProductCatalog>,
    coupons: CouponBook,
    config: CartConfig,
}

impl CartEngine {
    /// Create a new engine.
    #[must_use]
    pub fn new(catalog: Arc<ProductCatalog>, coupons: CouponBook, config: CartConfig) -> Self {
        Self {
            catalog,
            coupons,
            config,
        }
    }

    /// The engine's cart configuration.
    #[must_use]
    pub const fn config(&self) -> &CartConfig {
        &self.config
    }

    /// The engine's product catalog.
    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Repair a raw cart into a normalized one.
    ///
    /// Entries without a product id are dropped. Known products get their
    /// canonical name/price/image from the catalog; unknown products keep
    /// their own values where valid, otherwise the configured defaults.
    /// Quantities are floored and clamped into `[1, max_quantity]`; sizes and
    /// colors get their defaults. The cart is truncated to the configured
    /// maximum line count. Normalizing an already-normalized cart yields the
    /// same cart.
    #[must_use]
    pub fn normalize(&self, raw: Vec<RawLineItem>) -> Vec<LineItem> {
        raw.into_iter()
            .take(self.config.max_cart_items)
            .enumerate()
            .filter_map(|(index, entry)| {
                let Some(id) = entry.product_id else {
                    tracing::warn!(index, "dropping cart entry without a product id");
                    return None;
                };
                Some(self.normalize_entry(ProductId::new(id), entry))
            })
            .collect()
    }

    fn normalize_entry(&self, id: ProductId, entry: RawLineItem) -> LineItem {
        let product = self.catalog.find_by_id(id);

        let name = product
            .map(|p| p.name.clone())
            .or_else(|| entry.name.filter(|n| !n.is_empty()))
            .unwrap_or_else(|| format!("Product {id}"));

        let price = product.map(|p| p.price).unwrap_or_else(|| {
            entry
                .price
                .and_then(positive_price)
                .unwrap_or(self.config.default_price)
        });

        let image = product
            .map(|p| p.image.clone())
            .or_else(|| entry.image.filter(|i| !i.is_empty()))
            .unwrap_or_else(|| self.config.default_image.clone());

        LineItem {
            product_id: id,
            name,
            price,
            image,
            quantity: clamp_quantity(entry.quantity, self.config.max_quantity),
            size: entry
                .size
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| self.config.default_size.clone()),
            color: entry
                .color
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| self.config.default_color.clone()),
        }
    }

    /// Load, repair, and persist the cart held by `store`.
    ///
    /// This is the repair-on-read entry point: malformed documents have
    /// already been reset by the store, invalid entries are dropped here, and
    /// the normalized result is written back whole. An empty result clears
    /// any stored discount.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read or written.
    pub async fn reconcile<S: CartStore>(&self, store: &S) -> Result<Vec<LineItem>, StoreError> {
        let raw = store.load().await?;
        let cart = self.normalize(raw);
        store.save(&cart).await?;
        if cart.is_empty() {
            store.clear_discount().await?;
        }
        Ok(cart)
    }

    /// Add a product to the cart.
    ///
    /// A line with the same `(product, size, color)` key has its quantity
    /// incremented; otherwise a new line is appended with the catalog's
    /// canonical name, price, and image. A missing or invalid quantity
    /// defaults to 1. The merged quantity is deliberately not re-clamped
    /// here; the next reconcile pass clamps it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product id is unknown.
    pub fn add_item(
        &self,
        cart: &mut Vec<LineItem>,
        product_id: ProductId,
        size: &str,
        color: &str,
        quantity: Option<f64>,
    ) -> Result<(), CartError> {
        let product = self
            .catalog
            .find_by_id(product_id)
            .ok_or(CartError::ProductNotFound(product_id))?;

        let quantity = requested_quantity(quantity);

        if let Some(line) = cart.iter_mut().find(|l| l.matches(product_id, size, color)) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            cart.push(LineItem {
                product_id,
                name: product.name.clone(),
                price: product.price,
                image: product.image.clone(),
                quantity,
                size: size.to_string(),
                color: color.to_string(),
            });
        }

        Ok(())
    }

    /// Step a line's quantity by one in either direction.
    ///
    /// Increment clamps at the configured maximum; decrement floors at 1 and
    /// never removes the line. An out-of-range index is a no-op.
    pub fn update_quantity(&self, cart: &mut [LineItem], index: usize, delta: i32) {
        let Some(line) = cart.get_mut(index) else {
            return;
        };

        if delta > 0 {
            line.quantity = line.quantity.saturating_add(1).min(self.config.max_quantity);
        } else if delta < 0 && line.quantity > 1 {
            line.quantity -= 1;
        }
    }

    /// Set the quantity of the line matching the merge key.
    ///
    /// A quantity of at least 1 replaces the line's quantity (clamped to the
    /// configured maximum); zero or less removes the line. Returns whether a
    /// line was found.
    pub fn set_quantity(
        &self,
        cart: &mut Vec<LineItem>,
        product_id: ProductId,
        size: &str,
        color: &str,
        quantity: i64,
    ) -> bool {
        let Some(position) = cart.iter().position(|l| l.matches(product_id, size, color)) else {
            return false;
        };

        if quantity > 0 {
            let clamped = u32::try_from(quantity)
                .unwrap_or(self.config.max_quantity)
                .min(self.config.max_quantity);
            if let Some(line) = cart.get_mut(position) {
                line.quantity = clamped;
            }
        } else {
            cart.remove(position);
        }

        true
    }

    /// Remove the line at `index`. An out-of-range index is a no-op.
    pub fn remove_item(&self, cart: &mut Vec<LineItem>, index: usize) {
        if index < cart.len() {
            cart.remove(index);
        }
    }

    /// Remove every line matching the merge key.
    pub fn remove_matching(
        &self,
        cart: &mut Vec<LineItem>,
        product_id: ProductId,
        size: &str,
        color: &str,
    ) {
        cart.retain(|l| !l.matches(product_id, size, color));
    }

    /// Apply a coupon code to the store.
    ///
    /// Known codes persist their discount and return it. Unknown codes clear
    /// any stored discount and fail.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidCoupon` for unknown codes and `StoreError`
    /// if the store cannot be written.
    pub async fn apply_coupon<S: CartStore>(
        &self,
        store: &S,
        code: &str,
    ) -> Result<Decimal, CartError> {
        match self.coupons.lookup(code) {
            Some(discount) => {
                store.set_discount(discount).await?;
                Ok(discount)
            }
            None => {
                store.clear_discount().await?;
                Err(CartError::InvalidCoupon(code.trim().to_uppercase()))
            }
        }
    }

    /// Coerce a requested add quantity the way [`add_item`](Self::add_item)
    /// does: positive integers pass through, anything else defaults to 1.
    #[must_use]
    pub fn coerce_quantity(quantity: Option<f64>) -> u32 {
        requested_quantity(quantity)
    }

    /// Compute the order summary for a cart and discount.
    ///
    /// Shipping is the flat configured fee for non-empty carts; the total is
    /// floored at zero.
    #[must_use]
    pub fn compute_summary(&self, cart: &[LineItem], discount: Decimal) -> CartSummary {
        let subtotal: Decimal = cart.iter().map(LineItem::line_total).sum();
        let shipping = if cart.is_empty() {
            Decimal::ZERO
        } else {
            self.config.shipping_cost
        };
        let total = (subtotal - discount + shipping).max(Decimal::ZERO);
        let item_count = cart.iter().map(|l| l.quantity).sum();

        CartSummary {
            subtotal,
            shipping,
            discount,
            total,
            item_count,
        }
    }
}

/// A stored price is only trusted when it is a finite positive number.
fn positive_price(price: f64) -> Option<Decimal> {
    if price.is_finite() && price > 0.0 {
        Decimal::from_f64(price)
    } else {
        None
    }
}

/// Floor a stored quantity and clamp it into `[1, max]`.
fn clamp_quantity(quantity: Option<f64>, max: u32) -> u32 {
    let quantity = quantity.unwrap_or(1.0);
    if !quantity.is_finite() || quantity < 1.0 {
        return 1;
    }
    let floored = quantity.floor();
    if floored >= f64::from(max) {
        max
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        // floored is in [1, max] here
        {
            floored as u32
        }
    }
}

/// Coerce a requested add quantity: positive integers pass through, anything
/// else defaults to 1.
fn requested_quantity(quantity: Option<f64>) -> u32 {
    match quantity {
        Some(q) if q.is_finite() && q.floor() >= 1.0 => {
            let floored = q.floor();
            if floored >= f64::from(u32::MAX) {
                u32::MAX
            } else {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                // floored is in [1, u32::MAX) here
                {
                    floored as u32
                }
            }
        }
        _ => 1,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::catalog::{Product, ProductCatalog};
    use crate::config::CartConfig;
    use crate::coupons::CouponBook;

    use super::*;

    fn product(id: i64, name: &str, price: i64, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::new(price, 0),
            image: format!("img/product-{id}.jpg"),
            rating: 4.5,
            category: category.to_string(),
            description: "A sample product.".to_string(),
        }
    }

    fn engine() -> CartEngine {
        let catalog = ProductCatalog::from_products(vec![
            product(1, "Nikon Camera", 25000, "devices"),
            product(2, "Blue Jacket", 1500, "jackets"),
        ])
        .unwrap();
        CartEngine::new(
            Arc::new(catalog),
            CouponBook::builtin(),
            CartConfig::default(),
        )
    }

    fn raw(value: serde_json::Value) -> Vec<RawLineItem> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_drops_entries_without_id() {
        let engine = engine();
        let cart = engine.normalize(raw(json!([
            {"name": "orphan", "price": 5, "quantity": 1},
            {"id": 1, "quantity": 1},
        ])));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.first().unwrap().product_id, ProductId::new(1));
    }

    #[test]
    fn test_normalize_resolves_catalog_fields() {
        let engine = engine();
        let cart = engine.normalize(raw(json!([
            {"id": 2, "name": "stale name", "price": 1.0, "image": "stale.jpg", "quantity": 2},
        ])));
        let line = cart.first().unwrap();
        assert_eq!(line.name, "Blue Jacket");
        assert_eq!(line.price, Decimal::new(1500, 0));
        assert_eq!(line.image, "img/product-2.jpg");
    }

    #[test]
    fn test_normalize_unknown_product_keeps_own_values() {
        let engine = engine();
        let cart = engine.normalize(raw(json!([
            {"id": 77, "name": "Mystery", "price": 42.5, "image": "mystery.jpg", "quantity": 1},
        ])));
        let line = cart.first().unwrap();
        assert_eq!(line.name, "Mystery");
        assert_eq!(line.price, Decimal::new(425, 1));
        assert_eq!(line.image, "mystery.jpg");
    }

    #[test]
    fn test_normalize_unknown_product_defaults() {
        let engine = engine();
        let cart = engine.normalize(raw(json!([
            {"id": 77, "price": -3},
        ])));
        let line = cart.first().unwrap();
        assert_eq!(line.name, "Product 77");
        assert_eq!(line.price, Decimal::new(9999, 2));
        assert_eq!(line.image, "img/product-1.jpg");
        assert_eq!(line.quantity, 1);
        assert_eq!(line.size, "M");
        assert_eq!(line.color, "Black");
    }

    #[test]
    fn test_normalize_clamps_quantity() {
        let engine = engine();
        let cart = engine.normalize(raw(json!([
            {"id": 1, "quantity": 0},
            {"id": 1, "quantity": 2.9},
            {"id": 1, "quantity": 250},
            {"id": 1, "quantity": "three"},
        ])));
        let quantities: Vec<u32> = cart.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 100, 1]);
    }

    #[test]
    fn test_normalize_quantity_always_in_range() {
        let engine = engine();
        let cart = engine.normalize(raw(json!([
            {"id": 1, "quantity": -5},
            {"id": 2, "quantity": 1e12},
            {"id": 2, "quantity": null},
        ])));
        for line in &cart {
            assert!(line.quantity >= 1);
            assert!(line.quantity <= 100);
        }
    }

    #[test]
    fn test_normalize_truncates_to_max_items() {
        let engine = engine();
        let entries: Vec<serde_json::Value> = (0..60).map(|_| json!({"id": 1})).collect();
        let cart = engine.normalize(raw(serde_json::Value::Array(entries)));
        assert_eq!(cart.len(), 50);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let engine = engine();
        let cart = engine.normalize(raw(json!([
            {"id": 2, "quantity": 3.7, "size": "", "color": null},
            {"id": 77, "price": 42.5, "quantity": 800},
        ])));

        // Round-trip through the persisted form and normalize again.
        let persisted = serde_json::to_value(&cart).unwrap();
        let again = engine.normalize(serde_json::from_value(persisted).unwrap());
        assert_eq!(cart, again);
    }

    #[test]
    fn test_add_item_unknown_product() {
        let engine = engine();
        let mut cart = Vec::new();
        let result = engine.add_item(&mut cart, ProductId::new(99), "M", "Black", Some(1.0));
        assert!(matches!(result, Err(CartError::ProductNotFound(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_item_merges_on_key() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(1), "M", "Black", Some(2.0))
            .unwrap();
        engine
            .add_item(&mut cart, ProductId::new(1), "M", "Black", Some(2.0))
            .unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.first().unwrap().quantity, 4);
    }

    #[test]
    fn test_add_item_distinct_variants_get_own_lines() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(1), "M", "Black", Some(1.0))
            .unwrap();
        engine
            .add_item(&mut cart, ProductId::new(1), "L", "Black", Some(1.0))
            .unwrap();
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_add_item_invalid_quantity_defaults_to_one() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(1), "M", "Black", Some(-4.0))
            .unwrap();
        engine
            .add_item(&mut cart, ProductId::new(2), "M", "Black", None)
            .unwrap();
        assert!(cart.iter().all(|l| l.quantity == 1));
    }

    #[test]
    fn test_update_quantity_bounds() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(1), "M", "Black", Some(1.0))
            .unwrap();

        // Decrement at 1 stays at 1.
        engine.update_quantity(&mut cart, 0, -1);
        assert_eq!(cart.first().unwrap().quantity, 1);

        // Increment at the cap stays at the cap.
        cart.first_mut().unwrap().quantity = 100;
        engine.update_quantity(&mut cart, 0, 1);
        assert_eq!(cart.first().unwrap().quantity, 100);

        // Out-of-range index is a no-op.
        engine.update_quantity(&mut cart, 5, 1);
        assert_eq!(cart.first().unwrap().quantity, 100);
    }

    #[test]
    fn test_set_quantity_replaces_or_removes() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(1), "M", "Black", Some(2.0))
            .unwrap();

        assert!(engine.set_quantity(&mut cart, ProductId::new(1), "M", "Black", 5));
        assert_eq!(cart.first().unwrap().quantity, 5);

        // Over the cap clamps.
        assert!(engine.set_quantity(&mut cart, ProductId::new(1), "M", "Black", 500));
        assert_eq!(cart.first().unwrap().quantity, 100);

        // Unknown key reports not found.
        assert!(!engine.set_quantity(&mut cart, ProductId::new(1), "XL", "Black", 2));

        // Zero removes.
        assert!(engine.set_quantity(&mut cart, ProductId::new(1), "M", "Black", 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_item_out_of_range_is_noop() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(1), "M", "Black", Some(1.0))
            .unwrap();
        engine.remove_item(&mut cart, 7);
        assert_eq!(cart.len(), 1);
        engine.remove_item(&mut cart, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_matching() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(1), "M", "Black", Some(1.0))
            .unwrap();
        engine
            .add_item(&mut cart, ProductId::new(1), "L", "Black", Some(1.0))
            .unwrap();
        engine.remove_matching(&mut cart, ProductId::new(1), "M", "Black");
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.first().unwrap().size, "L");
    }

    #[test]
    fn test_compute_summary_scenario() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(2), "M", "Black", Some(2.0))
            .unwrap();

        let summary = engine.compute_summary(&cart, Decimal::ZERO);
        assert_eq!(summary.subtotal, Decimal::new(3000, 0));
        assert_eq!(summary.shipping, Decimal::new(10, 0));
        assert_eq!(summary.total, Decimal::new(3010, 0));
        assert_eq!(summary.item_count, 2);
    }

    #[test]
    fn test_compute_summary_empty_cart() {
        let engine = engine();
        let summary = engine.compute_summary(&[], Decimal::ZERO);
        assert_eq!(summary.subtotal, Decimal::ZERO);
        assert_eq!(summary.shipping, Decimal::ZERO);
        assert_eq!(summary.discount, Decimal::ZERO);
        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.item_count, 0);
    }

    #[test]
    fn test_compute_summary_total_never_negative() {
        let engine = engine();
        let mut cart = Vec::new();
        engine
            .add_item(&mut cart, ProductId::new(2), "M", "Black", Some(1.0))
            .unwrap();

        let summary = engine.compute_summary(&cart, Decimal::new(10_000, 0));
        assert_eq!(summary.total, Decimal::ZERO);
    }
}
