//! Product catalog loaded once at startup.
//!
//! The catalog is the single source of truth for product names, prices, and
//! images. It is loaded from a JSON file, indexed by id, and handed to the
//! rest of the application as a shared read-only collaborator.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sokoni_core::ProductId;

/// Errors that can occur while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid JSON.
    #[error("failed to parse catalog file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Two products share the same id.
    #[error("duplicate product id: {0}")]
    DuplicateId(ProductId),
}

/// A product as exposed on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub rating: f32,
    pub category: String,
    pub description: String,
}

/// Sort orders accepted by the shop listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    NameAsc,
    PriceAsc,
    PriceDesc,
}

impl SortKey {
    /// Parse a sort key from its query-string form. Unknown values sort nothing.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name-asc" => Some(Self::NameAsc),
            "price-asc" => Some(Self::PriceAsc),
            "price-desc" => Some(Self::PriceDesc),
            _ => None,
        }
    }
}

/// Filters for the shop listing.
///
/// Every field is optional; parsing is tolerant so that a malformed price
/// range or unknown sort key degrades to "no filter" rather than an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopFilter {
    pub category: Option<String>,
    /// Price range in "min-max" form; the upper bound may be omitted.
    pub price: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

/// In-memory product catalog with an id index.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl ProductCatalog {
    /// Load the catalog from a JSON file (an array of products).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file cannot be read, is not valid JSON,
    /// or contains duplicate product ids.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let products: Vec<Product> =
            serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        Self::from_products(products)
    }

    /// Build a catalog from an in-memory product list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two products share an id.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(products.len());
        for (pos, product) in products.iter().enumerate() {
            if index.insert(product.id, pos).is_some() {
                return Err(CatalogError::DuplicateId(product.id));
            }
        }
        Ok(Self { products, index })
    }

    /// Look up a product by id.
    #[must_use]
    pub fn find_by_id(&self, id: ProductId) -> Option<&Product> {
        self.index.get(&id).and_then(|&pos| self.products.get(pos))
    }

    /// All products, in file order.
    #[must_use]
    pub fn all(&self) -> &[Product] {
        &self.products
    }

    /// Number of products in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// The first `count` products, used for the featured strip.
    #[must_use]
    pub fn featured(&self, count: usize) -> Vec<&Product> {
        self.products.iter().take(count).collect()
    }

    /// The `count` newest products (highest id first).
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<&Product> {
        let mut products: Vec<&Product> = self.products.iter().collect();
        products.sort_by(|a, b| b.id.cmp(&a.id));
        products.truncate(count);
        products
    }

    /// Products in the same category, excluding the product itself.
    #[must_use]
    pub fn related(&self, product: &Product, count: usize) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.id != product.id && p.category == product.category)
            .take(count)
            .collect()
    }

    /// Apply shop listing filters.
    #[must_use]
    pub fn filter(&self, filter: &ShopFilter) -> Vec<&Product> {
        let mut results: Vec<&Product> = self.products.iter().collect();

        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            results.retain(|p| p.category.eq_ignore_ascii_case(category));
        }

        if let Some(range) = filter.price.as_deref().filter(|r| !r.is_empty()) {
            let (min, max) = parse_price_range(range);
            if let Some(min) = min {
                results.retain(|p| p.price >= min);
            }
            if let Some(max) = max {
                results.retain(|p| p.price <= max);
            }
        }

        if let Some(query) = filter.search.as_deref().filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            results.retain(|p| {
                p.name.to_lowercase().contains(&query)
                    || p.category.to_lowercase().contains(&query)
            });
        }

        match filter.sort.as_deref().and_then(SortKey::parse) {
            Some(SortKey::NameAsc) => results.sort_by(|a, b| a.name.cmp(&b.name)),
            Some(SortKey::PriceAsc) => results.sort_by(|a, b| a.price.cmp(&b.price)),
            Some(SortKey::PriceDesc) => results.sort_by(|a, b| b.price.cmp(&a.price)),
            None => {}
        }

        results
    }
}

/// Parse a "min-max" price range; either bound degrades to `None` when absent
/// or unparsable.
fn parse_price_range(range: &str) -> (Option<Decimal>, Option<Decimal>) {
    match range.split_once('-') {
        Some((min, max)) => (min.trim().parse().ok(), max.trim().parse().ok()),
        None => (range.trim().parse().ok(), None),
    }
}
