//! Cart persistence backends.
//!
//! Stores hold a whole cart document plus a single discount value. The
//! discipline is read-fresh / write-whole: no store exposes field-level
//! updates, so every mutation is a full read-modify-write of the document.
//!
//! A malformed document is a local condition, never a caller-visible error:
//! the store logs a warning, resets itself to an empty document, and reports
//! an empty cart.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;

use super::engine::{LineItem, RawLineItem};

/// Errors surfaced by cart stores.
///
/// Parse failures are absent by design: they are recovered internally by
/// resetting to an empty document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session layer failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Serializing the document failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence for a single cart and its discount.
#[allow(async_fn_in_trait)]
pub trait CartStore {
    /// Read the raw cart document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only for backend failures; malformed data reads
    /// as an empty cart.
    async fn load(&self) -> Result<Vec<RawLineItem>, StoreError>;

    /// Replace the cart document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be written.
    async fn save(&self, items: &[LineItem]) -> Result<(), StoreError>;

    /// Read the stored discount, zero when absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` for backend failures.
    async fn discount(&self) -> Result<Decimal, StoreError>;

    /// Store a discount value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the value cannot be written.
    async fn set_discount(&self, discount: Decimal) -> Result<(), StoreError>;

    /// Clear any stored discount.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the value cannot be cleared.
    async fn clear_discount(&self) -> Result<(), StoreError>;
}

/// Decode a stored cart value entry-by-entry.
///
/// Entries that are not objects decode to a default raw line (no product id)
/// and are dropped by normalization. A value that is not an array at all is
/// malformed.
fn raw_items_from_value(value: serde_json::Value) -> Option<Vec<RawLineItem>> {
    match value {
        serde_json::Value::Array(entries) => Some(
            entries
                .into_iter()
                .map(|entry| serde_json::from_value(entry).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Session keys for cart data.
pub mod keys {
    /// Key for the cart document.
    pub const CART: &str = "cart";

    /// Key for the coupon discount.
    pub const COUPON_DISCOUNT: &str = "coupon_discount";

    /// Key for the CSRF token.
    pub const CSRF_TOKEN: &str = "csrf_token";
}

/// Cart persistence in the visitor's session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    session: Session,
}

impl SessionStore {
    /// Wrap a session handle.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartStore for SessionStore {
    async fn load(&self) -> Result<Vec<RawLineItem>, StoreError> {
        let value = match self.session.get::<serde_json::Value>(keys::CART).await {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(Vec::new()),
            Err(e) => {
                tracing::warn!(error = %e, "stored cart is unreadable, resetting");
                let _: Option<serde_json::Value> = self.session.remove(keys::CART).await?;
                return Ok(Vec::new());
            }
        };

        match raw_items_from_value(value) {
            Some(items) => Ok(items),
            None => {
                tracing::warn!("stored cart is not a list, resetting");
                let _: Option<serde_json::Value> = self.session.remove(keys::CART).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, items: &[LineItem]) -> Result<(), StoreError> {
        self.session.insert(keys::CART, items).await?;
        Ok(())
    }

    async fn discount(&self) -> Result<Decimal, StoreError> {
        match self.session.get::<Decimal>(keys::COUPON_DISCOUNT).await {
            Ok(Some(discount)) => Ok(discount),
            Ok(None) => Ok(Decimal::ZERO),
            Err(e) => {
                tracing::warn!(error = %e, "stored discount is unreadable, clearing");
                let _: Option<serde_json::Value> =
                    self.session.remove(keys::COUPON_DISCOUNT).await?;
                Ok(Decimal::ZERO)
            }
        }
    }

    async fn set_discount(&self, discount: Decimal) -> Result<(), StoreError> {
        self.session.insert(keys::COUPON_DISCOUNT, discount).await?;
        Ok(())
    }

    async fn clear_discount(&self) -> Result<(), StoreError> {
        let _: Option<serde_json::Value> = self.session.remove(keys::COUPON_DISCOUNT).await?;
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// The on-disk document: cart lines plus the discount, in one file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CartDocument {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    discount: Decimal,
}

/// Cart persistence in a single JSON file.
///
/// Useful for standalone tools and tests; the file plays the role the
/// browser's local storage played for the cart page.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the document, recovering from a missing or corrupt file.
    async fn read_document(&self) -> Result<CartDocument, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CartDocument::default());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        match serde_json::from_str(&contents) {
            Ok(document) => Ok(document),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cart file is corrupt, resetting");
                let document = CartDocument::default();
                self.write_document(&document).await?;
                Ok(document)
            }
        }
    }

    async fn write_document(&self, document: &CartDocument) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

impl CartStore for FileStore {
    async fn load(&self) -> Result<Vec<RawLineItem>, StoreError> {
        let document = self.read_document().await?;
        Ok(raw_items_from_value(serde_json::Value::Array(document.items)).unwrap_or_default())
    }

    async fn save(&self, items: &[LineItem]) -> Result<(), StoreError> {
        let mut document = self.read_document().await?;
        document.items = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?;
        self.write_document(&document).await
    }

    async fn discount(&self) -> Result<Decimal, StoreError> {
        Ok(self.read_document().await?.discount)
    }

    async fn set_discount(&self, discount: Decimal) -> Result<(), StoreError> {
        let mut document = self.read_document().await?;
        document.discount = discount;
        self.write_document(&document).await
    }

    async fn clear_discount(&self) -> Result<(), StoreError> {
        let mut document = self.read_document().await?;
        document.discount = Decimal::ZERO;
        self.write_document(&document).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("sokoni-store-{name}-{}.json", std::process::id()));
        path
    }

    fn line(id: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: sokoni_core::ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::new(1500, 0),
            image: "img/product-1.jpg".to_string(),
            quantity,
            size: "M".to_string(),
            color: "Black".to_string(),
        }
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let path = temp_path("roundtrip");
        let store = FileStore::new(&path);

        assert!(store.load().await.unwrap().is_empty());

        store.save(&[line(1, 2)]).await.unwrap();
        store.set_discount(Decimal::new(10, 0)).await.unwrap();

        let raw = store.load().await.unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.first().unwrap().product_id, Some(1));
        assert_eq!(store.discount().await.unwrap(), Decimal::new(10, 0));

        store.clear_discount().await.unwrap();
        assert_eq!(store.discount().await.unwrap(), Decimal::ZERO);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_recovers_from_corrupt_file() {
        let path = temp_path("corrupt");
        tokio::fs::write(&path, "{not json at all")
            .await
            .unwrap();

        let store = FileStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.discount().await.unwrap(), Decimal::ZERO);

        // The file was reset to a valid empty document.
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(serde_json::from_str::<CartDocument>(&contents).is_ok());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_drops_non_object_entries() {
        let path = temp_path("entries");
        tokio::fs::write(
            &path,
            r#"{"items": [17, "junk", {"id": 3, "quantity": 2}], "discount": 0}"#,
        )
        .await
        .unwrap();

        let store = FileStore::new(&path);
        let raw = store.load().await.unwrap();
        assert_eq!(raw.len(), 3);
        // The junk entries carry no product id and will be dropped by repair.
        assert_eq!(raw.iter().filter(|e| e.product_id.is_some()).count(), 1);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
