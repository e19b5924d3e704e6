//! Demo data seeding.
//!
//! Writes the product catalog and coupon table the storefront loads at
//! startup. Existing files are left alone unless `--force` is given.

use std::path::Path;

use rust_decimal::Decimal;
use thiserror::Error;

use sokoni_core::ProductId;
use sokoni_storefront::catalog::Product;
use sokoni_storefront::coupons::Coupon;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The demo product catalog.
fn demo_products() -> Vec<Product> {
    let product = |id: i64, name: &str, price: i64, rating: f32, category: &str, description: &str| {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::new(price, 0),
            image: format!("img/product-{id}.jpg"),
            rating,
            category: category.to_string(),
            description: description.to_string(),
        }
    };

    vec![
        product(1, "Nikon Camera", 25000, 5.0, "devices", "A comfortable camera for every shot."),
        product(2, "Blue Jacket", 1500, 4.5, "jackets", "Stylish denim jacket for a trendy look."),
        product(3, "Stand Lamp", 1200, 3.5, "accessories", "Lighten your world."),
        product(4, "Black Sneakers", 2500, 2.0, "shoes", "Elegant sneakers for formal occasions."),
        product(5, "Drone", 100_000, 5.0, "devices", "Aero-stylish drone for stunning photos."),
        product(6, "Smart Watch", 3095, 4.5, "devices", "Track every second with style."),
        product(7, "Formal Shirt", 3704, 3.5, "shirts", "Crisp shirt for professional settings."),
        product(8, "Beauty Cream", 569, 2.0, "accessories", "Smoothens and protects your skin."),
        product(9, "Chinos", 1444, 2.0, "accessories", "Versatile chinos for a comfy seat."),
    ]
}

/// The demo coupon table.
fn demo_coupons() -> Vec<Coupon> {
    vec![
        Coupon {
            code: "SAVE10".to_string(),
            discount: Decimal::new(10, 0),
        },
        Coupon {
            code: "SAVE20".to_string(),
            discount: Decimal::new(20, 0),
        },
    ]
}

async fn write_json<T: serde::Serialize>(
    path: &Path,
    value: &T,
    force: bool,
) -> Result<bool, SeedError> {
    if path.exists() && !force {
        tracing::info!("{} already exists, skipping", path.display());
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SeedError::Io {
                path: parent.display().to_string(),
                source,
            })?;
    }

    let contents = serde_json::to_string_pretty(value).map_err(|source| SeedError::Encode {
        path: path.display().to_string(),
        source,
    })?;

    tokio::fs::write(path, contents)
        .await
        .map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;

    Ok(true)
}

/// Write the demo product catalog into `out`.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be encoded or written.
pub async fn products(out: &Path, force: bool) -> Result<(), SeedError> {
    let path = out.join("products.json");
    if write_json(&path, &demo_products(), force).await? {
        tracing::info!("Products seeded successfully!");
    }
    Ok(())
}

/// Write the demo coupon table into `out`.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be encoded or written.
pub async fn coupons(out: &Path, force: bool) -> Result<(), SeedError> {
    let path = out.join("coupons.json");
    if write_json(&path, &demo_coupons(), force).await? {
        tracing::info!("Coupons seeded successfully!");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sokoni_storefront::catalog::ProductCatalog;
    use sokoni_storefront::coupons::CouponBook;

    use super::*;

    #[test]
    fn test_demo_products_load_into_a_catalog() {
        let catalog = ProductCatalog::from_products(demo_products()).unwrap();
        assert_eq!(catalog.len(), 9);
        assert_eq!(
            catalog.find_by_id(ProductId::new(2)).unwrap().price,
            Decimal::new(1500, 0)
        );
    }

    #[test]
    fn test_demo_coupons_load_into_a_book() {
        let book = CouponBook::from_coupons(demo_coupons());
        assert_eq!(book.lookup("SAVE10"), Some(Decimal::new(10, 0)));
        assert_eq!(book.lookup("SAVE20"), Some(Decimal::new(20, 0)));
    }

    #[tokio::test]
    async fn test_seed_skips_existing_without_force() {
        let dir = std::env::temp_dir().join(format!("sokoni-seed-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("products.json");

        tokio::fs::write(&path, "[]").await.unwrap();
        products(&dir, false).await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "[]");

        products(&dir, true).await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("Nikon Camera"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
