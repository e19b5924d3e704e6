//! Coupon table.
//!
//! Coupons are flat currency discounts applied to the whole cart. The table
//! is loaded from a JSON file when present, otherwise the built-in pair is
//! used.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading the coupon table.
#[derive(Debug, Error)]
pub enum CouponError {
    /// The coupon file could not be read.
    #[error("failed to read coupon file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The coupon file is not valid JSON.
    #[error("failed to parse coupon file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single coupon entry as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount: Decimal,
}

/// Lookup table of coupon codes to flat discounts.
#[derive(Debug, Clone)]
pub struct CouponBook {
    codes: HashMap<String, Decimal>,
}

impl CouponBook {
    /// The built-in coupon pair.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_coupons(vec![
            Coupon {
                code: "SAVE10".to_string(),
                discount: Decimal::new(10, 0),
            },
            Coupon {
                code: "SAVE20".to_string(),
                discount: Decimal::new(20, 0),
            },
        ])
    }

    /// Build a book from a coupon list. Codes are stored uppercase.
    #[must_use]
    pub fn from_coupons(coupons: Vec<Coupon>) -> Self {
        let codes = coupons
            .into_iter()
            .map(|c| (c.code.trim().to_uppercase(), c.discount))
            .collect();
        Self { codes }
    }

    /// Load the coupon table from a JSON file (an array of `{code, discount}`).
    ///
    /// # Errors
    ///
    /// Returns `CouponError` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CouponError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CouponError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let coupons: Vec<Coupon> =
            serde_json::from_str(&contents).map_err(|source| CouponError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self::from_coupons(coupons))
    }

    /// Load from a file, falling back to the built-in table when the file is
    /// missing or unreadable.
    #[must_use]
    pub fn load_or_builtin(path: &Path) -> Self {
        match Self::load(path) {
            Ok(book) => book,
            Err(e) => {
                tracing::warn!(error = %e, "coupon file unavailable, using built-in coupons");
                Self::builtin()
            }
        }
    }

    /// Look up a code. Input is trimmed and compared case-insensitively.
    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<Decimal> {
        self.codes.get(&code.trim().to_uppercase()).copied()
    }

    /// Number of known codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the book has no codes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for CouponBook {
    fn default() -> Self {
        Self::builtin()
    }
}
