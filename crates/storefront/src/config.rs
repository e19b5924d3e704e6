//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOKONI_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SOKONI_HOST` - Bind address (default: 127.0.0.1)
//! - `SOKONI_PORT` - Listen port (default: 5000)
//! - `SOKONI_BASE_URL` - Public URL for the storefront (default: `http://127.0.0.1:5000`)
//! - `SOKONI_CATALOG_PATH` - Product catalog JSON file (default: crates/storefront/data/products.json)
//! - `SOKONI_COUPONS_PATH` - Coupon table JSON file (default: crates/storefront/data/coupons.json)
//! - `SOKONI_SHIPPING_COST` - Flat shipping fee for non-empty carts (default: 10)
//! - `SOKONI_MAX_QUANTITY` - Per-line quantity cap (default: 100)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use sokoni_core::CurrencyCode;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Product catalog JSON file
    pub catalog_path: PathBuf,
    /// Coupon table JSON file
    pub coupons_path: PathBuf,
    /// Cart behavior configuration
    pub cart: CartConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Cart normalization and pricing configuration.
///
/// One set of knobs shared by every cart operation, so the listing, cart,
/// and checkout paths can never disagree on fees or caps.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Currency used for all amounts
    pub currency: CurrencyCode,
    /// Flat shipping fee applied to non-empty carts
    pub shipping_cost: Decimal,
    /// Per-line quantity cap
    pub max_quantity: u32,
    /// Maximum number of lines kept in a cart
    pub max_cart_items: usize,
    /// Price substituted for missing/invalid prices of unknown products
    pub default_price: Decimal,
    /// Image substituted for missing images
    pub default_image: String,
    /// Size substituted for missing sizes
    pub default_size: String,
    /// Color substituted for missing colors
    pub default_color: String,
    /// Stock assigned to every product at startup
    pub default_stock: u32,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::KES,
            shipping_cost: Decimal::new(10, 0),
            max_quantity: 100,
            max_cart_items: 50,
            default_price: Decimal::new(9999, 2),
            default_image: "img/product-1.jpg".to_string(),
            default_size: "M".to_string(),
            default_color: "Black".to_string(),
            default_stock: 100,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("SOKONI_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SOKONI_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SOKONI_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SOKONI_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("SOKONI_BASE_URL", "http://127.0.0.1:5000");
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SOKONI_BASE_URL".to_string(), e.to_string()))?;

        let session_secret = get_validated_secret("SOKONI_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SOKONI_SESSION_SECRET")?;

        let catalog_path = PathBuf::from(get_env_or_default(
            "SOKONI_CATALOG_PATH",
            "crates/storefront/data/products.json",
        ));
        let coupons_path = PathBuf::from(get_env_or_default(
            "SOKONI_COUPONS_PATH",
            "crates/storefront/data/coupons.json",
        ));

        let cart = CartConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            catalog_path,
            coupons_path,
            cart,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CartConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut cart = Self::default();

        if let Some(value) = get_optional_env("SOKONI_SHIPPING_COST") {
            cart.shipping_cost = value.parse::<Decimal>().map_err(|e| {
                ConfigError::InvalidEnvVar("SOKONI_SHIPPING_COST".to_string(), e.to_string())
            })?;
        }

        if let Some(value) = get_optional_env("SOKONI_MAX_QUANTITY") {
            cart.max_quantity = value.parse::<u32>().map_err(|e| {
                ConfigError::InvalidEnvVar("SOKONI_MAX_QUANTITY".to_string(), e.to_string())
            })?;
        }

        Ok(cart)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
