//! Middleware for the storefront.

pub mod csrf;
pub mod session;

pub use csrf::{ensure_csrf_token, verify_csrf_token};
pub use session::create_session_layer;
