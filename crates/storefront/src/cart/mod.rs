//! Cart state: normalization engine, persistence backends, remote client.
//!
//! # Architecture
//!
//! - [`engine`] - the single `CartEngine`: repair/normalization, mutation,
//!   coupon application, and summary computation, parameterized by
//!   `CartConfig`. Every surface (cart page, checkout, remote actions) goes
//!   through this one implementation.
//! - [`store`] - the `CartStore` trait plus the session-backed and
//!   file-backed persistence variants. Stores hold whole documents: carts
//!   are read fresh and written whole, never field-patched.
//! - [`remote`] - `RemoteCart`, an HTTP client for a storefront running
//!   elsewhere, with fixed-delay retries and serialized mutations.

pub mod engine;
pub mod remote;
pub mod store;

pub use engine::{CartEngine, CartError, CartSummary, LineItem, RawLineItem};
pub use remote::{RemoteCart, RemoteCartError};
pub use store::{CartStore, FileStore, SessionStore, StoreError};
