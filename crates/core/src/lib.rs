//! Sokoni Core - Shared types library.
//!
//! This crate provides common types used across all Sokoni components:
//! - `storefront` - Public-facing shop service
//! - `cli` - Command-line tools for seeding demo data
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and phone numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
