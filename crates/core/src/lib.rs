//! Shopline Core - Shared domain types.
//!
//! This crate provides the types used across all Shopline components:
//! - `storefront` - Session, catalog and cart reconciliation client library
//! - `cli` - Terminal front end for browsing and cart management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere, including in tests that
//! fake the backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, quantities, prices and emails, plus
//!   the product, cart and identity records exchanged with the backend

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
