//! Shopline storefront client.
//!
//! Session, catalog and optimistic cart reconciliation against the Shopline
//! REST backend. The [`Storefront`] store object is the entry point; the
//! modules below are public so embedders can drive individual pieces.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod token;

pub use admin::ProductDraft;
pub use api::{AccessToken, ApiError, HttpBackend, ImageUpload};
pub use cart::{CartReconciler, MutationOutcome};
pub use catalog::{ALL_CATEGORIES, CatalogCache, CatalogSnapshot};
pub use config::{ConfigError, LogFormat, StorefrontConfig};
pub use error::{Result, StorefrontError};
pub use session::{BootOutcome, Session, SessionStore};
pub use state::Storefront;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError};
