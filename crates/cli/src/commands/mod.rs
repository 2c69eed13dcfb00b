//! Subcommand implementations.
//!
//! Every command starts the store the same way: load the catalog and
//! silently restore the persisted session.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;

use shopline_storefront::{BootOutcome, Storefront};

/// Boot the store and log how the session came back.
async fn start(store: &Storefront) -> BootOutcome {
    let outcome = store.boot().await;
    tracing::debug!(outcome = ?outcome, "Store booted");
    outcome
}
