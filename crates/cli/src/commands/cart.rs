//! Cart commands.
//!
//! Each one restores the session first; without one the store answers
//! `NotAuthenticated` before any request is sent.

use shopline_core::{ProductId, Quantity};
use shopline_storefront::{MutationOutcome, Storefront, StorefrontError};

use super::start;
use crate::error::CliError;
use crate::output;

pub async fn show(store: &Storefront) -> Result<(), CliError> {
    start(store).await;
    if !store.is_authenticated() {
        return Err(StorefrontError::NotAuthenticated.into());
    }
    print_cart(store);
    Ok(())
}

pub async fn add(store: &Storefront, id: &str, quantity: u32) -> Result<(), CliError> {
    let quantity = Quantity::new(quantity)
        .map_err(|_| CliError::Usage("Quantity must be at least 1".to_string()))?;

    start(store).await;
    let outcome = store.add_to_cart(&ProductId::new(id), quantity).await?;
    report(outcome);
    print_cart(store);
    Ok(())
}

pub async fn change(store: &Storefront, id: &str, delta: i64) -> Result<(), CliError> {
    start(store).await;
    let outcome = store.update_quantity(&ProductId::new(id), delta).await?;
    report(outcome);
    print_cart(store);
    Ok(())
}

pub async fn remove(store: &Storefront, id: &str) -> Result<(), CliError> {
    start(store).await;
    let outcome = store.remove_from_cart(&ProductId::new(id)).await?;
    report(outcome);
    print_cart(store);
    Ok(())
}

fn report(outcome: MutationOutcome) {
    match outcome {
        MutationOutcome::Committed => {}
        MutationOutcome::Superseded => output::message("A newer change took precedence"),
        MutationOutcome::Unchanged => output::message("Nothing to change"),
    }
}

fn print_cart(store: &Storefront) {
    output::cart(&store.cart(), store.cart_item_count(), store.cart_total());
}
