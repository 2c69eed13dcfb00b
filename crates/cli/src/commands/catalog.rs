//! Browsing commands.

use shopline_core::ProductId;
use shopline_storefront::Storefront;

use crate::error::CliError;
use crate::output;

pub async fn products(
    store: &Storefront,
    category: Option<&str>,
    search: Option<&str>,
) -> Result<(), CliError> {
    store.load_catalog().await?;
    output::products(&store.products(category, search));
    Ok(())
}

pub async fn product(store: &Storefront, id: &str) -> Result<(), CliError> {
    store.load_catalog().await?;
    let product = store
        .product(&ProductId::new(id))
        .ok_or_else(|| CliError::Usage(format!("No product with id {id}")))?;
    output::product(&product);
    Ok(())
}

pub async fn categories(store: &Storefront) -> Result<(), CliError> {
    output::categories(&store.categories().await?);
    Ok(())
}
