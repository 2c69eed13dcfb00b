//! Catalog management commands.

use std::path::Path;

use shopline_core::ProductId;
use shopline_storefront::{ImageUpload, ProductDraft, Storefront};

use super::start;
use crate::error::CliError;
use crate::output;

pub async fn create_product(
    store: &Storefront,
    draft: &ProductDraft,
    image: Option<&Path>,
) -> Result<(), CliError> {
    let image = match image {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };

    start(store).await;
    store.create_product(draft, image).await?;
    output::message(&format!("Created {}", draft.title.trim()));
    Ok(())
}

pub async fn upload(store: &Storefront, path: &Path) -> Result<(), CliError> {
    let image = read_image(path).await?;

    start(store).await;
    let url = store.upload_image(image).await?;
    output::message(&url);
    Ok(())
}

pub async fn delete_product(store: &Storefront, id: &str) -> Result<(), CliError> {
    start(store).await;
    store.delete_product(&ProductId::new(id)).await?;
    output::message(&format!("Deleted {id}"));
    Ok(())
}

async fn read_image(path: &Path) -> Result<ImageUpload, CliError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| CliError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::Usage(format!("{} is not a file", path.display())))?;

    Ok(ImageUpload { file_name, bytes })
}
