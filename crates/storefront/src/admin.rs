//! Catalog management for admin sessions.
//!
//! Role checks live in [`crate::state::Storefront`]; this module validates
//! product input and drives the upload-then-create sequence.

use std::sync::Arc;

use rust_decimal::Decimal;
use shopline_core::{Price, ProductId, ProductImage};
use tracing::{info, instrument};

use crate::api::{AccessToken, AdminBackend, ImageUpload, NewProduct};
use crate::error::{Result, StorefrontError};

/// Admin input for a new product, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    /// Admin-assigned product code (`product_id` on the wire).
    pub product_code: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub price: Decimal,
    pub category: String,
}

impl ProductDraft {
    /// Check required fields and build the request body.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidInput`] naming the first missing or
    /// invalid field.
    pub fn validate(&self, image_url: Option<String>) -> Result<NewProduct> {
        let required = [
            ("Product code", &self.product_code),
            ("Title", &self.title),
            ("Description", &self.description),
            ("Category", &self.category),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(StorefrontError::InvalidInput(format!("{label} is required")));
            }
        }

        let price = Price::new(self.price)
            .map_err(|e| StorefrontError::InvalidInput(format!("Invalid price: {e}")))?;

        Ok(NewProduct {
            product_code: self.product_code.trim().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            content: self.content.trim().to_string(),
            price: price.amount(),
            category: self.category.trim().to_string(),
            image: image_url.map(|url| ProductImage { url }),
        })
    }
}

/// Product create/upload/delete against the backend.
pub struct ProductAdmin {
    backend: Arc<dyn AdminBackend>,
}

impl ProductAdmin {
    #[must_use]
    pub fn new(backend: Arc<dyn AdminBackend>) -> Self {
        Self { backend }
    }

    /// Upload an image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidInput`] for an empty file and
    /// [`StorefrontError::Backend`] if the upload fails.
    #[instrument(skip(self, token, image), fields(file_name = %image.file_name))]
    pub async fn upload_image(&self, token: &AccessToken, image: ImageUpload) -> Result<String> {
        if image.bytes.is_empty() {
            return Err(StorefrontError::InvalidInput(
                "Image file is empty".to_string(),
            ));
        }
        let url = self.backend.upload_image(token, image).await?;
        info!(url = %url, "Image uploaded");
        Ok(url)
    }

    /// Validate the draft, upload the image if one is given, then create the
    /// product with the uploaded URL.
    ///
    /// Nothing is uploaded when the draft is invalid. If the upload fails the
    /// product is not created.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidInput`] or
    /// [`StorefrontError::Backend`].
    #[instrument(skip(self, token, draft, image), fields(title = %draft.title))]
    pub async fn create_product(
        &self,
        token: &AccessToken,
        draft: &ProductDraft,
        image: Option<ImageUpload>,
    ) -> Result<()> {
        draft.validate(None)?;

        let image_url = match image {
            Some(image) => Some(self.upload_image(token, image).await?),
            None => None,
        };

        let product = draft.validate(image_url)?;
        self.backend.create_product(token, &product).await?;
        info!(product_code = %product.product_code, "Product created");
        Ok(())
    }

    /// Delete a product from the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Backend`] if the backend rejects the delete.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn delete_product(
        &self,
        token: Option<&AccessToken>,
        product_id: &ProductId,
    ) -> Result<()> {
        self.backend.delete_product(token, product_id).await?;
        info!("Product deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::api::ApiError;

    #[derive(Default)]
    struct RecordingAdmin {
        fail_upload: bool,
        calls: Mutex<Vec<String>>,
        created: Mutex<Vec<NewProduct>>,
    }

    #[async_trait]
    impl AdminBackend for RecordingAdmin {
        async fn upload_image(
            &self,
            _token: &AccessToken,
            image: ImageUpload,
        ) -> std::result::Result<String, ApiError> {
            self.calls.lock().unwrap().push(format!("upload {}", image.file_name));
            if self.fail_upload {
                return Err(ApiError::Status {
                    status: 400,
                    message: "File too large".to_string(),
                });
            }
            Ok(format!("https://cdn.example.com/{}", image.file_name))
        }

        async fn create_product(
            &self,
            _token: &AccessToken,
            product: &NewProduct,
        ) -> std::result::Result<(), ApiError> {
            self.calls.lock().unwrap().push("create".to_string());
            self.created.lock().unwrap().push(product.clone());
            Ok(())
        }

        async fn delete_product(
            &self,
            _token: Option<&AccessToken>,
            product_id: &ProductId,
        ) -> std::result::Result<(), ApiError> {
            self.calls.lock().unwrap().push(format!("delete {product_id}"));
            Ok(())
        }
    }

    fn draft() -> ProductDraft {
        ProductDraft {
            product_code: "SKU-1".to_string(),
            title: " Kettle ".to_string(),
            description: "Steel kettle".to_string(),
            content: String::new(),
            price: Decimal::new(2550, 2),
            category: "kitchen".to_string(),
        }
    }

    fn png() -> ImageUpload {
        ImageUpload {
            file_name: "kettle.png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_validate_rejects_missing_fields_and_negative_price() {
        let missing_title = ProductDraft {
            title: "  ".to_string(),
            ..draft()
        };
        let err = missing_title.validate(None).unwrap_err();
        assert_eq!(err.user_message(), "Title is required");

        let negative = ProductDraft {
            price: Decimal::new(-1, 0),
            ..draft()
        };
        assert!(matches!(
            negative.validate(None),
            Err(StorefrontError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_trims_and_attaches_image() {
        let product = draft()
            .validate(Some("https://cdn.example.com/k.png".to_string()))
            .unwrap();
        assert_eq!(product.title, "Kettle");
        assert_eq!(product.image.unwrap().url, "https://cdn.example.com/k.png");
    }

    #[tokio::test]
    async fn test_create_uploads_then_creates() {
        let backend = Arc::new(RecordingAdmin::default());
        let admin = ProductAdmin::new(backend.clone());

        admin
            .create_product(&AccessToken::new("admin"), &draft(), Some(png()))
            .await
            .unwrap();

        assert_eq!(
            *backend.calls.lock().unwrap(),
            vec!["upload kettle.png".to_string(), "create".to_string()]
        );
        let created = backend.created.lock().unwrap();
        assert_eq!(
            created[0].image.as_ref().unwrap().url,
            "https://cdn.example.com/kettle.png"
        );
    }

    #[tokio::test]
    async fn test_failed_upload_skips_create() {
        let backend = Arc::new(RecordingAdmin {
            fail_upload: true,
            ..Default::default()
        });
        let admin = ProductAdmin::new(backend.clone());

        let err = admin
            .create_product(&AccessToken::new("admin"), &draft(), Some(png()))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Request failed: File too large");
        assert!(backend.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_draft_uploads_nothing() {
        let backend = Arc::new(RecordingAdmin::default());
        let admin = ProductAdmin::new(backend.clone());
        let bad = ProductDraft {
            category: String::new(),
            ..draft()
        };

        let err = admin
            .create_product(&AccessToken::new("admin"), &bad, Some(png()))
            .await
            .unwrap_err();

        assert!(matches!(err, StorefrontError::InvalidInput(_)));
        assert!(backend.calls.lock().unwrap().is_empty());
    }
}
