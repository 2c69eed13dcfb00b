//! Catalog types as served by `GET /api/products` and `GET /api/category`.

use serde::{Deserialize, Serialize};

use super::{CategoryId, Price, ProductId};

/// Hosted product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    /// Public URL of the uploaded image.
    pub url: String,
}

/// A catalog product.
///
/// Read-only from the client's point of view; only admin operations create
/// or delete products, and they do so through the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend document key.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Admin-assigned product code.
    #[serde(rename = "product_id", default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Long-form body shown on the detail page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ProductImage>,
    #[serde(default)]
    pub category: String,
}

impl Product {
    /// URL of the product image, if one was uploaded.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image.as_ref().map(|img| img.url.as_str())
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_product_from_backend_json() {
        let json = r#"{
            "_id": "65f1a",
            "product_id": "SKU-1",
            "title": "Lamp",
            "description": "Desk lamp",
            "content": "Warm light",
            "price": 1200,
            "category": "home",
            "image": { "public_id": "x", "url": "https://cdn.test/lamp.png" },
            "checked": false,
            "sold": 3
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new("65f1a"));
        assert_eq!(product.product_code.as_deref(), Some("SKU-1"));
        assert_eq!(product.price.amount(), Decimal::new(1200, 0));
        assert_eq!(product.image_url(), Some("https://cdn.test/lamp.png"));
    }

    #[test]
    fn test_product_optional_fields_default() {
        let json = r#"{ "_id": "p2", "title": "Mug", "price": 5 }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.description.is_empty());
        assert!(product.category.is_empty());
        assert_eq!(product.image_url(), None);
    }
}
