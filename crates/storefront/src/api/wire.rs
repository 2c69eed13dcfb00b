//! JSON bodies exchanged with the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopline_core::{CartLine, Product, ProductImage};

/// `GET /api/products` response.
#[derive(Debug, Deserialize)]
pub struct ProductsEnvelope {
    pub products: Vec<Product>,
}

/// Cart carried in requests and responses of the cart endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct CartEnvelope {
    pub cart: Vec<CartLine>,
}

/// `POST /api/updateCart` request body (borrowed).
#[derive(Debug, Serialize)]
pub struct CartUpdate<'a> {
    pub cart: &'a [CartLine],
}

/// `POST /users/login`, `POST /users/register`, `GET /users/refreshtoken` response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// `POST /users/login` request body.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /users/register` request body.
#[derive(Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /api/upload` response.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Error or acknowledgement body. The backend uses `msg`; a few routes use
/// `message`.
#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageBody {
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        self.msg.or(self.message)
    }
}

/// `POST /api/products` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    #[serde(rename = "product_id")]
    pub product_code: String,
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ProductImage>,
}

/// Image file for `POST /api/upload` (multipart field `file`).
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
