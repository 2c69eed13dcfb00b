//! Backend REST API seams.
//!
//! # Architecture
//!
//! - The backend is the source of truth for carts and products; nothing is
//!   synced locally beyond the access token
//! - Each concern is a trait so the session store, catalog cache and cart
//!   reconciler can be driven by scripted fakes in tests
//! - [`HttpBackend`] implements every trait over `reqwest`
//!
//! # Endpoints
//!
//! | Trait | Endpoints |
//! |---|---|
//! | [`AuthBackend`] | `POST /users/login`, `POST /users/register`, `GET /users/refreshtoken`, `GET /users/info` |
//! | [`CatalogBackend`] | `GET /api/products`, `GET /api/category` |
//! | [`CartBackend`] | `GET /api/getCart`, `POST /api/updateCart`, `DELETE /api/deleteCartItem/{id}` |
//! | [`AdminBackend`] | `POST /api/upload`, `POST /api/products`, `DELETE /api/products/{id}` |

mod http;
pub mod wire;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use shopline_core::{CartLine, Category, Identity, Product, ProductId};
use thiserror::Error;

pub use http::HttpBackend;
pub use wire::{ImageUpload, NewProduct};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `msg` from the error body, or a truncated raw body.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint path could not be joined onto the base URL.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the backend rejected the credentials (401/403).
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Access token sent in the `Authorization` header.
///
/// Wraps a [`SecretString`] so the token never shows up in `Debug` output or
/// logs.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Raw header value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

/// Login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub email: shopline_core::Email,
    pub password: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Account registration input.
#[derive(Clone)]
pub struct Registration {
    pub name: String,
    pub credentials: Credentials,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Authentication and identity endpoints.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for an access token.
    async fn login(&self, credentials: &Credentials) -> Result<AccessToken, ApiError>;

    /// Create an account and return its first access token.
    async fn register(&self, registration: &Registration) -> Result<AccessToken, ApiError>;

    /// Exchange the refresh cookie for a fresh access token.
    ///
    /// `current` is the persisted token, forwarded as the `Authorization`
    /// header when present.
    async fn refresh_token(
        &self,
        current: Option<&AccessToken>,
    ) -> Result<AccessToken, ApiError>;

    /// Resolve the identity behind a token.
    async fn identity(&self, token: &AccessToken) -> Result<Identity, ApiError>;
}

/// Read-only catalog endpoints.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn products(&self) -> Result<Vec<Product>, ApiError>;

    async fn categories(&self) -> Result<Vec<Category>, ApiError>;
}

/// Cart endpoints. Every mutation answers with the full canonical cart.
#[async_trait]
pub trait CartBackend: Send + Sync {
    async fn fetch_cart(&self, token: &AccessToken) -> Result<Vec<CartLine>, ApiError>;

    /// Replace the whole cart.
    async fn replace_cart(
        &self,
        token: &AccessToken,
        lines: &[CartLine],
    ) -> Result<Vec<CartLine>, ApiError>;

    /// Remove one line.
    async fn delete_line(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<CartLine>, ApiError>;
}

/// Catalog management endpoints.
#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// Upload an image and return its public URL.
    async fn upload_image(
        &self,
        token: &AccessToken,
        image: ImageUpload,
    ) -> Result<String, ApiError>;

    async fn create_product(
        &self,
        token: &AccessToken,
        product: &NewProduct,
    ) -> Result<(), ApiError>;

    /// Delete a product. The backend does not check the token here, but it
    /// is sent anyway.
    async fn delete_product(
        &self,
        token: Option<&AccessToken>,
        product_id: &ProductId,
    ) -> Result<(), ApiError>;
}

/// Everything the [`Storefront`](crate::state::Storefront) needs.
pub trait Backend: AuthBackend + CatalogBackend + CartBackend + AdminBackend {}

impl<T> Backend for T where T: AuthBackend + CatalogBackend + CartBackend + AdminBackend {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Status {
            status: 500,
            message: "cart unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 500: cart unavailable");
    }

    #[test]
    fn test_is_unauthorized() {
        let unauthorized = ApiError::Status {
            status: 401,
            message: String::new(),
        };
        let server_error = ApiError::Status {
            status: 502,
            message: String::new(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!server_error.is_unauthorized());
    }

    #[test]
    fn test_access_token_debug_redacts() {
        let token = AccessToken::new("eyJ.secret.value");
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(token.expose(), "eyJ.secret.value");
    }
}
