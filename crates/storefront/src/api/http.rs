//! `reqwest` implementation of the backend traits.
//!
//! One shared `reqwest::Client` with a cookie jar: the backend sets the
//! refresh token as an http-only cookie on login, and the jar replays it on
//! `GET /users/refreshtoken`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::cookie::Jar;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use shopline_core::{CartLine, Category, Identity, Product, ProductId};
use tracing::{debug, instrument};
use url::Url;

use super::wire::{
    CartEnvelope, CartUpdate, LoginRequest, MessageBody, ProductsEnvelope, RegisterRequest,
    TokenResponse, UploadResponse,
};
use super::{
    AccessToken, AdminBackend, ApiError, AuthBackend, CartBackend, CatalogBackend, Credentials,
    ImageUpload, NewProduct, Registration,
};
use crate::config::StorefrontConfig;

const ERROR_BODY_PREVIEW: usize = 200;
const LOG_BODY_PREVIEW: usize = 500;

// =============================================================================
// HttpBackend
// =============================================================================

/// HTTP client for the storefront backend.
///
/// Cheap to clone; clones share the connection pool and cookie jar.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::new(Jar::default()))
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base_url: config.api_url.clone(),
            }),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<MessageBody>(&body)
                .ok()
                .and_then(MessageBody::into_text)
                .unwrap_or_else(|| preview(&body, ERROR_BODY_PREVIEW));
            tracing::warn!(
                status = %status,
                message = %message,
                "Backend returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Send a request and decode a JSON response.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %preview(&body, LOG_BODY_PREVIEW),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.inner.client.get(self.endpoint(path)?))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.inner.client.post(self.endpoint(path)?))
    }

    fn delete(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.inner.client.delete(self.endpoint(path)?))
    }
}

fn authorized(request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
    request.header(AUTHORIZATION, token.expose())
}

fn preview(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

// =============================================================================
// Auth
// =============================================================================

#[async_trait]
impl AuthBackend for HttpBackend {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<AccessToken, ApiError> {
        let body = LoginRequest {
            email: credentials.email.as_str(),
            password: credentials.password.expose_secret(),
        };
        let response: TokenResponse = self.execute(self.post("users/login")?.json(&body)).await?;
        Ok(AccessToken::new(response.access_token))
    }

    #[instrument(skip(self, registration), fields(email = %registration.credentials.email))]
    async fn register(&self, registration: &Registration) -> Result<AccessToken, ApiError> {
        let body = RegisterRequest {
            name: &registration.name,
            email: registration.credentials.email.as_str(),
            password: registration.credentials.password.expose_secret(),
        };
        let response: TokenResponse = self
            .execute(self.post("users/register")?.json(&body))
            .await?;
        Ok(AccessToken::new(response.access_token))
    }

    #[instrument(skip(self, current))]
    async fn refresh_token(
        &self,
        current: Option<&AccessToken>,
    ) -> Result<AccessToken, ApiError> {
        let mut request = self.get("users/refreshtoken")?;
        if let Some(token) = current {
            request = authorized(request, token);
        }
        let response: TokenResponse = self.execute(request).await?;
        debug!("Access token refreshed");
        Ok(AccessToken::new(response.access_token))
    }

    #[instrument(skip(self, token))]
    async fn identity(&self, token: &AccessToken) -> Result<Identity, ApiError> {
        self.execute(authorized(self.get("users/info")?, token))
            .await
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl CatalogBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let envelope: ProductsEnvelope = self.execute(self.get("api/products")?).await?;
        debug!(count = envelope.products.len(), "Fetched products");
        Ok(envelope.products)
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.execute(self.get("api/category")?).await
    }
}

// =============================================================================
// Cart
// =============================================================================

#[async_trait]
impl CartBackend for HttpBackend {
    #[instrument(skip(self, token))]
    async fn fetch_cart(&self, token: &AccessToken) -> Result<Vec<CartLine>, ApiError> {
        let envelope: CartEnvelope = self
            .execute(authorized(self.get("api/getCart")?, token))
            .await?;
        Ok(envelope.cart)
    }

    #[instrument(skip(self, token, lines), fields(lines = lines.len()))]
    async fn replace_cart(
        &self,
        token: &AccessToken,
        lines: &[CartLine],
    ) -> Result<Vec<CartLine>, ApiError> {
        let request = authorized(self.post("api/updateCart")?, token).json(&CartUpdate { cart: lines });
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.cart)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn delete_line(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<CartLine>, ApiError> {
        let path = format!("api/deleteCartItem/{product_id}");
        let envelope: CartEnvelope = self
            .execute(authorized(self.delete(&path)?, token))
            .await?;
        Ok(envelope.cart)
    }
}

// =============================================================================
// Admin
// =============================================================================

#[async_trait]
impl AdminBackend for HttpBackend {
    #[instrument(skip(self, token, image), fields(file_name = %image.file_name, bytes = image.bytes.len()))]
    async fn upload_image(
        &self,
        token: &AccessToken,
        image: ImageUpload,
    ) -> Result<String, ApiError> {
        let part = Part::bytes(image.bytes).file_name(image.file_name);
        let form = Form::new().part("file", part);
        let response: UploadResponse = self
            .execute(authorized(self.post("api/upload")?, token).multipart(form))
            .await?;
        Ok(response.url)
    }

    #[instrument(skip(self, token, product), fields(title = %product.title))]
    async fn create_product(
        &self,
        token: &AccessToken,
        product: &NewProduct,
    ) -> Result<(), ApiError> {
        let body = self
            .send(authorized(self.post("api/products")?, token).json(product))
            .await?;
        let ack = serde_json::from_str::<MessageBody>(&body).unwrap_or_default();
        debug!(message = ?ack.into_text(), "Product created");
        Ok(())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn delete_product(
        &self,
        token: Option<&AccessToken>,
        product_id: &ProductId,
    ) -> Result<(), ApiError> {
        let mut request = self.delete(&format!("api/products/{product_id}"))?;
        if let Some(token) = token {
            request = authorized(request, token);
        }
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn backend(url: &str) -> HttpBackend {
        let config = StorefrontConfig::for_api_url(url, PathBuf::from("/tmp/unused")).unwrap();
        HttpBackend::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let backend = backend("https://shop.example.com/store");
        assert_eq!(
            backend.endpoint("api/getCart").unwrap().as_str(),
            "https://shop.example.com/store/api/getCart"
        );
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        assert_eq!(preview("héllo world", 5), "héllo");
        assert_eq!(preview("ok", 10), "ok");
    }
}
