//! Store object shared by every caller.
//!
//! [`Storefront`] wires the session store, catalog cache, cart reconciler
//! and admin operations over one backend. It is cheap to clone and safe to
//! share between tasks; there is no global state.

use std::sync::Arc;

use rust_decimal::Decimal;
use shopline_core::{Category, EnrichedCartLine, Identity, Product, ProductId, Quantity};
use tracing::{debug, info, instrument, warn};

use crate::admin::{ProductAdmin, ProductDraft};
use crate::api::{
    AccessToken, AdminBackend, ApiError, AuthBackend, Backend, CartBackend, CatalogBackend,
    HttpBackend, ImageUpload,
};
use crate::cart::{CartReconciler, MutationOutcome};
use crate::catalog::{CatalogCache, CatalogSnapshot};
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError, add_breadcrumb};
use crate::session::{BootOutcome, Session, SessionStore, parse_credentials, parse_registration};
use crate::token::{FileTokenStore, TokenStore};

/// Store object for one user session.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    session: SessionStore,
    catalog: CatalogCache,
    cart: CartReconciler,
    admin: ProductAdmin,
}

impl Storefront {
    /// Wire a store object over any backend implementation.
    #[must_use]
    pub fn new<B: Backend + 'static>(
        backend: Arc<B>,
        tokens: Arc<dyn TokenStore>,
        config: &StorefrontConfig,
    ) -> Self {
        let auth: Arc<dyn AuthBackend> = backend.clone();
        let catalog: Arc<dyn CatalogBackend> = backend.clone();
        let cart: Arc<dyn CartBackend> = backend.clone();
        let admin: Arc<dyn AdminBackend> = backend;

        Self {
            inner: Arc::new(StorefrontInner {
                session: SessionStore::new(auth, tokens),
                catalog: CatalogCache::new(catalog, config.category_cache_ttl),
                cart: CartReconciler::new(cart),
                admin: ProductAdmin::new(admin),
            }),
        }
    }

    /// Store object over HTTP with the token persisted at
    /// `config.token_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn connect(config: &StorefrontConfig) -> std::result::Result<Self, ApiError> {
        let backend = Arc::new(HttpBackend::new(config)?);
        let tokens = Arc::new(FileTokenStore::new(&config.token_path));
        Ok(Self::new(backend, tokens, config))
    }

    // =========================================================================
    // Boot
    // =========================================================================

    /// Load the catalog and silently restore a persisted session.
    ///
    /// Both run concurrently. The cart is loaded once the identity resolves;
    /// a catalog or cart failure here is logged and never returned.
    #[instrument(skip(self))]
    pub async fn boot(&self) -> BootOutcome {
        let (catalog, outcome) = tokio::join!(self.load_catalog(), self.inner.session.restore());

        if let Err(e) = catalog {
            warn!(error = %e, "Starting with an empty catalog");
        }
        match outcome {
            BootOutcome::Restored(_) => self.load_cart_in_background().await,
            BootOutcome::RefreshRejected => self.inner.cart.clear(),
            BootOutcome::Anonymous | BootOutcome::IdentityUnavailable => {}
        }
        outcome
    }

    /// Fetch the product list and re-reconcile the cart against it.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::CatalogUnavailable`]; the cart then shows
    /// no lines until a later load succeeds.
    #[instrument(skip(self))]
    pub async fn load_catalog(&self) -> Result<CatalogSnapshot> {
        let result = self.inner.catalog.load_all().await;
        self.inner.cart.set_catalog(self.inner.catalog.snapshot());
        observe(result)
    }

    async fn load_cart_in_background(&self) {
        let Some(token) = self.inner.session.authenticated_token() else {
            return;
        };
        if let Err(e) = self.inner.cart.load(&token).await {
            warn!(error = %e, "Cart load failed, showing an empty cart");
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Log in, then load the cart.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::InvalidInput`] before any request for bad
    /// input, or the session store's error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let credentials = parse_credentials(email, password)?;
        add_breadcrumb("auth", "Login", None);

        self.inner.cart.clear();
        let identity = observe(self.inner.session.login(&credentials).await)?;
        self.load_cart_in_background().await;
        Ok(identity)
    }

    /// Create an account, then behave as after [`Self::login`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::login`].
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Identity> {
        let registration = parse_registration(name, email, password)?;
        add_breadcrumb("auth", "Register", None);

        self.inner.cart.clear();
        let identity = observe(self.inner.session.register(&registration).await)?;
        self.load_cart_in_background().await;
        Ok(identity)
    }

    /// Clear the session, the persisted token and the cart.
    ///
    /// Mutations still in flight are discarded when they answer.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        add_breadcrumb("auth", "Logout", None);
        self.inner.cart.clear();
        self.inner.session.logout().await;
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.session.session()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.session.is_admin()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.session.identity()
    }

    fn require_session(&self) -> Result<AccessToken> {
        self.inner
            .session
            .authenticated_token()
            .ok_or(StorefrontError::NotAuthenticated)
    }

    fn require_admin(&self) -> Result<AccessToken> {
        let token = self.require_session()?;
        if !self.inner.session.is_admin() {
            return Err(StorefrontError::Forbidden(
                "admin role required".to_string(),
            ));
        }
        Ok(token)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Products matching an optional category and search term.
    #[must_use]
    pub fn products(&self, category: Option<&str>, search: Option<&str>) -> Vec<Product> {
        self.inner.catalog.filter(category, search)
    }

    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<Product> {
        self.inner.catalog.find(id)
    }

    /// Category list (cached).
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Backend`] if the fetch fails.
    pub async fn categories(&self) -> Result<Arc<[Category]>> {
        observe(self.inner.catalog.categories().await)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Re-fetch the server cart.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotAuthenticated`] or
    /// [`StorefrontError::Backend`].
    pub async fn reload_cart(&self) -> Result<()> {
        let token = self.require_session()?;
        observe(self.inner.cart.load(&token).await)
    }

    /// Put `quantity` of a product in the cart, replacing any existing
    /// quantity.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotAuthenticated`] without touching the
    /// cart, [`StorefrontError::InvalidInput`] for a product not in the
    /// catalog, or [`StorefrontError::Backend`] after rolling back.
    #[instrument(skip(self), fields(product_id = %product_id, quantity = %quantity))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<MutationOutcome> {
        let token = self.require_session()?;
        if self.inner.catalog.find(product_id).is_none() {
            return Err(StorefrontError::InvalidInput(format!(
                "Unknown product {product_id}"
            )));
        }
        add_breadcrumb("cart", "Add to cart", Some(&[("product_id", product_id.as_str())]));

        observe(
            self.inner
                .cart
                .add_or_set_quantity(&token, product_id, quantity)
                .await,
        )
    }

    /// Change a line's quantity by `delta` (floor of one).
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotAuthenticated`] without touching the
    /// cart, or [`StorefrontError::Backend`] after rolling back.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        delta: i64,
    ) -> Result<MutationOutcome> {
        let token = self.require_session()?;
        add_breadcrumb("cart", "Quantity changed", Some(&[("product_id", product_id.as_str())]));

        observe(
            self.inner
                .cart
                .update_quantity(&token, product_id, delta)
                .await,
        )
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotAuthenticated`] without touching the
    /// cart, or [`StorefrontError::Backend`] after restoring the line.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<MutationOutcome> {
        let token = self.require_session()?;
        add_breadcrumb("cart", "Line removed", Some(&[("product_id", product_id.as_str())]));

        observe(self.inner.cart.delete_line(&token, product_id).await)
    }

    /// Displayed cart lines.
    #[must_use]
    pub fn cart(&self) -> Vec<EnrichedCartLine> {
        self.inner.cart.lines()
    }

    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.inner.cart.total()
    }

    #[must_use]
    pub fn cart_item_count(&self) -> u64 {
        self.inner.cart.item_count()
    }

    /// The reconciler, for callers that need the raw server cart or pending
    /// state.
    #[must_use]
    pub fn cart_reconciler(&self) -> &CartReconciler {
        &self.inner.cart
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Upload a product image.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotAuthenticated`],
    /// [`StorefrontError::Forbidden`], or the upload error.
    pub async fn upload_image(&self, image: ImageUpload) -> Result<String> {
        let token = self.require_admin()?;
        observe(self.inner.admin.upload_image(&token, image).await)
    }

    /// Create a product, then reload the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotAuthenticated`],
    /// [`StorefrontError::Forbidden`], or the create error.
    pub async fn create_product(
        &self,
        draft: &ProductDraft,
        image: Option<ImageUpload>,
    ) -> Result<()> {
        let token = self.require_admin()?;
        add_breadcrumb("admin", "Create product", None);

        observe(self.inner.admin.create_product(&token, draft, image).await)?;
        self.refresh_catalog_after_edit().await;
        Ok(())
    }

    /// Delete a product, then reload the catalog so carts stop showing it.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotAuthenticated`],
    /// [`StorefrontError::Forbidden`], or the delete error.
    pub async fn delete_product(&self, product_id: &ProductId) -> Result<()> {
        let token = self.require_admin()?;
        add_breadcrumb("admin", "Delete product", Some(&[("product_id", product_id.as_str())]));

        observe(
            self.inner
                .admin
                .delete_product(Some(&token), product_id)
                .await,
        )?;
        self.refresh_catalog_after_edit().await;
        Ok(())
    }

    async fn refresh_catalog_after_edit(&self) {
        match self.load_catalog().await {
            Ok(snapshot) => debug!(products = snapshot.len(), "Catalog reloaded after edit"),
            Err(e) => warn!(error = %e, "Catalog reload after edit failed"),
        }
        self.inner.catalog.invalidate_categories().await;
        info!("Catalog refreshed");
    }
}

/// Report an operation failure before handing it back.
fn observe<T>(result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        e.report();
    }
    result
}
