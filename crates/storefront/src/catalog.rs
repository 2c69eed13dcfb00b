//! Catalog cache.
//!
//! The product list is fetched once and exposed as an immutable snapshot for
//! the lifetime of the session. There is no background refresh: a manual
//! reload is another [`CatalogCache::load_all`] call, which swaps in a new
//! snapshot. Categories are cached with a TTL via `moka`.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use moka::future::Cache;
use shopline_core::{Category, Product, ProductId};
use tracing::{debug, instrument, warn};

use crate::api::CatalogBackend;
use crate::error::{Result, StorefrontError};

/// Category filter value meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Immutable product list shared between the cache, the cart reconciler and
/// callers.
pub type CatalogSnapshot = Arc<[Product]>;

/// Cache key for catalog lookups other than the product snapshot.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
}

/// Product list snapshot plus cached categories.
pub struct CatalogCache {
    backend: Arc<dyn CatalogBackend>,
    snapshot: RwLock<CatalogSnapshot>,
    cache: Cache<CacheKey, Arc<[Category]>>,
}

impl CatalogCache {
    /// Create an empty cache. Nothing is fetched until [`Self::load_all`].
    #[must_use]
    pub fn new(backend: Arc<dyn CatalogBackend>, category_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(8)
            .time_to_live(category_ttl)
            .build();

        Self {
            backend,
            snapshot: RwLock::new(Arc::from(Vec::new())),
            cache,
        }
    }

    /// Fetch the full product list and replace the snapshot.
    ///
    /// On failure the snapshot is reset to empty, so cart enrichment shows
    /// nothing until a later load succeeds. No retry.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::CatalogUnavailable`] if the fetch fails.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<CatalogSnapshot> {
        match self.backend.products().await {
            Ok(products) => {
                debug!(count = products.len(), "Catalog loaded");
                let snapshot: CatalogSnapshot = Arc::from(products);
                self.replace(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Catalog unavailable");
                self.replace(Arc::from(Vec::new()));
                Err(StorefrontError::CatalogUnavailable(e))
            }
        }
    }

    /// Current snapshot (empty before the first successful load).
    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Look up a product by key.
    #[must_use]
    pub fn find(&self, id: &ProductId) -> Option<Product> {
        self.snapshot().iter().find(|p| &p.id == id).cloned()
    }

    /// Filter the snapshot by category and free-text search.
    #[must_use]
    pub fn filter(&self, category: Option<&str>, search: Option<&str>) -> Vec<Product> {
        filter_products(&self.snapshot(), category, search)
    }

    /// Category list, cached for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Backend`] if the fetch fails. Failures are
    /// not cached.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<[Category]>> {
        if let Some(categories) = self.cache.get(&CacheKey::Categories).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Arc<[Category]> = Arc::from(self.backend.categories().await?);
        self.cache
            .insert(CacheKey::Categories, Arc::clone(&categories))
            .await;
        Ok(categories)
    }

    /// Drop cached categories.
    pub async fn invalidate_categories(&self) {
        self.cache.invalidate(&CacheKey::Categories).await;
    }

    fn replace(&self, snapshot: CatalogSnapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

/// Category and search filtering over a product list.
///
/// - `category`: `None` or `"all"` disables the filter; otherwise a
///   case-insensitive exact match on the product category
/// - `search`: trimmed, case-insensitive substring of title, description or
///   category; blank disables the filter
#[must_use]
pub fn filter_products(
    products: &[Product],
    category: Option<&str>,
    search: Option<&str>,
) -> Vec<Product> {
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(ALL_CATEGORIES))
        .map(str::to_lowercase);
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    products
        .iter()
        .filter(|p| {
            category
                .as_deref()
                .is_none_or(|c| p.category.to_lowercase() == c)
        })
        .filter(|p| {
            needle.as_deref().is_none_or(|n| {
                p.title.to_lowercase().contains(n)
                    || p.description.to_lowercase().contains(n)
                    || p.category.to_lowercase().contains(n)
            })
        })
        .cloned()
        .collect()
}
