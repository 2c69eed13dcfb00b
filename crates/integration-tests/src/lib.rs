//! End-to-end test support for Shopline.
//!
//! [`FakeShop`] is an in-process `axum` server implementing the backend REST
//! contract the storefront client talks to: users with access tokens and a
//! refresh cookie, products, categories, per-user carts and image uploads.
//! Tests spawn one per case on an ephemeral port and point a real
//! [`Storefront`] at it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopline-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod routes;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use shopline_core::{CartLine, Category, CategoryId, Price, Product, ProductId, Role};
use shopline_storefront::{MemoryTokenStore, Storefront, StorefrontConfig};
use tokio::task::JoinHandle;

/// A registered account.
#[derive(Debug, Clone)]
pub struct Account {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub cart: Vec<CartLine>,
}

/// Everything the fake backend knows.
#[derive(Debug, Default)]
pub struct ShopData {
    pub accounts: Vec<Account>,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    /// Access token -> account email.
    pub access_tokens: HashMap<String, String>,
    /// Refresh cookie value -> account email.
    pub refresh_tokens: HashMap<String, String>,
    /// File names received by `POST /api/upload`.
    pub uploads: Vec<String>,
    /// Number of upcoming cart writes to reject with a 500.
    pub failing_cart_writes: usize,
    pub catalog_down: bool,
    next_id: u64,
}

impl ShopData {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn account_mut(&mut self, email: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.email == email)
    }

    /// Issue a fresh access token and refresh cookie for `email`.
    fn issue_tokens(&mut self, email: &str) -> (String, String) {
        let access = self.next_id("access");
        let refresh = self.next_id("refresh");
        self.access_tokens.insert(access.clone(), email.to_string());
        self.refresh_tokens.insert(refresh.clone(), email.to_string());
        (access, refresh)
    }
}

pub(crate) type SharedShop = Arc<Mutex<ShopData>>;

pub(crate) fn lock(shop: &SharedShop) -> MutexGuard<'_, ShopData> {
    shop.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Running fake backend. The server stops when this is dropped.
pub struct FakeShop {
    addr: SocketAddr,
    data: SharedShop,
    server: JoinHandle<()>,
}

impl FakeShop {
    /// Start an empty shop on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let data: SharedShop = Arc::new(Mutex::new(ShopData::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake backend address");

        let app = routes::router(Arc::clone(&data));
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake backend stopped");
            }
        });

        Self { addr, data, server }
    }

    /// Start a shop seeded with a customer, an admin, two products and two
    /// categories.
    pub async fn seeded() -> Self {
        let shop = Self::start().await;
        shop.add_account("Ada", "ada@example.com", "secret", Role::CUSTOMER);
        shop.add_account("Grace", "grace@example.com", "admin-pw", Role::ADMIN);
        shop.add_product("p1", "Desk Lamp", 100, "home");
        shop.add_product("p2", "Coffee Mug", 50, "kitchen");
        shop.add_category("home");
        shop.add_category("kitchen");
        shop
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this shop.
    ///
    /// # Panics
    ///
    /// Panics if the URL is rejected, which cannot happen for a bound
    /// loopback address.
    #[must_use]
    pub fn config(&self, token_path: PathBuf) -> StorefrontConfig {
        StorefrontConfig::for_api_url(&self.url(), token_path).expect("Fake backend URL is valid")
    }

    /// A store object over HTTP with an in-memory token store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn storefront(&self) -> (Storefront, Arc<MemoryTokenStore>) {
        let tokens = Arc::new(MemoryTokenStore::default());
        let config = self.config(PathBuf::from("unused"));
        let backend = shopline_storefront::HttpBackend::new(&config)
            .expect("Failed to build HTTP backend");
        let store = Storefront::new(Arc::new(backend), tokens.clone(), &config);
        (store, tokens)
    }

    /// Direct access to the backend state.
    pub fn data(&self) -> MutexGuard<'_, ShopData> {
        lock(&self.data)
    }

    pub fn add_account(&self, name: &str, email: &str, password: &str, role: Role) {
        self.data().accounts.push(Account {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
            cart: Vec::new(),
        });
    }

    /// # Panics
    ///
    /// Panics on a negative price.
    pub fn add_product(&self, id: &str, title: &str, price: i64, category: &str) {
        self.data().products.push(Product {
            id: ProductId::new(id),
            product_code: Some(format!("SKU-{id}")),
            title: title.to_string(),
            description: format!("{title} description"),
            content: None,
            price: Price::new(Decimal::new(price, 0)).expect("Seed price is non-negative"),
            image: None,
            category: category.to_string(),
        });
    }

    pub fn add_category(&self, name: &str) {
        let mut data = self.data();
        let id = data.next_id("cat");
        data.categories.push(Category {
            id: CategoryId::new(id),
            name: name.to_string(),
        });
    }

    /// Replace an account's stored cart.
    pub fn set_cart(&self, email: &str, lines: Vec<CartLine>) {
        if let Some(account) = self.data().account_mut(email) {
            account.cart = lines;
        }
    }

    /// An account's stored cart.
    #[must_use]
    pub fn cart_of(&self, email: &str) -> Vec<CartLine> {
        self.data()
            .accounts
            .iter()
            .find(|a| a.email == email)
            .map(|a| a.cart.clone())
            .unwrap_or_default()
    }

    pub fn fail_cart_writes(&self, count: usize) {
        self.data().failing_cart_writes = count;
    }

    pub fn set_catalog_down(&self, down: bool) {
        self.data().catalog_down = down;
    }

    /// Forget every issued refresh cookie, as if the server restarted with
    /// new signing keys.
    pub fn revoke_refresh_tokens(&self) {
        let mut data = self.data();
        data.refresh_tokens.clear();
        data.access_tokens.clear();
    }
}

impl Drop for FakeShop {
    fn drop(&mut self) {
        self.server.abort();
    }
}
