//! Login, restore and logout against the fake backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use shopline_integration_tests::FakeShop;
use shopline_storefront::{
    AccessToken, BootOutcome, HttpBackend, MemoryTokenStore, Storefront, StorefrontError,
    TokenStore,
};

#[tokio::test]
async fn test_login_resolves_identity_and_persists_token() {
    let shop = FakeShop::seeded().await;
    let (store, tokens) = shop.storefront();

    let identity = store.login("ada@example.com", "secret").await.unwrap();

    assert_eq!(identity.name, "Ada");
    assert!(!identity.is_admin());
    assert!(store.is_authenticated());
    assert!(tokens.peek().is_some());
}

#[tokio::test]
async fn test_wrong_password_surfaces_backend_message() {
    let shop = FakeShop::seeded().await;
    let (store, tokens) = shop.storefront();

    let err = store.login("ada@example.com", "nope").await.unwrap_err();

    assert_eq!(err.user_message(), "Request failed: Incorrect password.");
    assert!(!store.is_authenticated());
    assert!(tokens.peek().is_none());
}

#[tokio::test]
async fn test_invalid_email_is_rejected_before_any_request() {
    let shop = FakeShop::seeded().await;
    let (store, _) = shop.storefront();

    let err = store.login("ada.example.com", "secret").await.unwrap_err();

    assert!(matches!(err, StorefrontError::InvalidInput(_)));
}

#[tokio::test]
async fn test_boot_refreshes_with_cookie() {
    let shop = FakeShop::seeded().await;
    let (store, tokens) = shop.storefront();
    store.login("ada@example.com", "secret").await.unwrap();
    let before = tokens.peek().unwrap();

    let outcome = store.boot().await;

    assert!(matches!(outcome, BootOutcome::Restored(ref id) if id.name == "Ada"));
    assert_ne!(tokens.peek().unwrap(), before);
}

#[tokio::test]
async fn test_new_client_restores_from_persisted_token() {
    let shop = FakeShop::seeded().await;
    let (first, tokens) = shop.storefront();
    first.login("grace@example.com", "admin-pw").await.unwrap();

    // Fresh client: empty cookie jar, same persisted token
    let config = shop.config("unused".into());
    let persisted = Arc::new(MemoryTokenStore::with_token(tokens.peek().unwrap()));
    let second = Storefront::new(
        Arc::new(HttpBackend::new(&config).unwrap()),
        persisted,
        &config,
    );

    let outcome = second.boot().await;

    assert!(matches!(outcome, BootOutcome::Restored(_)));
    assert!(second.is_admin());
}

#[tokio::test]
async fn test_rejected_refresh_discards_token_silently() {
    let shop = FakeShop::seeded().await;
    let config = shop.config("unused".into());
    let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("expired")));
    let store = Storefront::new(
        Arc::new(HttpBackend::new(&config).unwrap()),
        tokens.clone(),
        &config,
    );

    let outcome = store.boot().await;

    assert_eq!(outcome, BootOutcome::RefreshRejected);
    assert!(!store.is_authenticated());
    assert!(tokens.peek().is_none());
    // The catalog still loaded
    assert_eq!(store.products(None, None).len(), 2);
}

#[tokio::test]
async fn test_register_then_login_again() {
    let shop = FakeShop::seeded().await;
    let (store, _) = shop.storefront();

    let identity = store
        .register("Linus", "linus@example.com", "penguin")
        .await
        .unwrap();
    assert_eq!(identity.name, "Linus");

    store.logout().await;
    assert!(!store.is_authenticated());

    store.login("linus@example.com", "penguin").await.unwrap();
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn test_duplicate_registration_fails() {
    let shop = FakeShop::seeded().await;
    let (store, _) = shop.storefront();

    let err = store
        .register("Ada", "ada@example.com", "another-pw")
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Request failed: The email already exists.");
}

#[tokio::test]
async fn test_file_token_store_survives_restart() {
    let shop = FakeShop::seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let config = shop.config(dir.path().join("shopline").join("access_token"));

    let first = Storefront::connect(&config).unwrap();
    first.login("ada@example.com", "secret").await.unwrap();
    drop(first);

    let second = Storefront::connect(&config).unwrap();
    let outcome = second.boot().await;
    assert!(matches!(outcome, BootOutcome::Restored(_)));

    second.logout().await;
    let store = shopline_storefront::FileTokenStore::new(&config.token_path);
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_revoked_tokens_end_session_on_next_boot() {
    let shop = FakeShop::seeded().await;
    let (store, tokens) = shop.storefront();
    store.load_catalog().await.unwrap();
    store.login("ada@example.com", "secret").await.unwrap();
    store
        .add_to_cart(&shopline_core::ProductId::new("p1"), shopline_core::Quantity::ONE)
        .await
        .unwrap();

    shop.revoke_refresh_tokens();
    let outcome = store.boot().await;

    assert_eq!(outcome, BootOutcome::RefreshRejected);
    assert!(store.identity().is_none());
    assert!(store.cart().is_empty());
    assert!(tokens.peek().is_none());
}
