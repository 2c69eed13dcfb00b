//! Cart operations over HTTP.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use shopline_core::{CartLine, ProductId, Quantity};
use shopline_integration_tests::FakeShop;
use shopline_storefront::{MutationOutcome, Storefront, StorefrontError};

const ADA: &str = "ada@example.com";

fn id(raw: &str) -> ProductId {
    ProductId::new(raw)
}

fn line(raw: &str, qty: u32) -> CartLine {
    CartLine::new(id(raw), Quantity::new(qty).unwrap())
}

async fn signed_in(shop: &FakeShop) -> Storefront {
    let (store, _) = shop.storefront();
    store.load_catalog().await.unwrap();
    store.login(ADA, "secret").await.unwrap();
    store
}

#[tokio::test]
async fn test_cart_lifecycle() {
    let shop = FakeShop::seeded().await;
    let store = signed_in(&shop).await;
    assert!(store.cart().is_empty());

    let outcome = store
        .add_to_cart(&id("p2"), Quantity::new(2).unwrap())
        .await
        .unwrap();
    assert_eq!(outcome, MutationOutcome::Committed);
    assert_eq!(shop.cart_of(ADA), vec![line("p2", 2)]);

    store.add_to_cart(&id("p1"), Quantity::ONE).await.unwrap();
    store.update_quantity(&id("p2"), 1).await.unwrap();
    assert_eq!(shop.cart_of(ADA), vec![line("p2", 3), line("p1", 1)]);
    assert_eq!(store.cart_total(), Decimal::new(250, 0));
    assert_eq!(store.cart_item_count(), 4);

    store.remove_from_cart(&id("p2")).await.unwrap();
    assert_eq!(shop.cart_of(ADA), vec![line("p1", 1)]);
    assert_eq!(store.cart_total(), Decimal::new(100, 0));
}

#[tokio::test]
async fn test_add_overwrites_quantity() {
    let shop = FakeShop::seeded().await;
    let store = signed_in(&shop).await;

    store
        .add_to_cart(&id("p1"), Quantity::new(5).unwrap())
        .await
        .unwrap();
    store
        .add_to_cart(&id("p1"), Quantity::new(2).unwrap())
        .await
        .unwrap();

    assert_eq!(shop.cart_of(ADA), vec![line("p1", 2)]);
}

#[tokio::test]
async fn test_decrement_clamps_and_noop_sends_nothing() {
    let shop = FakeShop::seeded().await;
    shop.set_cart(ADA, vec![line("p1", 3)]);
    let store = signed_in(&shop).await;

    store.update_quantity(&id("p1"), -1000).await.unwrap();
    assert_eq!(shop.cart_of(ADA), vec![line("p1", 1)]);

    // Nothing left to decrement; a failing backend would surface an error
    shop.fail_cart_writes(1);
    let outcome = store.update_quantity(&id("p1"), -1).await.unwrap();
    assert_eq!(outcome, MutationOutcome::Unchanged);
}

#[tokio::test]
async fn test_failed_update_rolls_back() {
    let shop = FakeShop::seeded().await;
    shop.set_cart(ADA, vec![line("p1", 2)]);
    let store = signed_in(&shop).await;
    shop.fail_cart_writes(1);

    let err = store.update_quantity(&id("p1"), 1).await.unwrap_err();

    assert!(matches!(err, StorefrontError::Backend(_)));
    assert_eq!(err.user_message(), "Request failed: Cart update failed");
    assert_eq!(store.cart_reconciler().quantity(&id("p1")).unwrap().get(), 2);
    assert_eq!(shop.cart_of(ADA), vec![line("p1", 2)]);
}

#[tokio::test]
async fn test_failed_delete_restores_line() {
    let shop = FakeShop::seeded().await;
    shop.set_cart(ADA, vec![line("p1", 2), line("p2", 1)]);
    let store = signed_in(&shop).await;
    shop.fail_cart_writes(1);

    store.remove_from_cart(&id("p2")).await.unwrap_err();

    assert_eq!(store.cart().len(), 2);
    assert_eq!(store.cart_total(), Decimal::new(250, 0));
}

#[tokio::test]
async fn test_dangling_line_is_hidden() {
    let shop = FakeShop::seeded().await;
    shop.set_cart(ADA, vec![line("p1", 1), line("retired", 4)]);
    let store = signed_in(&shop).await;

    assert_eq!(store.cart().len(), 1);
    assert_eq!(store.cart_item_count(), 1);
    assert_eq!(store.cart_total(), Decimal::new(100, 0));
}

#[tokio::test]
async fn test_catalog_outage_hides_cart_until_reload() {
    let shop = FakeShop::seeded().await;
    shop.set_cart(ADA, vec![line("p1", 2)]);
    shop.set_catalog_down(true);
    let (store, _) = shop.storefront();

    let err = store.load_catalog().await.unwrap_err();
    assert!(matches!(err, StorefrontError::CatalogUnavailable(_)));

    store.login(ADA, "secret").await.unwrap();
    assert!(store.cart().is_empty());

    shop.set_catalog_down(false);
    store.load_catalog().await.unwrap();
    assert_eq!(store.cart_total(), Decimal::new(200, 0));
}

#[tokio::test]
async fn test_cart_requires_login() {
    let shop = FakeShop::seeded().await;
    let (store, _) = shop.storefront();
    store.load_catalog().await.unwrap();

    let err = store.add_to_cart(&id("p1"), Quantity::ONE).await.unwrap_err();
    assert!(matches!(err, StorefrontError::NotAuthenticated));

    let err = store.reload_cart().await.unwrap_err();
    assert!(matches!(err, StorefrontError::NotAuthenticated));
}

#[tokio::test]
async fn test_logout_clears_cart_and_keeps_server_copy() {
    let shop = FakeShop::seeded().await;
    shop.set_cart(ADA, vec![line("p1", 2)]);
    let store = signed_in(&shop).await;
    assert_eq!(store.cart().len(), 1);

    store.logout().await;

    assert!(store.cart().is_empty());
    assert_eq!(store.cart_total(), Decimal::ZERO);
    assert!(store.identity().is_none());
    assert_eq!(shop.cart_of(ADA), vec![line("p1", 2)]);
}
