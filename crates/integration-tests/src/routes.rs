//! Route handlers of the fake backend.

use axum::extract::{Multipart, Path, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use shopline_core::{CartLine, Price, Product, ProductId, ProductImage, Role};

use crate::{Account, SharedShop, ShopData, lock};

const REFRESH_COOKIE: &str = "refreshtoken";

type Rejection = (StatusCode, Json<Value>);

fn reject(status: StatusCode, msg: &str) -> Rejection {
    (status, Json(json!({ "msg": msg })))
}

pub fn router(shop: SharedShop) -> Router {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/refreshtoken", get(refresh_token))
        .route("/users/info", get(info))
        .route("/api/products", get(products).post(create_product))
        .route("/api/products/{id}", delete(delete_product))
        .route("/api/category", get(categories))
        .route("/api/upload", post(upload))
        .route("/api/getCart", get(get_cart))
        .route("/api/updateCart", post(update_cart))
        .route("/api/deleteCartItem/{product_id}", delete(delete_cart_item))
        .with_state(shop)
}

// =============================================================================
// Auth helpers
// =============================================================================

/// Email of the account behind the raw `Authorization` header.
fn authenticate(data: &ShopData, headers: &HeaderMap) -> Result<String, Rejection> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|token| data.access_tokens.get(token))
        .cloned()
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Invalid Authentication"))
}

fn refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn token_response(data: &mut ShopData, email: &str) -> Response {
    let (access, refresh) = data.issue_tokens(email);
    let cookie = format!("{REFRESH_COOKIE}={refresh}; Path=/users/refreshtoken; HttpOnly");
    ([(SET_COOKIE, cookie)], Json(json!({ "accessToken": access }))).into_response()
}

// =============================================================================
// Users
// =============================================================================

#[derive(Deserialize)]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
}

async fn register(
    State(shop): State<SharedShop>,
    Json(body): Json<RegisterBody>,
) -> Result<Response, Rejection> {
    let mut data = lock(&shop);
    if data.accounts.iter().any(|a| a.email == body.email) {
        return Err(reject(StatusCode::BAD_REQUEST, "The email already exists."));
    }
    if body.password.len() < 6 {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Password is at least 6 characters long.",
        ));
    }
    data.accounts.push(Account {
        name: body.name,
        email: body.email.clone(),
        password: body.password,
        role: Role::CUSTOMER,
        cart: Vec::new(),
    });
    Ok(token_response(&mut data, &body.email))
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(
    State(shop): State<SharedShop>,
    Json(body): Json<LoginBody>,
) -> Result<Response, Rejection> {
    let mut data = lock(&shop);
    let account = data
        .accounts
        .iter()
        .find(|a| a.email == body.email)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "User does not exist."))?;
    if account.password != body.password {
        return Err(reject(StatusCode::BAD_REQUEST, "Incorrect password."));
    }
    Ok(token_response(&mut data, &body.email))
}

/// Accepts the refresh cookie or, for clients without a persistent cookie
/// jar, a still-valid access token.
async fn refresh_token(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
) -> Result<Json<Value>, Rejection> {
    let mut data = lock(&shop);
    let email = refresh_cookie(&headers)
        .and_then(|cookie| data.refresh_tokens.get(&cookie).cloned())
        .or_else(|| authenticate(&data, &headers).ok())
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Please Login or Register"))?;

    let (access, _) = data.issue_tokens(&email);
    Ok(Json(json!({ "accessToken": access })))
}

async fn info(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
) -> Result<Json<Value>, Rejection> {
    let mut data = lock(&shop);
    let email = authenticate(&data, &headers)?;
    let account = data
        .account_mut(&email)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "User does not exist."))?;
    Ok(Json(json!({
        "name": account.name,
        "email": account.email,
        "role": account.role.as_i32(),
        "cart": account.cart,
    })))
}

// =============================================================================
// Catalog
// =============================================================================

async fn products(State(shop): State<SharedShop>) -> Result<Json<Value>, Rejection> {
    let data = lock(&shop);
    if data.catalog_down {
        return Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable"));
    }
    Ok(Json(json!({
        "status": "success",
        "result": data.products.len(),
        "products": data.products,
    })))
}

async fn categories(State(shop): State<SharedShop>) -> Json<Value> {
    Json(json!(lock(&shop).categories))
}

#[derive(Deserialize)]
struct CreateProductBody {
    product_id: String,
    title: String,
    description: String,
    #[serde(default)]
    content: String,
    price: Price,
    category: String,
    image: Option<ProductImage>,
}

async fn create_product(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
    Json(body): Json<CreateProductBody>,
) -> Result<Json<Value>, Rejection> {
    let mut data = lock(&shop);
    let email = authenticate(&data, &headers)?;
    let is_admin = data
        .account_mut(&email)
        .is_some_and(|a| a.role.is_admin());
    if !is_admin {
        return Err(reject(
            StatusCode::FORBIDDEN,
            "Admin resources access denied",
        ));
    }
    let id = data.next_id("prod");
    data.products.push(Product {
        id: ProductId::new(id),
        product_code: Some(body.product_id),
        title: body.title,
        description: body.description,
        content: Some(body.content),
        price: body.price,
        image: body.image,
        category: body.category,
    });
    Ok(Json(json!({ "msg": "Created a product" })))
}

/// No authentication check, matching the real backend.
async fn delete_product(
    State(shop): State<SharedShop>,
    Path(id): Path<String>,
) -> Json<Value> {
    lock(&shop).products.retain(|p| p.id.as_str() != id);
    Json(json!({ "msg": "Deleted a Product" }))
}

async fn upload(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, Rejection> {
    authenticate(&lock(&shop), &headers)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "Malformed upload"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| reject(StatusCode::BAD_REQUEST, "Malformed upload"))?;
        if bytes.is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "No files were uploaded."));
        }

        let mut data = lock(&shop);
        let public_id = data.next_id("img");
        data.uploads.push(file_name.clone());
        return Ok(Json(json!({
            "public_id": public_id,
            "url": format!("https://cdn.example.com/{public_id}/{file_name}"),
        })));
    }

    Err(reject(StatusCode::BAD_REQUEST, "No files were uploaded."))
}

// =============================================================================
// Cart
// =============================================================================

async fn get_cart(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
) -> Result<Json<Value>, Rejection> {
    let mut data = lock(&shop);
    let email = authenticate(&data, &headers)?;
    let cart = data
        .account_mut(&email)
        .map(|a| a.cart.clone())
        .unwrap_or_default();
    Ok(Json(json!({ "cart": cart })))
}

#[derive(Deserialize)]
struct UpdateCartBody {
    cart: Vec<CartLine>,
}

async fn update_cart(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
    Json(body): Json<UpdateCartBody>,
) -> Result<Json<Value>, Rejection> {
    let mut data = lock(&shop);
    let email = authenticate(&data, &headers)?;
    if data.failing_cart_writes > 0 {
        data.failing_cart_writes -= 1;
        return Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "Cart update failed"));
    }

    let account = data
        .account_mut(&email)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "User does not exist."))?;
    account.cart = body.cart;
    Ok(Json(json!({ "cart": account.cart })))
}

async fn delete_cart_item(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Result<Json<Value>, Rejection> {
    let mut data = lock(&shop);
    let email = authenticate(&data, &headers)?;
    if data.failing_cart_writes > 0 {
        data.failing_cart_writes -= 1;
        return Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "Cart update failed"));
    }

    let account = data
        .account_mut(&email)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "User does not exist."))?;
    account.cart.retain(|l| l.product_id.as_str() != product_id);
    Ok(Json(json!({ "cart": account.cart })))
}
