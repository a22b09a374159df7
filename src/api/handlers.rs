use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use super::extract::{ApiJson, Authenticated};
use super::types::*;
use super::ApiState;
use crate::account::{Credentials, ProfileUpdate, Registration};
use crate::catalog::{ListingPatch, NewListing};
use crate::checkout::CheckoutRequest;
use crate::error::{MarketError, MarketResult};

type ApiResult = MarketResult<Json<Value>>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// --- Accounts ---

pub async fn register(State(state): State<ApiState>, ApiJson(req): ApiJson<Registration>) -> ApiResult {
    let session = state.accounts.register(req).await?;
    Ok(Json(json!(session)))
}

pub async fn login(State(state): State<ApiState>, ApiJson(creds): ApiJson<Credentials>) -> ApiResult {
    let session = state.accounts.login(creds).await?;
    Ok(Json(json!(session)))
}

pub async fn get_me(State(state): State<ApiState>, Authenticated(who): Authenticated) -> ApiResult {
    let user = state.accounts.profile(&who)?;
    Ok(Json(json!({ "user": user })))
}

pub async fn update_me(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult {
    let user = state.accounts.update_profile(&who, update).await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn get_account(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id, "User")?;
    let user = state.accounts.public_profile(&id)?;
    Ok(Json(json!({ "user": user })))
}

pub async fn get_account_listings(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> ApiResult {
    let id = parse_id(&id, "User")?;
    let products = state.catalog.list_by_owner(&id, parse_status(&query.status)?)?;
    Ok(Json(json!({ "products": products })))
}

// --- Listings ---

pub async fn list_listings(State(state): State<ApiState>, Query(query): Query<ListingsQuery>) -> ApiResult {
    let products = match query.seller()? {
        Some(seller) => state.catalog.list_by_owner(&seller, parse_status(&query.status)?)?,
        None => state.catalog.browse(&query.to_browse()?)?,
    };
    debug!(count = products.len(), "Listings query served");
    Ok(Json(json!({ "products": products })))
}

pub async fn create_listing(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    ApiJson(new): ApiJson<NewListing>,
) -> MarketResult<(StatusCode, Json<Value>)> {
    let product = state.catalog.create(&who, new)?;
    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

pub async fn get_listing(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let product = state.catalog.get(&parse_id(&id, "Product")?)?;
    Ok(Json(json!({ "product": product })))
}

pub async fn update_listing(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ListingPatch>,
) -> ApiResult {
    let product = state
        .catalog
        .update_owned(&who, &parse_id(&id, "Product")?, &patch)?;
    Ok(Json(json!({ "product": product })))
}

pub async fn delete_listing(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    state.catalog.delete_owned(&who, &parse_id(&id, "Product")?)?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

pub async fn record_view(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let product = state.catalog.record_view(&parse_id(&id, "Product")?)?;
    Ok(Json(json!({ "product": product })))
}

pub async fn set_favorite(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<FavoriteRequest>,
) -> ApiResult {
    let product = state
        .catalog
        .set_favorite(&parse_id(&id, "Product")?, req.favorited)?;
    Ok(Json(json!({ "product": product })))
}

// --- Cart ---

fn required_product(id: Option<uuid::Uuid>) -> MarketResult<uuid::Uuid> {
    id.ok_or_else(|| MarketError::validation("Product ID is required"))
}

pub async fn get_cart(State(state): State<ApiState>, Authenticated(who): Authenticated) -> ApiResult {
    Ok(Json(json!(state.carts.snapshot(&who)?)))
}

pub async fn add_to_cart(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    ApiJson(req): ApiJson<AddToCartRequest>,
) -> ApiResult {
    let listing_id = required_product(req.product_id)?;
    let quantity = req.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(MarketError::validation("Quantity must be at least 1"));
    }
    let quantity = u32::try_from(quantity).map_err(|_| MarketError::validation("Quantity is too large"))?;

    Ok(Json(json!(state.carts.add(&who, listing_id, quantity)?)))
}

pub async fn update_cart(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    ApiJson(req): ApiJson<UpdateCartRequest>,
) -> ApiResult {
    let listing_id = required_product(req.product_id)?;
    let quantity = req
        .quantity
        .ok_or_else(|| MarketError::validation("Product ID and quantity are required"))?;

    Ok(Json(json!(state.carts.update_quantity(&who, listing_id, quantity)?)))
}

pub async fn remove_from_cart(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    Query(query): Query<CartItemQuery>,
) -> ApiResult {
    let raw = query
        .product_id
        .ok_or_else(|| MarketError::validation("Product ID is required"))?;
    let listing_id = uuid::Uuid::parse_str(raw.trim())
        .map_err(|_| MarketError::validation("Product ID is invalid"))?;

    Ok(Json(json!(state.carts.remove(&who, listing_id)?)))
}

// --- Checkout and orders ---

pub async fn checkout_quote(State(state): State<ApiState>, Authenticated(who): Authenticated) -> ApiResult {
    Ok(Json(json!(state.checkout.quote(&who)?)))
}

pub async fn checkout(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> MarketResult<(StatusCode, Json<Value>)> {
    let order = state.checkout.submit(&who, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "order": order }))))
}

pub async fn list_orders(State(state): State<ApiState>, Authenticated(who): Authenticated) -> ApiResult {
    let orders = state.checkout.orders(&who)?;
    Ok(Json(json!({ "orders": orders })))
}

pub async fn get_order(
    State(state): State<ApiState>,
    Authenticated(who): Authenticated,
    Path(id): Path<String>,
) -> ApiResult {
    let order = state.checkout.order(&who, &parse_id(&id, "Order")?)?;
    Ok(Json(json!({ "order": order })))
}
