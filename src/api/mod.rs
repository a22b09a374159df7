//! REST endpoints over the marketplace services.

pub mod extract;
pub mod handlers;
pub mod types;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::account::{AccountService, TokenService};
use crate::cart::CartService;
use crate::catalog::Catalog;
use crate::checkout::{CheckoutPipeline, CheckoutSettings, WalletProvider};
use crate::storage::SharedStore;

#[derive(Clone)]
pub struct ApiState {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<Catalog>,
    pub carts: Arc<CartService>,
    pub checkout: Arc<CheckoutPipeline>,
}

impl ApiState {
    /// Wire every service to the same store.
    pub fn new(
        store: SharedStore,
        tokens: TokenService,
        wallet: Arc<dyn WalletProvider>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(store.clone(), tokens)),
            catalog: Arc::new(Catalog::new(store.clone())),
            carts: Arc::new(CartService::new(store.clone())),
            checkout: Arc::new(CheckoutPipeline::new(store, wallet, settings)),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/accounts", post(handlers::register))
        .route("/accounts/session", post(handlers::login))
        .route("/accounts/me", get(handlers::get_me).put(handlers::update_me))
        .route("/accounts/:id", get(handlers::get_account))
        .route("/accounts/:id/listings", get(handlers::get_account_listings))
        .route(
            "/listings",
            get(handlers::list_listings).post(handlers::create_listing),
        )
        .route(
            "/listings/:id",
            get(handlers::get_listing)
                .put(handlers::update_listing)
                .delete(handlers::delete_listing),
        )
        .route("/listings/:id/views", post(handlers::record_view))
        .route("/listings/:id/favorite", post(handlers::set_favorite))
        .route(
            "/cart",
            get(handlers::get_cart)
                .post(handlers::add_to_cart)
                .put(handlers::update_cart)
                .delete(handlers::remove_from_cart),
        )
        .route("/checkout", post(handlers::checkout))
        .route("/checkout/quote", get(handlers::checkout_quote))
        .route("/orders", get(handlers::list_orders))
        .route("/orders/:id", get(handlers::get_order))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct ApiServer {
    state: ApiState,
    bind_addr: String,
}

impl ApiServer {
    pub fn new(state: ApiState, bind_addr: impl Into<String>) -> Self {
        Self {
            state,
            bind_addr: bind_addr.into(),
        }
    }

    pub async fn start(self) -> std::io::Result<()> {
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;
        info!("Marketplace API listening on {}", self.bind_addr);
        axum::serve(listener, app).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{SimulatedAccount, SimulatedWallet};
    use crate::storage::EntityStore;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const WALLET: &str = "0x2222222222222222222222222222222222222222";

    fn app() -> Router {
        let wallet = SimulatedWallet::new(vec![SimulatedAccount {
            address: WALLET.to_string(),
            balance: Decimal::from(1),
        }]);
        let settings = CheckoutSettings {
            asset: "ETH".to_string(),
            usd_per_unit: Decimal::from(2000),
            merchant_address: crate::config::MERCHANT_ADDRESS.to_string(),
        };
        router(ApiState::new(
            EntityStore::new().shared(),
            TokenService::new("api-test-secret", 7),
            Arc::new(wallet),
            settings,
        ))
    }

    async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/accounts",
            None,
            Some(json!({ "name": "Tester", "email": email, "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_listing(app: &Router, token: &str, title: &str, price: f64) -> Value {
        let (status, body) = call(
            app,
            Method::POST,
            "/listings",
            Some(token),
            Some(json!({
                "title": title,
                "description": "Barely used",
                "price": price,
                "category": "Electronics",
                "condition": "Like New",
                "tags": ["gadget"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["product"].clone()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&app(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_account_flow() {
        let app = app();
        let token = register(&app, "carol@example.com").await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/accounts",
            None,
            Some(json!({ "name": "Other", "email": "carol@example.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(
            &app,
            Method::POST,
            "/accounts/session",
            None,
            Some(json!({ "email": "carol@example.com", "password": "nope-nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, _) = call(&app, Method::POST, "/accounts/session", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, me) = call(&app, Method::GET, "/accounts/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user"]["email"], "carol@example.com");
        assert!(me["user"].get("passwordHash").is_none());

        let id = me["user"]["id"].as_str().unwrap();
        let (status, public) = call(&app, Method::GET, &format!("/accounts/{}", id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(public["user"].get("email").is_none());

        let (status, updated) = call(
            &app,
            Method::PUT,
            "/accounts/me",
            Some(&token),
            Some(json!({ "name": "Carol K" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["user"]["name"], "Carol K");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = app();
        for (method, uri) in [
            (Method::GET, "/cart"),
            (Method::GET, "/accounts/me"),
            (Method::GET, "/orders"),
            (Method::GET, "/checkout/quote"),
        ] {
            let (status, body) = call(&app, method.clone(), uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            assert!(body["error"].is_string());

            let (status, _) = call(&app, method, uri, Some("garbage.token"), None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_listing_lifecycle_and_ownership() {
        let app = app();
        let seller = register(&app, "seller@example.com").await;
        let stranger = register(&app, "stranger@example.com").await;
        let product = create_listing(&app, &seller, "Headphones", 80.0).await;
        let id = product["id"].as_str().unwrap();
        assert_eq!(product["status"], "active");
        assert_eq!(product["condition"], "Like New");

        let (status, _) = call(
            &app,
            Method::POST,
            "/listings",
            Some(&seller),
            Some(json!({ "title": "Bad", "description": "x", "price": 10, "originalPrice": 5, "category": "Books", "condition": "Good" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/listings/{}", id);
        let (status, _) = call(&app, Method::PUT, &uri, Some(&stranger), Some(json!({ "price": 1 }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, Method::PUT, &uri, Some(&seller), Some(json!({ "price": 75.5 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"]["price"], json!(75.5));

        let (_, body) = call(&app, Method::POST, &format!("{}/views", uri), None, None).await;
        assert_eq!(body["product"]["views"], 1);
        let (_, body) = call(
            &app,
            Method::POST,
            &format!("{}/favorite", uri),
            None,
            Some(json!({ "favorited": true })),
        )
        .await;
        assert_eq!(body["product"]["favorites"], 1);

        let (status, body) = call(&app, Method::GET, "/listings?q=headph&sort=price-low", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"].as_array().unwrap().len(), 1);

        let (status, _) = call(&app, Method::GET, "/listings?sort=sideways", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::DELETE, &uri, Some(&stranger), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = call(&app, Method::DELETE, &uri, Some(&seller), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product deleted successfully");

        let (status, body) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Product not found");
        let (status, _) = call(&app, Method::GET, "/listings/not-a-uuid", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_seller_listings_with_status_filter() {
        let app = app();
        let seller = register(&app, "seller@example.com").await;
        let product = create_listing(&app, &seller, "Camera", 120.0).await;
        let uri = format!("/listings/{}", product["id"].as_str().unwrap());
        call(&app, Method::PUT, &uri, Some(&seller), Some(json!({ "status": "sold" }))).await;

        let seller_id = product["sellerId"].as_str().unwrap();
        let (_, active) = call(&app, Method::GET, &format!("/accounts/{}/listings", seller_id), None, None).await;
        assert!(active["products"].as_array().unwrap().is_empty());

        let (_, all) = call(
            &app,
            Method::GET,
            &format!("/listings?sellerId={}&status=all", seller_id),
            None,
            None,
        )
        .await;
        assert_eq!(all["products"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_to_order_flow() {
        let app = app();
        let seller = register(&app, "seller@example.com").await;
        let buyer = register(&app, "buyer@example.com").await;
        let product = create_listing(&app, &seller, "Speaker", 20.0).await;
        let product_id = product["id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, Method::POST, "/checkout", Some(&buyer), Some(json!({
            "shipping": {}, "payment": { "type": "paypal" }
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        call(&app, Method::POST, "/cart", Some(&buyer), Some(json!({ "productId": product_id }))).await;
        let (status, cart) = call(
            &app,
            Method::POST,
            "/cart",
            Some(&buyer),
            Some(json!({ "productId": product_id, "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["items"][0]["quantity"], 2);

        let (status, _) = call(
            &app,
            Method::POST,
            "/cart",
            Some(&buyer),
            Some(json!({ "productId": product_id, "quantity": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, quote) = call(&app, Method::GET, "/checkout/quote", Some(&buyer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["total"], json!(53.19));

        let (status, body) = call(
            &app,
            Method::POST,
            "/checkout",
            Some(&buyer),
            Some(json!({
                "shipping": {
                    "name": "Buyer", "address": "2 Side St", "city": "Austin",
                    "state": "TX", "zipCode": "73301"
                },
                "payment": {
                    "type": "card", "cardNumber": "4000 0000 0000 1234",
                    "expiryDate": "01/29", "cvv": "999", "cardName": "Buyer"
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let order = &body["order"];
        assert_eq!(order["status"], "confirmed");
        assert_eq!(order["total"], json!(53.19));
        assert_eq!(order["payment"], json!({ "type": "card", "last4": "1234" }));
        assert!(!body.to_string().contains("4000 0000"));

        let (_, cart) = call(&app, Method::GET, "/cart", Some(&buyer), None).await;
        assert!(cart["items"].as_array().unwrap().is_empty());

        let (_, orders) = call(&app, Method::GET, "/orders", Some(&buyer), None).await;
        assert_eq!(orders["orders"].as_array().unwrap().len(), 1);

        let order_uri = format!("/orders/{}", order["id"].as_str().unwrap());
        let (status, _) = call(&app, Method::GET, &order_uri, Some(&buyer), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::GET, &order_uri, Some(&seller), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cart_update_and_remove() {
        let app = app();
        let seller = register(&app, "seller@example.com").await;
        let buyer = register(&app, "buyer@example.com").await;
        let product = create_listing(&app, &seller, "Kettle", 15.0).await;
        let product_id = product["id"].as_str().unwrap().to_string();

        call(&app, Method::POST, "/cart", Some(&buyer), Some(json!({ "productId": product_id }))).await;
        let (_, cart) = call(
            &app,
            Method::PUT,
            "/cart",
            Some(&buyer),
            Some(json!({ "productId": product_id, "quantity": 4 })),
        )
        .await;
        assert_eq!(cart["items"][0]["quantity"], 4);

        let (status, _) = call(&app, Method::DELETE, "/cart", Some(&buyer), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, cart) = call(
            &app,
            Method::DELETE,
            &format!("/cart?productId={}", product_id),
            Some(&buyer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(cart["items"].as_array().unwrap().is_empty());

        let (status, _) = call(
            &app,
            Method::POST,
            "/cart",
            Some(&buyer),
            Some(json!({ "productId": uuid::Uuid::new_v4() })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_validation_error() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/accounts")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
