//! Integration tests for ChezFlora.
//!
//! Each test spawns the storefront router on an ephemeral port over a fresh
//! in-memory store and drives it with a cookie-aware HTTP client, so no
//! database or running server is needed:
//!
//! ```bash
//! cargo test -p chezflora-integration-tests
//! ```
//!
//! Service-level properties that need concurrency (parallel checkouts) go
//! straight at the services over the same store the server uses.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use chezflora_core::{CategoryId, Money, ProductId, Role};
use chezflora_storefront::config::StorefrontConfig;
use chezflora_storefront::db::StoreBackend;
use chezflora_storefront::db::users::UserRepository;
use chezflora_storefront::models::category::NewCategory;
use chezflora_storefront::models::product::{NewProduct, Product};
use chezflora_storefront::routes;
use chezflora_storefront::services::auth::AuthService;
use chezflora_storefront::services::catalog::CatalogService;
use chezflora_storefront::state::AppState;

/// Password used for every account the helpers create.
pub const PASSWORD: &str = "bouquet-de-roses";

/// A storefront listening on `127.0.0.1` with its own in-memory store.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Spawn the full router on an ephemeral port.
    pub async fn spawn() -> Self {
        let state = AppState::new(StorefrontConfig::default(), StoreBackend::memory());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = routes::app(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[must_use]
    pub fn store(&self) -> &StoreBackend {
        self.state.store()
    }

    /// Create a category directly in the store.
    pub async fn category(&self, id: &str, parent: Option<&str>) -> CategoryId {
        CatalogService::new(self.store())
            .add_category(NewCategory {
                id: Some(CategoryId::new(id)),
                name: id.to_owned(),
                parent_id: parent.map(CategoryId::new),
                ..NewCategory::default()
            })
            .await
            .unwrap()
            .id
    }

    /// Create a product directly in the store. `price` is in cents.
    pub async fn product(&self, id: &str, category: &str, price: u32, stock: Option<u32>) -> Product {
        CatalogService::new(self.store())
            .add_product(NewProduct {
                id: Some(ProductId::new(id)),
                name: id.to_owned(),
                description: String::new(),
                price: Money::from_cents(price),
                stock,
                category: CategoryId::new(category),
                images: Vec::new(),
                sku: None,
                popular: false,
                featured: false,
            })
            .await
            .unwrap()
    }

    /// Register a customer through the API and return the logged-in client.
    pub async fn customer(&self, email: &str) -> Client {
        let client = client();
        let resp = client
            .post(self.url("/auth/register"))
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "firstName": "Camille",
                "lastName": "Durand",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        client
    }

    /// Register an account, promote it to admin and return its client.
    pub async fn admin(&self, email: &str) -> Client {
        let client = self.customer(email).await;
        let user = UserRepository::new(self.store())
            .get_by_email(&email.parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        AuthService::new(self.store())
            .set_role(&user.id, Role::Admin)
            .await
            .unwrap();
        client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// HTTP client that keeps the session cookie between requests.
#[must_use]
pub fn client() -> Client {
    Client::builder().cookie_store(true).build().unwrap()
}

/// Status and JSON envelope of a response.
pub async fn envelope(resp: Response) -> (StatusCode, Value) {
    let status = resp.status();
    let body = resp.json::<Value>().await.unwrap();
    (status, body)
}

/// Parse a serialized money amount out of a JSON value.
#[must_use]
pub fn money(value: &Value) -> Money {
    serde_json::from_value(value.clone()).unwrap()
}
