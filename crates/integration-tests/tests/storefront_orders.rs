//! Checkout and order lifecycle over HTTP.

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use chezflora_core::ProductId;
use chezflora_integration_tests::{TestServer, envelope, money};
use chezflora_storefront::services::catalog::CatalogService;

fn shipping_address() -> Value {
    json!({
        "type": "shipping",
        "firstName": "Camille",
        "lastName": "Durand",
        "street": "12 rue des Lilas",
        "postalCode": "75011",
        "city": "Paris",
        "country": "FR",
    })
}

async fn stock_of(server: &TestServer, id: &str) -> Option<u32> {
    CatalogService::new(server.store())
        .get_product(&ProductId::new(id))
        .await
        .unwrap()
        .unwrap()
        .stock
}

/// A customer with a shipping address and `quantity` of `product` in the cart.
async fn ready_to_checkout(server: &TestServer, email: &str, product: &str, quantity: u32) -> Client {
    let customer = server.customer(email).await;
    let resp = customer
        .post(server.url("/api/account/addresses"))
        .json(&shipping_address())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = customer
        .post(server.url("/api/cart/items"))
        .json(&json!({ "productId": product, "quantity": quantity }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    customer
}

#[tokio::test]
async fn test_checkout_then_cancel_restores_stock() {
    let server = TestServer::spawn().await;
    server.category("bouquets", None).await;
    server.product("roses-rouges", "bouquets", 5000, Some(5)).await;
    let customer = ready_to_checkout(&server, "camille@example.com", "roses-rouges", 1).await;

    let resp = customer
        .post(server.url("/api/account/orders"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    let (status, body) = envelope(resp).await;
    assert_eq!(status, StatusCode::CREATED);

    let order = &body["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(money(&order["subtotal"]).to_string(), "50.00 €");
    assert_eq!(money(&order["shippingCost"]).to_string(), "7.90 €");
    assert_eq!(money(&order["total"]).to_string(), "57.90 €");
    assert_eq!(order["statusHistory"].as_array().unwrap().len(), 1);
    assert_eq!(order["statusHistory"][0]["status"], "pending");
    assert_eq!(stock_of(&server, "roses-rouges").await, Some(4));

    let resp = customer.get(server.url("/api/cart")).send().await.unwrap();
    let (_, cart) = envelope(resp).await;
    assert_eq!(cart["data"]["itemCount"], 0);

    let id = order["id"].as_str().unwrap();
    let resp = customer
        .post(server.url(&format!("/api/account/orders/{id}/cancel")))
        .json(&json!({ "reason": "Changed my mind" }))
        .send()
        .await
        .unwrap();
    let (status, body) = envelope(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(stock_of(&server, "roses-rouges").await, Some(5));

    // Cancelled is terminal.
    let resp = customer
        .post(server.url(&format!("/api/account/orders/{id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(stock_of(&server, "roses-rouges").await, Some(5));
}

#[tokio::test]
async fn test_checkout_without_address_or_items_is_rejected() {
    let server = TestServer::spawn().await;
    server.category("plantes", None).await;
    server.product("cactus", "plantes", 1200, Some(4)).await;
    let customer = server.customer("noe@example.com").await;

    let resp = customer
        .post(server.url("/api/account/orders"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    customer
        .post(server.url("/api/cart/items"))
        .json(&json!({ "productId": "cactus" }))
        .send()
        .await
        .unwrap();
    let resp = customer
        .post(server.url("/api/account/orders"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&server, "cactus").await, Some(4));
}

#[tokio::test]
async fn test_shipped_order_cannot_be_cancelled_by_customer() {
    let server = TestServer::spawn().await;
    server.category("bouquets", None).await;
    server.product("tulipes", "bouquets", 3000, Some(10)).await;
    let customer = ready_to_checkout(&server, "jade@example.com", "tulipes", 2).await;
    let admin = server.admin("patron@chezflora.fr").await;

    let resp = customer
        .post(server.url("/api/account/orders"))
        .json(&json!({ "paymentMethod": "paypal" }))
        .send()
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    let id = body["data"]["id"].as_str().unwrap().to_owned();

    for status in ["processing", "shipped"] {
        let resp = admin
            .put(server.url(&format!("/api/admin/orders/{id}/status")))
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = customer
        .post(server.url(&format!("/api/account/orders/{id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(stock_of(&server, "tulipes").await, Some(8));

    // Skipping straight back to pending is not in the transition table.
    let resp = admin
        .put(server.url(&format!("/api/admin/orders/{id}/status")))
        .json(&json!({ "status": "pending" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = customer
        .get(server.url(&format!("/api/account/orders/{id}")))
        .send()
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    let history: Vec<&str> = body["data"]["statusHistory"]
        .as_array()
        .unwrap()
        .iter()
        .map(|change| change["status"].as_str().unwrap())
        .collect();
    assert_eq!(history, ["pending", "processing", "shipped"]);
}

#[tokio::test]
async fn test_orders_are_private_to_their_owner() {
    let server = TestServer::spawn().await;
    server.category("bouquets", None).await;
    server.product("lys", "bouquets", 2200, None).await;
    let owner = ready_to_checkout(&server, "owner@example.com", "lys", 1).await;
    let other = server.customer("other@example.com").await;

    let resp = owner
        .post(server.url("/api/account/orders"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    let id = body["data"]["id"].as_str().unwrap().to_owned();

    let resp = other
        .get(server.url(&format!("/api/account/orders/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = other
        .post(server.url(&format!("/api/account/orders/{id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
