//! Cart behaviour over HTTP: guest carts, stock ceilings and the merge at login.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use chezflora_integration_tests::{PASSWORD, TestServer, client, envelope, money};

#[tokio::test]
async fn test_account_cart_requires_login() {
    let server = TestServer::spawn().await;

    let resp = client().get(server.url("/api/cart")).send().await.unwrap();
    let (status, body) = envelope(resp).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_stock_ceiling_rejects_and_keeps_cart() {
    let server = TestServer::spawn().await;
    server.category("bouquets", None).await;
    server.product("pivoines", "bouquets", 2500, Some(2)).await;
    let guest = client();

    let resp = guest
        .post(server.url("/api/guest/cart/items"))
        .json(&json!({ "productId": "pivoines", "quantity": 2 }))
        .send()
        .await
        .unwrap();
    let (status, body) = envelope(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["itemCount"], 2);

    let resp = guest
        .post(server.url("/api/guest/cart/items"))
        .json(&json!({ "productId": "pivoines", "quantity": 1 }))
        .send()
        .await
        .unwrap();
    let (status, body) = envelope(resp).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["available"], 2);

    let resp = guest.get(server.url("/api/guest/cart")).send().await.unwrap();
    let (_, body) = envelope(resp).await;
    assert_eq!(body["data"]["itemCount"], 2);
    assert_eq!(money(&body["data"]["subtotal"]).to_string(), "50.00 €");
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let server = TestServer::spawn().await;

    let resp = client()
        .post(server.url("/api/guest/cart/items"))
        .json(&json!({ "productId": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_cart_moves_into_account_at_login() {
    let server = TestServer::spawn().await;
    server.category("plantes", None).await;
    server.product("monstera", "plantes", 2990, Some(3)).await;
    server.product("ficus", "plantes", 1990, None).await;

    // An account that already has one monstera in its cart.
    let existing = server.customer("lea@example.com").await;
    existing
        .post(server.url("/api/cart/items"))
        .json(&json!({ "productId": "monstera", "quantity": 1 }))
        .send()
        .await
        .unwrap();

    let visitor = client();
    for (product, quantity) in [("monstera", 3), ("ficus", 2)] {
        let resp = visitor
            .post(server.url("/api/guest/cart/items"))
            .json(&json!({ "productId": product, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = visitor
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "lea@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    let (status, body) = envelope(resp).await;
    assert_eq!(status, StatusCode::OK);

    // 1 + 3 monstera clamps to the 3 in stock; untracked ficus merges as is.
    let items = body["data"]["cart"]["items"].as_array().unwrap();
    let quantity_of = |id: &str| {
        items
            .iter()
            .find(|item| item["product"]["id"] == id)
            .map(|item| item["quantity"].as_u64().unwrap())
    };
    assert_eq!(quantity_of("monstera"), Some(3));
    assert_eq!(quantity_of("ficus"), Some(2));

    let resp = visitor.get(server.url("/api/guest/cart")).send().await.unwrap();
    let (_, body) = envelope(resp).await;
    assert_eq!(body["data"]["itemCount"], 0);

    // Logging in again has nothing left to merge.
    let resp = visitor
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "lea@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    let (_, body) = envelope(resp).await;
    assert_eq!(body["data"]["cart"]["itemCount"], 5);
}

#[tokio::test]
async fn test_logout_forgets_the_user() {
    let server = TestServer::spawn().await;
    let customer = server.customer("hugo@example.com").await;

    let resp = customer.get(server.url("/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = customer.post(server.url("/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = customer.get(server.url("/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let server = TestServer::spawn().await;
    server.customer("ines@example.com").await;

    let resp = client()
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "ines@example.com", "password": "not-the-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
