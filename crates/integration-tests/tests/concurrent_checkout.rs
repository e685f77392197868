//! Parallel checkouts racing for stock and for the shared collections.

#![allow(clippy::unwrap_used)]

use tokio::sync::broadcast;

use chezflora_core::{AddressType, ProductId, Role, UserId};
use chezflora_integration_tests::TestServer;
use chezflora_storefront::db::MemoryStore;
use chezflora_storefront::models::address::NewAddress;
use chezflora_storefront::models::cart::CartScope;
use chezflora_storefront::models::order::{CheckoutRequest, ShippingPolicy};
use chezflora_storefront::services::addresses::AddressService;
use chezflora_storefront::services::auth::{AuthService, Registration};
use chezflora_storefront::services::cart::CartService;
use chezflora_storefront::services::catalog::CatalogService;
use chezflora_storefront::services::orders::{OrderError, OrderService};

async fn shopper(server: &TestServer, email: &str, product: &ProductId) -> UserId {
    let store = server.store();
    let user = AuthService::new(store)
        .create_user(
            Registration {
                email: email.to_owned(),
                password: "bouquet-de-roses".to_owned(),
                first_name: "Alex".to_owned(),
                last_name: "Martin".to_owned(),
            },
            Role::Customer,
        )
        .await
        .unwrap();

    AddressService::new(store)
        .add_address(
            &user.id,
            NewAddress {
                address_type: AddressType::Shipping,
                nickname: None,
                first_name: "Alex".to_owned(),
                last_name: "Martin".to_owned(),
                company: None,
                street: "3 place du Marché".to_owned(),
                street2: None,
                postal_code: "69002".to_owned(),
                city: "Lyon".to_owned(),
                country: "FR".to_owned(),
                phone: None,
                is_default: true,
            },
        )
        .await
        .unwrap();

    let guest = MemoryStore::new();
    let (events, _) = broadcast::channel(8);
    CartService::new(store, &guest, &events)
        .add_to_cart(&CartScope::User(user.id.clone()), product, 1)
        .await
        .unwrap();

    user.id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_exactly_one_checkout_wins_the_last_unit() {
    let server = TestServer::spawn().await;
    server.category("roses", None).await;
    let product = server.product("rose-unique", "roses", 1500, Some(1)).await.id;

    let mut shoppers = Vec::new();
    for i in 0..2 {
        shoppers.push(shopper(&server, &format!("shopper{i}@example.com"), &product).await);
    }

    let mut tasks = Vec::new();
    for user in shoppers {
        let store = server.store().clone();
        tasks.push(tokio::spawn(async move {
            OrderService::new(&store, ShippingPolicy::default())
                .create_order(&user, CheckoutRequest::default())
                .await
        }));
    }

    let mut placed = 0;
    let mut short = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(OrderError::InsufficientStock { available, .. }) => {
                assert_eq!(available, 0);
                short += 1;
            }
            Err(e) => panic!("unexpected checkout error: {e}"),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(short, 1);
    let stock = CatalogService::new(server.store())
        .get_product(&product)
        .await
        .unwrap()
        .unwrap()
        .stock;
    assert_eq!(stock, Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_checkouts_of_distinct_products_all_succeed() {
    let server = TestServer::spawn().await;
    server.category("roses", None).await;

    let mut shoppers = Vec::new();
    for i in 0..16 {
        let product = server
            .product(&format!("rose-{i}"), "roses", 1500, Some(100))
            .await
            .id;
        let user = shopper(&server, &format!("buyer{i}@example.com"), &product).await;
        shoppers.push((user, product));
    }

    let mut tasks = Vec::new();
    for (user, product) in shoppers {
        let store = server.store().clone();
        tasks.push(tokio::spawn(async move {
            let placed = OrderService::new(&store, ShippingPolicy::default())
                .create_order(&user, CheckoutRequest::default())
                .await;
            (product, placed)
        }));
    }

    let catalog = CatalogService::new(server.store());
    for task in tasks {
        let (product, placed) = task.await.unwrap();
        if let Err(e) = placed {
            panic!("checkout of {product} failed: {e}");
        }
        let stock = catalog.get_product(&product).await.unwrap().unwrap().stock;
        assert_eq!(stock, Some(99));
    }

    let orders = OrderService::new(server.store(), ShippingPolicy::default())
        .list_all_orders(None)
        .await
        .unwrap();
    assert_eq!(orders.len(), 16);
}
