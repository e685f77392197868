//! Cart service.
//!
//! Keeps every line within the product's tracked stock and merges a guest's
//! session cart into their account at login.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use chezflora_core::{ProductId, UserId};

use crate::db::carts::CartRepository;
use crate::db::products::ProductRepository;
use crate::db::{KvStore, RepositoryError};
use crate::models::cart::{CartEvent, CartItem, CartScope, CartSummary, item_count};
use crate::models::product::Product;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The requested quantity exceeds tracked stock. Nothing was changed.
    #[error("only {available} of {product} left in stock")]
    InsufficientStock { product: String, available: u32 },

    #[error("quantity must be at least 1")]
    InvalidQuantity,
}

/// Cart service over the durable store `D` and the visitor's session store `G`.
pub struct CartService<'a, D, G> {
    products: ProductRepository<'a, D>,
    carts: CartRepository<'a, D, G>,
    events: &'a broadcast::Sender<CartEvent>,
}

impl<'a, D: KvStore, G: KvStore> CartService<'a, D, G> {
    /// Create a cart service that announces changes on `events`.
    #[must_use]
    pub const fn new(durable: &'a D, guest: &'a G, events: &'a broadcast::Sender<CartEvent>) -> Self {
        Self {
            products: ProductRepository::new(durable),
            carts: CartRepository::new(durable, guest),
            events,
        }
    }

    /// Lines currently in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn get_cart(&self, scope: &CartScope) -> Result<Vec<CartItem>, CartError> {
        Ok(self.carts.items(scope).await?)
    }

    /// Cart lines with item count and subtotal.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn summary(&self, scope: &CartScope) -> Result<CartSummary, CartError> {
        Ok(CartSummary::from_items(self.get_cart(scope).await?))
    }

    /// Add `quantity` units of a product, summing with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for zero, `CartError::ProductNotFound`
    /// for an unknown product and `CartError::InsufficientStock` if the line
    /// would exceed tracked stock.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        scope: &CartScope,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartSummary, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self.find_product(product_id).await?;

        let items = self
            .carts
            .mutate(scope, |items| {
                let current = items
                    .iter()
                    .find(|item| item.product_id() == product_id)
                    .map_or(0, |item| item.quantity);
                let wanted = current.saturating_add(quantity);
                ensure_in_stock(&product, wanted)?;
                set_line(items, &product, wanted);
                Ok::<_, CartError>(items.clone())
            })
            .await?;

        self.notify(scope, &items);
        Ok(CartSummary::from_items(items))
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// Setting the quantity of a product that is not in the cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock` if `quantity` exceeds tracked stock.
    #[instrument(skip(self))]
    pub async fn update_cart_item_quantity(
        &self,
        scope: &CartScope,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartSummary, CartError> {
        let Ok(quantity) = u32::try_from(quantity) else {
            return if quantity <= 0 {
                self.remove_from_cart(scope, product_id).await
            } else {
                Err(CartError::InvalidQuantity)
            };
        };
        if quantity == 0 {
            return self.remove_from_cart(scope, product_id).await;
        }
        let product = self.find_product(product_id).await?;
        ensure_in_stock(&product, quantity)?;

        let items = self
            .carts
            .mutate(scope, |items| {
                if items.iter().any(|item| item.product_id() == product_id) {
                    set_line(items, &product, quantity);
                }
                Ok::<_, CartError>(items.clone())
            })
            .await?;

        self.notify(scope, &items);
        Ok(CartSummary::from_items(items))
    }

    /// Remove a product's line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        scope: &CartScope,
        product_id: &ProductId,
    ) -> Result<CartSummary, CartError> {
        let items = self
            .carts
            .mutate(scope, |items| {
                items.retain(|item| item.product_id() != product_id);
                Ok::<_, CartError>(items.clone())
            })
            .await?;

        self.notify(scope, &items);
        Ok(CartSummary::from_items(items))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, scope: &CartScope) -> Result<(), CartError> {
        self.carts
            .mutate(scope, |items| {
                items.clear();
                Ok::<_, CartError>(())
            })
            .await?;
        self.notify(scope, &[]);
        Ok(())
    }

    /// Move the guest cart into `user_id`'s cart.
    ///
    /// The guest cart is taken out of the session first, so a repeated call
    /// finds nothing to merge. Shared products have their quantities summed;
    /// every merged line is clamped to current tracked stock and lines for
    /// products that no longer exist are dropped.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a store fails. The guest lines are
    /// put back in the session when the merge cannot be written.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn migrate_guest_cart(&self, user_id: &UserId) -> Result<CartSummary, CartError> {
        let guest_items = self.carts.take_guest().await?;
        let scope = CartScope::User(user_id.clone());
        if guest_items.is_empty() {
            return self.summary(&scope).await;
        }

        let catalog: HashMap<ProductId, Product> = self
            .products
            .list()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let merged = self
            .carts
            .mutate(&scope, |items| {
                for guest in &guest_items {
                    let Some(product) = catalog.get(guest.product_id()) else {
                        debug!(product_id = %guest.product_id(), "Dropping guest line for deleted product");
                        continue;
                    };
                    let current = items
                        .iter()
                        .find(|item| item.product_id() == guest.product_id())
                        .map_or(0, |item| item.quantity);
                    let wanted = current.saturating_add(guest.quantity);
                    let clamped = product.stock.map_or(wanted, |stock| wanted.min(stock));
                    if clamped < wanted {
                        info!(product_id = %product.id, wanted, clamped, "Clamped merged cart line to stock");
                    }
                    if clamped == 0 {
                        items.retain(|item| item.product_id() != &product.id);
                    } else {
                        set_line(items, product, clamped);
                    }
                }
                Ok::<_, CartError>(items.clone())
            })
            .await;

        let merged = match merged {
            Ok(items) => items,
            Err(e) => {
                self.restore_guest(&guest_items).await;
                return Err(e);
            }
        };

        info!(lines = guest_items.len(), "Guest cart merged");
        self.notify(&CartScope::Guest, &[]);
        self.notify(&scope, &merged);
        Ok(CartSummary::from_items(merged))
    }

    async fn restore_guest(&self, guest_items: &[CartItem]) {
        let restored = self
            .carts
            .mutate(&CartScope::Guest, |items| {
                items.extend_from_slice(guest_items);
                Ok::<_, RepositoryError>(())
            })
            .await;
        if let Err(e) = restored {
            warn!(error = %e, "Could not restore guest cart after failed merge");
        }
    }

    async fn find_product(&self, id: &ProductId) -> Result<Product, CartError> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| CartError::ProductNotFound(id.clone()))
    }

    fn notify(&self, scope: &CartScope, items: &[CartItem]) {
        let event = CartEvent {
            scope: scope.clone(),
            item_count: item_count(items),
        };
        // No receivers is fine.
        self.events.send(event).ok();
    }
}

fn ensure_in_stock(product: &Product, wanted: u32) -> Result<(), CartError> {
    match product.stock {
        Some(available) if wanted > available => Err(CartError::InsufficientStock {
            product: product.name.clone(),
            available,
        }),
        _ => Ok(()),
    }
}

/// Set the quantity of `product`'s line, refreshing its snapshot, or append it.
fn set_line(items: &mut Vec<CartItem>, product: &Product, quantity: u32) {
    if let Some(item) = items.iter_mut().find(|item| item.product_id() == &product.id) {
        item.product = product.clone();
        item.quantity = quantity;
    } else {
        items.push(CartItem {
            product: product.clone(),
            quantity,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chezflora_core::Money;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::product::fixtures::product;

    struct Fixture {
        store: MemoryStore,
        guest: MemoryStore,
        events: broadcast::Sender<CartEvent>,
    }

    impl Fixture {
        async fn with_products(products: Vec<Product>) -> Self {
            let store = MemoryStore::new();
            ProductRepository::new(&store)
                .mutate(|all| {
                    all.extend(products.iter().cloned());
                    Ok::<_, RepositoryError>(())
                })
                .await
                .unwrap();
            let (events, _) = broadcast::channel(16);
            Self {
                store,
                guest: MemoryStore::new(),
                events,
            }
        }

        fn service(&self) -> CartService<'_, MemoryStore, MemoryStore> {
            CartService::new(&self.store, &self.guest, &self.events)
        }
    }

    fn user() -> CartScope {
        CartScope::User(UserId::new("u1"))
    }

    #[tokio::test]
    async fn test_add_sums_existing_line() {
        let fx = Fixture::with_products(vec![product("rose", "roses", 1000, Some(10))]).await;
        let cart = fx.service();
        let id = ProductId::new("rose");

        cart.add_to_cart(&user(), &id, 2).await.unwrap();
        let summary = cart.add_to_cart(&user(), &id, 3).await.unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.subtotal, Money::from_cents(5000));
    }

    #[tokio::test]
    async fn test_stock_ceiling_leaves_cart_unchanged() {
        let fx = Fixture::with_products(vec![product("x", "roses", 1000, Some(2))]).await;
        let cart = fx.service();
        let id = ProductId::new("x");

        cart.add_to_cart(&user(), &id, 1).await.unwrap();
        cart.add_to_cart(&user(), &id, 1).await.unwrap();
        let err = cart.add_to_cart(&user(), &id, 1).await.unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 2, .. }));

        let items = cart.get_cart(&user()).await.unwrap();
        assert_eq!(items.first().map(|i| i.quantity), Some(2));
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let fx = Fixture::with_products(vec![product("x", "roses", 1000, None)]).await;
        let cart = fx.service();
        assert!(matches!(
            cart.add_to_cart(&user(), &ProductId::new("x"), 0).await,
            Err(CartError::InvalidQuantity)
        ));
        assert!(matches!(
            cart.add_to_cart(&user(), &ProductId::new("ghost"), 1).await,
            Err(CartError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_quantity_zero_or_negative_removes() {
        let fx = Fixture::with_products(vec![product("x", "roses", 1000, Some(9))]).await;
        let cart = fx.service();
        let id = ProductId::new("x");

        cart.add_to_cart(&user(), &id, 3).await.unwrap();
        let summary = cart.update_cart_item_quantity(&user(), &id, 7).await.unwrap();
        assert_eq!(summary.item_count, 7);
        assert!(matches!(
            cart.update_cart_item_quantity(&user(), &id, 10).await,
            Err(CartError::InsufficientStock { available: 9, .. })
        ));
        let summary = cart.update_cart_item_quantity(&user(), &id, -1).await.unwrap();
        assert!(summary.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_broadcast_events() {
        let fx = Fixture::with_products(vec![product("x", "roses", 1000, None)]).await;
        let mut rx = fx.events.subscribe();
        let cart = fx.service();

        cart.add_to_cart(&CartScope::Guest, &ProductId::new("x"), 4).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.scope, CartScope::Guest);
        assert_eq!(event.item_count, 4);

        cart.clear_cart(&CartScope::Guest).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().item_count, 0);
    }

    #[tokio::test]
    async fn test_guest_cart_migration_merges_and_clamps() {
        let fx = Fixture::with_products(vec![
            product("a", "roses", 1000, Some(3)),
            product("b", "roses", 500, None),
        ])
        .await;
        let cart = fx.service();
        let user_id = UserId::new("u1");
        let a = ProductId::new("a");
        let b = ProductId::new("b");

        cart.add_to_cart(&user(), &a, 2).await.unwrap();
        cart.add_to_cart(&CartScope::Guest, &a, 2).await.unwrap();
        cart.add_to_cart(&CartScope::Guest, &b, 1).await.unwrap();

        let merged = cart.migrate_guest_cart(&user_id).await.unwrap();
        let quantity = |id: &ProductId| {
            merged
                .items
                .iter()
                .find(|i| i.product_id() == id)
                .map(|i| i.quantity)
        };
        assert_eq!(quantity(&a), Some(3));
        assert_eq!(quantity(&b), Some(1));
        assert!(cart.get_cart(&CartScope::Guest).await.unwrap().is_empty());

        let again = cart.migrate_guest_cart(&user_id).await.unwrap();
        assert_eq!(again, merged);
    }
}
