//! Order lifecycle service.
//!
//! Checkout turns the signed-in user's cart into an order while keeping
//! inventory consistent:
//!
//! 1. Stock is re-validated and decremented in one versioned write, so two
//!    checkouts racing for the last unit cannot both succeed.
//! 2. The order is appended. If that fails the stock is given back.
//! 3. The cart is cleared. A failure here is logged but the order stands.
//!
//! Cancelling an order gives its quantities back to current stock before the
//! status change is committed, and takes them back out if that commit fails.

use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use chezflora_core::{
    AddressId, AddressType, Money, OrderId, OrderStatus, ProductId, UnknownStatus, UserId,
};

use crate::db::addresses::AddressRepository;
use crate::db::carts::UserCartRepository;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::db::{KvStore, RepositoryError};
use crate::models::address::Address;
use crate::models::cart::{CartEvent, CartScope};
use crate::models::order::{
    CheckoutRequest, Order, OrderItem, ShippingPolicy, StatusChange, generate_order_id,
};

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("cart is empty")]
    EmptyCart,

    #[error("no {0} address")]
    MissingAddress(AddressType),

    #[error("address {0} not found")]
    AddressNotFound(AddressId),

    #[error("only {available} of {product} left in stock")]
    InsufficientStock { product: String, available: u32 },

    /// A cart line references a product that has since been deleted.
    #[error("{0} is no longer available")]
    ProductUnavailable(String),

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    InvalidStatus(#[from] UnknownStatus),
}

/// Order service over an injected store.
pub struct OrderService<'a, S> {
    products: ProductRepository<'a, S>,
    carts: UserCartRepository<'a, S>,
    orders: OrderRepository<'a, S>,
    addresses: AddressRepository<'a, S>,
    shipping: ShippingPolicy,
    cart_events: Option<&'a broadcast::Sender<CartEvent>>,
}

impl<'a, S: KvStore> OrderService<'a, S> {
    /// Create an order service charging shipping per `shipping`.
    #[must_use]
    pub const fn new(store: &'a S, shipping: ShippingPolicy) -> Self {
        Self {
            products: ProductRepository::new(store),
            carts: UserCartRepository::new(store),
            orders: OrderRepository::new(store),
            addresses: AddressRepository::new(store),
            shipping,
            cart_events: None,
        }
    }

    /// Announce the cart being emptied at checkout on `events`.
    #[must_use]
    pub const fn with_cart_events(mut self, events: &'a broadcast::Sender<CartEvent>) -> Self {
        self.cart_events = Some(events);
        self
    }

    /// Place an order for everything in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart`, `OrderError::MissingAddress` or
    /// `OrderError::AddressNotFound` before touching stock, and
    /// `OrderError::InsufficientStock` or `OrderError::ProductUnavailable`
    /// for the first line that cannot be supplied. No stock is taken when
    /// an error is returned.
    #[instrument(skip(self, checkout), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: &UserId,
        checkout: CheckoutRequest,
    ) -> Result<Order, OrderError> {
        let cart = self.carts.items(user_id).await?;
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let shipping_address = self
            .resolve_address(user_id, checkout.shipping_address_id.as_ref(), AddressType::Shipping)
            .await?
            .ok_or(OrderError::MissingAddress(AddressType::Shipping))?;
        let billing_address = self
            .resolve_address(user_id, checkout.billing_address_id.as_ref(), AddressType::Billing)
            .await?
            .unwrap_or_else(|| shipping_address.clone());

        let items = self
            .products
            .mutate(|products| {
                let mut items = Vec::with_capacity(cart.len());
                for line in &cart {
                    let Some(product) = products.iter().find(|p| p.id == line.product.id) else {
                        return Err(OrderError::ProductUnavailable(line.product.name.clone()));
                    };
                    if let Some(available) = product.stock
                        && line.quantity > available
                    {
                        return Err(OrderError::InsufficientStock {
                            product: product.name.clone(),
                            available,
                        });
                    }
                    items.push(OrderItem::new(product, line.quantity));
                }

                let now = Utc::now();
                for item in &items {
                    if let Some(product) = products.iter_mut().find(|p| p.id == item.product_id)
                        && let Some(stock) = product.stock.as_mut()
                    {
                        *stock = stock.saturating_sub(item.quantity);
                        product.updated_at = now;
                    }
                }
                Ok(items)
            })
            .await?;

        let subtotal: Money = items.iter().map(OrderItem::line_total).sum();
        let shipping_cost = self.shipping.cost_for(subtotal);
        let now = Utc::now();
        let order = Order {
            id: generate_order_id(now),
            user_id: user_id.clone(),
            items,
            shipping_address,
            billing_address,
            status: OrderStatus::Pending,
            payment_method: checkout.payment_method,
            subtotal,
            shipping_cost,
            total: subtotal + shipping_cost,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                date: now,
                comment: None,
            }],
            notes: checkout.notes.filter(|notes| !notes.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.orders.insert(&order).await {
            error!(order_id = %order.id, error = %e, "Failed to save order, returning stock");
            if let Err(restore) = self.move_stock(&order.items, StockMove::Return).await {
                error!(order_id = %order.id, error = %restore, "Failed to return stock");
            }
            return Err(e.into());
        }

        let cleared = self
            .carts
            .mutate(user_id, |items| {
                items.clear();
                Ok::<_, RepositoryError>(())
            })
            .await;
        match cleared {
            Ok(()) => {
                if let Some(events) = self.cart_events {
                    events
                        .send(CartEvent {
                            scope: CartScope::User(user_id.clone()),
                            item_count: 0,
                        })
                        .ok();
                }
            }
            Err(e) => warn!(order_id = %order.id, error = %e, "Order placed but cart not cleared"),
        }

        info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(order)
    }

    /// Move an order to `status`, appending to its history.
    ///
    /// Cancelling gives every line's quantity back to the product's current
    /// stock before the new status is committed. If the status write then
    /// fails, the quantities are taken back out, so a failed cancel leaves
    /// both the order and the stock as they were and can be retried.
    /// Untracked and deleted products are skipped.
    ///
    /// # Returns
    ///
    /// The updated order, or `None` if no order has this ID.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the status table does not
    /// allow the move.
    #[instrument(skip(self, comment), fields(order_id = %order_id, status = %status))]
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        comment: Option<String>,
    ) -> Result<Option<Order>, OrderError> {
        let Some(current) = self.orders.get(order_id).await? else {
            return Ok(None);
        };
        if !current.status.can_transition_to(status) {
            return Err(OrderError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let cancelling = status == OrderStatus::Cancelled;
        if cancelling {
            self.move_stock(&current.items, StockMove::Return).await?;
        }

        let updated = self
            .orders
            .mutate_order(order_id, |order| {
                if !order.status.can_transition_to(status) {
                    return Err(OrderError::InvalidTransition {
                        from: order.status,
                        to: status,
                    });
                }
                order.record_status(status, comment.clone(), Utc::now());
                Ok(order.clone())
            })
            .await;

        if cancelling && !matches!(updated, Ok(Some(_))) {
            warn!("Cancellation not committed, withdrawing returned stock");
            if let Err(e) = self.move_stock(&current.items, StockMove::Withdraw).await {
                error!(error = %e, "Failed to withdraw returned stock");
            }
        }

        let Some(order) = updated? else {
            return Ok(None);
        };
        info!("Order status updated");
        Ok(Some(order))
    }

    /// Cancel one of the user's own orders.
    ///
    /// # Returns
    ///
    /// The cancelled order, or `None` if the user has no order with this ID.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` once the order has shipped.
    pub async fn cancel_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
        reason: Option<String>,
    ) -> Result<Option<Order>, OrderError> {
        if self.get_order(user_id, order_id).await?.is_none() {
            return Ok(None);
        }
        self.update_order_status(order_id, OrderStatus::Cancelled, reason)
            .await
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_orders(&self, user_id: &UserId) -> Result<Vec<Order>, OrderError> {
        let mut orders = self.orders.list_for_user(user_id).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// One of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn get_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<Option<Order>, OrderError> {
        Ok(self
            .orders
            .list_for_user(user_id)
            .await?
            .into_iter()
            .find(|o| &o.id == order_id))
    }

    /// Any order, for the back-office.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.orders.get(order_id).await?)
    }

    /// Every order, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_all_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, OrderError> {
        let mut orders = self.orders.list_all().await?;
        if let Some(status) = status {
            orders.retain(|o| o.status == status);
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn resolve_address(
        &self,
        user_id: &UserId,
        explicit: Option<&AddressId>,
        address_type: AddressType,
    ) -> Result<Option<Address>, OrderError> {
        let addresses = self.addresses.list(user_id).await?;
        match explicit {
            Some(id) => addresses
                .into_iter()
                .find(|a| &a.id == id)
                .map(Some)
                .ok_or_else(|| OrderError::AddressNotFound(id.clone())),
            None => Ok(addresses
                .into_iter()
                .find(|a| a.address_type == address_type && a.is_default)),
        }
    }

    /// Add `items`' quantities to, or take them from, current tracked stock.
    async fn move_stock(&self, items: &[OrderItem], direction: StockMove) -> Result<(), RepositoryError> {
        let mut quantities: HashMap<&ProductId, u32> = HashMap::new();
        for item in items {
            let quantity = quantities.entry(&item.product_id).or_default();
            *quantity = quantity.saturating_add(item.quantity);
        }

        self.products
            .mutate(|products| {
                let now = Utc::now();
                for (product_id, quantity) in &quantities {
                    match products.iter_mut().find(|p| &&p.id == product_id) {
                        Some(product) => match product.stock.as_mut() {
                            Some(stock) => {
                                *stock = match direction {
                                    StockMove::Return => stock.saturating_add(*quantity),
                                    StockMove::Withdraw => stock.saturating_sub(*quantity),
                                };
                                product.updated_at = now;
                            }
                            None => debug!(product_id = %product_id, "Stock not tracked, nothing to move"),
                        },
                        None => warn!(product_id = %product_id, "Product deleted, cannot move stock"),
                    }
                }
                Ok(())
            })
            .await
    }
}

#[derive(Debug, Clone, Copy)]
enum StockMove {
    Return,
    Withdraw,
}
