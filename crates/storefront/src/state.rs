//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::StorefrontConfig;
use crate::db::StoreBackend;
use crate::models::cart::CartEvent;
use crate::services::scheduler;

/// Capacity of the cart change channel. Slow subscribers miss old events.
const CART_EVENT_CAPACITY: usize = 64;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, configuration and the cart change channel.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: StoreBackend,
    cart_events: broadcast::Sender<CartEvent>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: StoreBackend) -> Self {
        let (cart_events, _) = broadcast::channel(CART_EVENT_CAPACITY);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                cart_events,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the durable store.
    #[must_use]
    pub fn store(&self) -> &StoreBackend {
        &self.inner.store
    }

    /// Sender notified whenever a cart changes.
    #[must_use]
    pub fn cart_events(&self) -> &broadcast::Sender<CartEvent> {
        &self.inner.cart_events
    }

    /// Subscribe to cart change notifications.
    #[must_use]
    pub fn subscribe_cart_events(&self) -> broadcast::Receiver<CartEvent> {
        self.inner.cart_events.subscribe()
    }

    /// Start the background task publishing scheduled blog posts.
    pub fn start_post_publisher(&self) -> JoinHandle<()> {
        scheduler::spawn_post_publisher(self.store().clone(), self.config().publish_interval)
    }
}
