//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Category tree and product inventory
//! - `cart` - Cart operations and guest cart migration
//! - `orders` - Checkout and the order lifecycle
//! - `addresses` - Customer address book
//! - `blog` - Posts, scheduled publication and comments
//! - `scheduler` - Background publisher for scheduled posts
//! - `newsletter` - Newsletter subscriptions
//! - `auth` - Accounts and password authentication
//! - `audit` - Back-office audit trail
//! - `quotes` - Quote requests
//!
//! Every service borrows the store it works on, so the same code runs against
//! the in-memory store in tests and `PostgreSQL` in production.

pub mod addresses;
pub mod audit;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod catalog;
pub mod newsletter;
pub mod orders;
pub mod quotes;
pub mod scheduler;
