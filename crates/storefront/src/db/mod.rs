//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `mangaba_storefront`
//!
//! Stores the server-side cart and order data (the catalog is an external
//! service and is never mirrored locally):
//!
//! ## Tables
//!
//! - `cart_items` - Remote cart line items, one row per natural key
//! - `orders` - Placed orders with frozen totals
//! - `order_items` - Product lines frozen onto an order
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p mangaba-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod cart;
pub mod orders;

pub use cart::PgCartBackend;
pub use orders::{OrderStore, PgOrderStore};

/// Errors that can occur in cart and order persistence.
///
/// Shared between the remote (Postgres) and guest (device blob) backends so
/// the cart store has one persistence error surface.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backing store could not be read or written (e.g., the guest cart
    /// blob is unavailable).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Guest cart blob could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row violates a domain invariant.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// The referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
