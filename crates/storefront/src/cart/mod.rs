//! Cart store: single source of truth for the active shopper's cart.
//!
//! The store exposes the same operations whether the cart lives on the
//! shopper's device (guest mode) or behind the remote database (authenticated
//! mode); the difference is confined to the [`CartBackend`] strategy chosen
//! once at session start. Every mutation validates input first, snapshots
//! catalog data where needed, and then delegates persistence to the backend.

use std::sync::Arc;

use mangaba_core::{LineItem, LineItemId, NewLineItem, OwnerId, ProductId, Quantity, Variant};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::services::catalog::ProductCatalog;

pub mod guest;
pub mod merge;
pub mod pricing;

pub use guest::{CartBlobStore, GuestCartBackend, InMemoryCartStorage};
pub use merge::{MergeFailure, MergeReport, merge};
pub use pricing::{PricingResult, quote};

/// Current shopper identity as reported by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shopper {
    /// Browsing without an account; the cart lives on the device.
    Guest(OwnerId),
    /// Signed-in customer; the cart lives behind the remote store.
    Customer(OwnerId),
}

impl Shopper {
    /// The owner scope for cart rows, regardless of mode.
    #[must_use]
    pub const fn owner_id(&self) -> &OwnerId {
        match self {
            Self::Guest(id) | Self::Customer(id) => id,
        }
    }

    /// Whether the shopper is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Customer(_))
    }
}

/// Persistence strategy for cart line items.
///
/// Implementations must make `upsert` atomic with respect to the natural key
/// `(owner, product, size, color)`: two concurrent adds of the same
/// configuration must converge to one line item carrying the summed quantity,
/// never two duplicate rows.
pub trait CartBackend: Send + Sync {
    /// Insert the draft, or add its quantity to the existing natural-key
    /// match. The existing row keeps its ID and price snapshot.
    async fn upsert(&self, draft: NewLineItem) -> std::result::Result<LineItem, RepositoryError>;

    /// Delete a line item. Absent IDs are a no-op, not an error.
    async fn remove(
        &self,
        owner: &OwnerId,
        id: &LineItemId,
    ) -> std::result::Result<(), RepositoryError>;

    /// Replace the quantity of a line item. Absent IDs are a no-op.
    async fn set_quantity(
        &self,
        owner: &OwnerId,
        id: &LineItemId,
        quantity: Quantity,
    ) -> std::result::Result<(), RepositoryError>;

    /// Snapshot of the owner's items. No ordering guarantee.
    async fn list(&self, owner: &OwnerId) -> std::result::Result<Vec<LineItem>, RepositoryError>;

    /// Delete all of the owner's items.
    async fn clear(&self, owner: &OwnerId) -> std::result::Result<(), RepositoryError>;
}

/// The cart backend selected for this session.
///
/// Chosen once in [`open_session`]; no per-operation mode checks anywhere
/// else in the crate. `R` is the remote strategy - [`crate::db::PgCartBackend`]
/// in production, an in-memory fake in tests.
pub enum SessionBackend<R> {
    /// Authenticated mode: rows in the remote store scoped by owner.
    Remote(R),
    /// Guest mode: a serialized blob on the shopper's device.
    Guest(GuestCartBackend),
}

impl<R: CartBackend> CartBackend for SessionBackend<R> {
    async fn upsert(&self, draft: NewLineItem) -> std::result::Result<LineItem, RepositoryError> {
        match self {
            Self::Remote(backend) => backend.upsert(draft).await,
            Self::Guest(backend) => backend.upsert(draft).await,
        }
    }

    async fn remove(
        &self,
        owner: &OwnerId,
        id: &LineItemId,
    ) -> std::result::Result<(), RepositoryError> {
        match self {
            Self::Remote(backend) => backend.remove(owner, id).await,
            Self::Guest(backend) => backend.remove(owner, id).await,
        }
    }

    async fn set_quantity(
        &self,
        owner: &OwnerId,
        id: &LineItemId,
        quantity: Quantity,
    ) -> std::result::Result<(), RepositoryError> {
        match self {
            Self::Remote(backend) => backend.set_quantity(owner, id, quantity).await,
            Self::Guest(backend) => backend.set_quantity(owner, id, quantity).await,
        }
    }

    async fn list(&self, owner: &OwnerId) -> std::result::Result<Vec<LineItem>, RepositoryError> {
        match self {
            Self::Remote(backend) => backend.list(owner).await,
            Self::Guest(backend) => backend.list(owner).await,
        }
    }

    async fn clear(&self, owner: &OwnerId) -> std::result::Result<(), RepositoryError> {
        match self {
            Self::Remote(backend) => backend.clear(owner).await,
            Self::Guest(backend) => backend.clear(owner).await,
        }
    }
}

/// The active shopper's cart.
///
/// Owns the backend strategy and the catalog collaborator; the owner scope is
/// an explicit field rather than ambient state so the store is testable with
/// nothing but an in-memory backend.
pub struct CartStore<B, C> {
    backend: B,
    catalog: C,
    owner: OwnerId,
}

impl<B: CartBackend, C: ProductCatalog> CartStore<B, C> {
    /// Create a cart store for one owner.
    pub const fn new(backend: B, catalog: C, owner: OwnerId) -> Self {
        Self {
            backend,
            catalog,
            owner,
        }
    }

    /// The owner this store is scoped to.
    #[must_use]
    pub const fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Add units of a product-variant configuration to the cart.
    ///
    /// Snapshots the product's current price, name, and image from the
    /// catalog, then upserts by natural key: an existing configuration has
    /// its quantity incremented, a new one gets a fresh line item.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if `quantity` is zero or the product ID is
    ///   blank
    /// - [`AppError::Catalog`] if the price snapshot cannot be fetched
    /// - [`AppError::Persistence`] if the backend write fails
    #[tracing::instrument(skip(self), fields(owner = %self.owner))]
    pub async fn add_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
        variant: Variant,
    ) -> Result<LineItem> {
        let quantity =
            Quantity::new(quantity).map_err(|e| AppError::Validation(e.to_string()))?;

        let snapshot = self.catalog.product(product_id).await?;

        let draft = NewLineItem::new(
            self.owner.clone(),
            product_id.clone(),
            snapshot.name,
            snapshot.image_url,
            variant,
            snapshot.price,
            quantity,
        )
        .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(self.backend.upsert(draft).await?)
    }

    /// Remove a line item. Removing an ID that is not in the cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] if the backend write fails.
    #[tracing::instrument(skip(self), fields(owner = %self.owner))]
    pub async fn remove_item(&self, id: &LineItemId) -> Result<()> {
        Ok(self.backend.remove(&self.owner, id).await?)
    }

    /// Replace a line item's quantity.
    ///
    /// A quantity below one is rejected before it reaches the backend:
    /// deleting via quantity zero is disallowed, callers remove items with
    /// [`Self::remove_item`]. An absent ID is a no-op.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if `quantity` is zero
    /// - [`AppError::Persistence`] if the backend write fails
    #[tracing::instrument(skip(self), fields(owner = %self.owner))]
    pub async fn update_quantity(&self, id: &LineItemId, quantity: u32) -> Result<()> {
        let quantity =
            Quantity::new(quantity).map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(self.backend.set_quantity(&self.owner, id, quantity).await?)
    }

    /// Snapshot of the cart contents. Callers must not rely on ordering.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] if the backend read fails.
    pub async fn list(&self) -> Result<Vec<LineItem>> {
        Ok(self.backend.list(&self.owner).await?)
    }

    /// Remove every item in the cart (used after order placement).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] if the backend write fails.
    #[tracing::instrument(skip(self), fields(owner = %self.owner))]
    pub async fn clear(&self) -> Result<()> {
        Ok(self.backend.clear(&self.owner).await?)
    }

    /// Derived totals for the current cart contents (no discount applied).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`] if the backend read fails.
    pub async fn pricing(&self) -> Result<PricingResult> {
        let items = self.list().await?;
        Ok(pricing::quote(&items, mangaba_core::Money::ZERO))
    }
}

/// Select the cart backend for a new session.
///
/// Authenticated shoppers get the remote backend, probed once with an initial
/// fetch; if that fetch fails the session falls back to guest mode under the
/// device owner ID and the condition is logged. The fallback happens at most
/// once per session load - individual operation failures later in the session
/// are surfaced to the caller, never downgraded.
pub async fn open_session<R: CartBackend, C: ProductCatalog>(
    shopper: &Shopper,
    device_owner: OwnerId,
    remote: R,
    guest_storage: Arc<dyn CartBlobStore>,
    catalog: C,
) -> CartStore<SessionBackend<R>, C> {
    match shopper {
        Shopper::Customer(owner) => match remote.list(owner).await {
            Ok(_) => CartStore::new(SessionBackend::Remote(remote), catalog, owner.clone()),
            Err(e) => {
                tracing::warn!(
                    owner = %owner,
                    error = %e,
                    "Remote cart unreachable at session start; falling back to guest mode"
                );
                CartStore::new(
                    SessionBackend::Guest(GuestCartBackend::new(guest_storage)),
                    catalog,
                    device_owner,
                )
            }
        },
        Shopper::Guest(_) => CartStore::new(
            SessionBackend::Guest(GuestCartBackend::new(guest_storage)),
            catalog,
            device_owner,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mangaba_core::Money;

    use super::*;
    use crate::services::catalog::{CatalogError, ProductSnapshot};

    /// Catalog fake with a fixed product table.
    struct StubCatalog(HashMap<ProductId, ProductSnapshot>);

    impl StubCatalog {
        fn with_defaults() -> Self {
            let mut products = HashMap::new();
            products.insert(
                ProductId::new("shirt-1"),
                ProductSnapshot {
                    name: "Linen Shirt".to_owned(),
                    price: Money::from_cents(5_000),
                    image_url: None,
                },
            );
            products.insert(
                ProductId::new("shoe-2"),
                ProductSnapshot {
                    name: "Trail Shoe".to_owned(),
                    price: Money::from_cents(12_000),
                    image_url: Some("https://cdn.example/shoe-2.jpg".to_owned()),
                },
            );
            Self(products)
        }
    }

    impl ProductCatalog for StubCatalog {
        async fn product(
            &self,
            id: &ProductId,
        ) -> std::result::Result<ProductSnapshot, CatalogError> {
            self.0
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(id.to_string()))
        }
    }

    fn guest_store() -> CartStore<GuestCartBackend, StubCatalog> {
        let storage = Arc::new(InMemoryCartStorage::default());
        CartStore::new(
            GuestCartBackend::new(storage),
            StubCatalog::with_defaults(),
            OwnerId::new("guest-1"),
        )
    }

    #[tokio::test]
    async fn test_add_item_snapshots_catalog_price() {
        let store = guest_store();

        let item = store
            .add_item(&ProductId::new("shirt-1"), 2, Variant::new(Some("M"), None))
            .await
            .expect("add succeeds");

        assert_eq!(item.unit_price, Money::from_cents(5_000));
        assert_eq!(item.product_name, "Linen Shirt");
        assert_eq!(item.quantity.get(), 2);
    }

    #[tokio::test]
    async fn test_add_item_deduplicates_by_natural_key() {
        let store = guest_store();
        let variant = Variant::new(Some("M"), Some("Blue"));

        let first = store
            .add_item(&ProductId::new("shirt-1"), 2, variant.clone())
            .await
            .expect("first add");
        let second = store
            .add_item(&ProductId::new("shirt-1"), 1, variant)
            .await
            .expect("second add");

        // Same line item, quantity summed.
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity.get(), 3);

        let items = store.list().await.expect("list");
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_variants_get_distinct_lines() {
        let store = guest_store();

        store
            .add_item(&ProductId::new("shirt-1"), 1, Variant::new(Some("M"), None))
            .await
            .expect("add M");
        store
            .add_item(&ProductId::new("shirt-1"), 1, Variant::new(Some("L"), None))
            .await
            .expect("add L");

        assert_eq!(store.list().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_add_item_rejects_zero_quantity() {
        let store = guest_store();

        let result = store
            .add_item(&ProductId::new("shirt-1"), 0, Variant::none())
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_add_item_surfaces_catalog_miss() {
        let store = guest_store();

        let result = store
            .add_item(&ProductId::new("deleted-product"), 1, Variant::none())
            .await;

        assert!(matches!(result, Err(AppError::Catalog(_))));
    }

    #[tokio::test]
    async fn test_update_quantity_floor() {
        let store = guest_store();
        let item = store
            .add_item(&ProductId::new("shirt-1"), 2, Variant::none())
            .await
            .expect("add");

        // Zero and would-be-negative updates are rejected before the backend.
        assert!(matches!(
            store.update_quantity(&item.id, 0).await,
            Err(AppError::Validation(_))
        ));

        let items = store.list().await.expect("list");
        assert_eq!(items.first().map(|i| i.quantity.get()), Some(2));

        store
            .update_quantity(&item.id, 5)
            .await
            .expect("valid update");
        let items = store.list().await.expect("list");
        assert_eq!(items.first().map(|i| i.quantity.get()), Some(5));
    }

    #[tokio::test]
    async fn test_remove_item_is_idempotent() {
        let store = guest_store();
        let item = store
            .add_item(&ProductId::new("shirt-1"), 1, Variant::none())
            .await
            .expect("add");

        store.remove_item(&item.id).await.expect("first remove");
        store.remove_item(&item.id).await.expect("second remove");

        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_clear_empties_the_cart() {
        let store = guest_store();
        store
            .add_item(&ProductId::new("shirt-1"), 1, Variant::none())
            .await
            .expect("add shirt");
        store
            .add_item(&ProductId::new("shoe-2"), 1, Variant::none())
            .await
            .expect("add shoe");

        store.clear().await.expect("clear");
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_pricing_reflects_current_contents() {
        let store = guest_store();
        store
            .add_item(&ProductId::new("shirt-1"), 2, Variant::none())
            .await
            .expect("add shirt");
        store
            .add_item(&ProductId::new("shoe-2"), 1, Variant::none())
            .await
            .expect("add shoe");

        let pricing = store.pricing().await.expect("pricing");
        assert_eq!(pricing.subtotal, Money::from_cents(22_000));
        assert_eq!(pricing.shipping, Money::ZERO);
        assert_eq!(pricing.total, Money::from_cents(22_000));
    }
}
