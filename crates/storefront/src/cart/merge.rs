//! One-time reconciliation of a guest cart into an authenticated cart.
//!
//! Runs on the guest-to-customer transition (login or registration). Each
//! guest line is replayed through the authenticated store's `add_item`, so
//! the natural-key consolidation rule applies: variants already in the
//! remote cart have their quantities summed rather than duplicated.

use mangaba_core::{OwnerId, ProductId};

use crate::cart::guest::GuestCartBackend;
use crate::cart::{CartBackend, CartStore};
use crate::error::AppError;
use crate::services::catalog::ProductCatalog;

/// Outcome of a guest cart merge.
#[derive(Debug)]
pub struct MergeReport {
    /// Guest lines successfully replayed into the authenticated cart.
    pub merged: usize,
    /// Guest lines that failed to merge, with the error for each.
    pub failed: Vec<MergeFailure>,
    /// Whether the guest store was cleared after the attempt.
    pub guest_cleared: bool,
}

impl MergeReport {
    /// Whether every guest line made it into the authenticated cart.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One guest line that could not be merged.
#[derive(Debug)]
pub struct MergeFailure {
    /// The product whose line failed.
    pub product_id: ProductId,
    /// Why it failed.
    pub error: AppError,
}

/// Merge the guest cart into the authenticated shopper's cart, then clear
/// the guest store.
///
/// Partial-failure tolerant: a line that fails to merge is logged and
/// recorded in the report, and the remaining lines still merge. The guest
/// store is cleared only after the whole attempt completes (success or
/// exhausted partial failure), which makes a repeated invocation harmless:
/// the second run sees an empty guest cart and does nothing. There is no
/// all-or-nothing guarantee.
///
/// # Errors
///
/// Returns [`AppError::Persistence`] only if the guest cart cannot be read
/// at all; in that case nothing was merged and the guest store is untouched.
#[tracing::instrument(skip_all, fields(guest = %guest_owner, owner = %store.owner()))]
pub async fn merge<B: CartBackend, C: ProductCatalog>(
    guest: &GuestCartBackend,
    guest_owner: &OwnerId,
    store: &CartStore<B, C>,
) -> Result<MergeReport, AppError> {
    let guest_items = guest.list(guest_owner).await?;

    let mut report = MergeReport {
        merged: 0,
        failed: Vec::new(),
        guest_cleared: false,
    };

    for item in guest_items {
        match store
            .add_item(&item.product_id, item.quantity.get(), item.variant.clone())
            .await
        {
            Ok(_) => report.merged += 1,
            Err(error) => {
                tracing::warn!(
                    product = %item.product_id,
                    error = %error,
                    "Failed to merge guest cart line; continuing with the rest"
                );
                report.failed.push(MergeFailure {
                    product_id: item.product_id,
                    error,
                });
            }
        }
    }

    // Clear only after the attempt has run to completion, so a retried login
    // event cannot double-apply the same guest snapshot.
    match guest.clear(guest_owner).await {
        Ok(()) => report.guest_cleared = true,
        Err(e) => {
            tracing::error!(error = %e, "Failed to clear guest cart after merge");
        }
    }

    tracing::info!(
        merged = report.merged,
        failed = report.failed.len(),
        "Guest cart merge finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use mangaba_core::{Money, NewLineItem, Quantity, Variant};

    use super::*;
    use crate::cart::guest::InMemoryCartStorage;
    use crate::services::catalog::{CatalogError, ProductSnapshot};

    struct StubCatalog {
        products: HashMap<ProductId, ProductSnapshot>,
    }

    impl StubCatalog {
        fn new(entries: &[(&str, u32)]) -> Self {
            let products = entries
                .iter()
                .map(|(id, cents)| {
                    (
                        ProductId::new(*id),
                        ProductSnapshot {
                            name: (*id).to_owned(),
                            price: Money::from_cents(*cents),
                            image_url: None,
                        },
                    )
                })
                .collect();
            Self { products }
        }
    }

    impl ProductCatalog for StubCatalog {
        async fn product(&self, id: &ProductId) -> Result<ProductSnapshot, CatalogError> {
            self.products
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(id.to_string()))
        }
    }

    async fn guest_with_items(items: &[(&str, u32)]) -> (GuestCartBackend, OwnerId) {
        let backend = GuestCartBackend::new(Arc::new(InMemoryCartStorage::default()));
        let owner = OwnerId::new("guest-1");
        for (product, quantity) in items {
            let draft = NewLineItem::new(
                owner.clone(),
                ProductId::new(*product),
                (*product).to_owned(),
                None,
                Variant::none(),
                Money::from_cents(1_000),
                Quantity::new(*quantity).expect("test quantity"),
            )
            .expect("valid draft");
            backend.upsert(draft).await.expect("seed guest cart");
        }
        (backend, owner)
    }

    fn authenticated_store(
        catalog: StubCatalog,
    ) -> CartStore<GuestCartBackend, StubCatalog> {
        // An isolated backend stands in for the remote store; merge only
        // needs the CartBackend surface.
        CartStore::new(
            GuestCartBackend::new(Arc::new(InMemoryCartStorage::default())),
            catalog,
            OwnerId::new("customer-9"),
        )
    }

    #[tokio::test]
    async fn test_merge_moves_guest_lines_and_clears_guest_store() {
        let (guest, guest_owner) = guest_with_items(&[("shirt-1", 2), ("shoe-2", 1)]).await;
        let store = authenticated_store(StubCatalog::new(&[("shirt-1", 5_000), ("shoe-2", 12_000)]));

        let report = merge(&guest, &guest_owner, &store).await.expect("merge");

        assert_eq!(report.merged, 2);
        assert!(report.is_complete());
        assert!(report.guest_cleared);
        assert_eq!(store.list().await.expect("list").len(), 2);
        assert!(guest.list(&guest_owner).await.expect("guest list").is_empty());
    }

    #[tokio::test]
    async fn test_merge_sums_quantities_with_existing_lines() {
        let (guest, guest_owner) = guest_with_items(&[("shirt-1", 2)]).await;
        let store = authenticated_store(StubCatalog::new(&[("shirt-1", 5_000)]));
        store
            .add_item(&ProductId::new("shirt-1"), 1, Variant::none())
            .await
            .expect("pre-existing line");

        merge(&guest, &guest_owner, &store).await.expect("merge");

        let items = store.list().await.expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().map(|i| i.quantity.get()), Some(3));
    }

    #[tokio::test]
    async fn test_merge_tolerates_partial_failure() {
        // "gone-9" is no longer in the catalog, so its line cannot merge.
        let (guest, guest_owner) = guest_with_items(&[("shirt-1", 1), ("gone-9", 1), ("shoe-2", 1)]).await;
        let store = authenticated_store(StubCatalog::new(&[("shirt-1", 5_000), ("shoe-2", 12_000)]));

        let report = merge(&guest, &guest_owner, &store).await.expect("merge");

        assert_eq!(report.merged, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            report.failed.first().map(|f| f.product_id.as_str()),
            Some("gone-9")
        );
        // The guest store is cleared even after partial failure, so the
        // merge never re-runs.
        assert!(report.guest_cleared);
        assert!(guest.list(&guest_owner).await.expect("guest list").is_empty());
    }

    #[tokio::test]
    async fn test_second_merge_is_a_noop() {
        let (guest, guest_owner) = guest_with_items(&[("shirt-1", 2)]).await;
        let store = authenticated_store(StubCatalog::new(&[("shirt-1", 5_000)]));

        merge(&guest, &guest_owner, &store).await.expect("first merge");
        let report = merge(&guest, &guest_owner, &store).await.expect("second merge");

        assert_eq!(report.merged, 0);
        assert!(report.is_complete());

        let items = store.list().await.expect("list");
        assert_eq!(items.first().map(|i| i.quantity.get()), Some(2));
    }
}
