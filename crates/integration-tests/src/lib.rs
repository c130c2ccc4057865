//! Integration test fixtures for Mangaba.
//!
//! In-memory fakes for the storefront's external collaborators: the remote
//! cart backend, the product catalog, the order store, and the payment
//! gateway. The scenario tests under `tests/` wire these into the real
//! domain services, so every flow runs end-to-end without a database or
//! network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mangaba-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use mangaba_core::{
    LineItem, LineItemId, Money, NewLineItem, NewOrder, Order, OrderId, OrderStatus, OwnerId,
    PaymentStatus, ProductId, Quantity,
};
use mangaba_storefront::cart::CartBackend;
use mangaba_storefront::db::{OrderStore, RepositoryError};
use mangaba_storefront::services::catalog::{CatalogError, ProductCatalog, ProductSnapshot};
use mangaba_storefront::services::payment::{PaymentError, PaymentGateway, PaymentIntent};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Remote cart backend fake
// ============================================================================

/// In-memory stand-in for the Postgres cart backend.
///
/// Upserts follow the same natural-key consolidation contract as the real
/// repository: one line per `(owner, product, size, color)`, quantities
/// summed on conflict.
#[derive(Clone, Default)]
pub struct InMemoryCartBackend {
    inner: Arc<CartBackendInner>,
}

#[derive(Default)]
struct CartBackendInner {
    items: Mutex<Vec<LineItem>>,
    next_id: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryCartBackend {
    /// Every stored item, across all owners.
    #[must_use]
    pub fn all_items(&self) -> Vec<LineItem> {
        lock(&self.inner.items).clone()
    }

    /// Make every operation fail, simulating an unreachable backend.
    pub fn set_unavailable(&self) {
        self.inner.unavailable.store(true, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.inner.unavailable.load(Ordering::Relaxed) {
            return Err(RepositoryError::Storage(
                "remote cart backend unreachable".to_owned(),
            ));
        }
        Ok(())
    }
}

impl CartBackend for InMemoryCartBackend {
    async fn upsert(&self, draft: NewLineItem) -> Result<LineItem, RepositoryError> {
        self.check_available()?;
        let mut items = lock(&self.inner.items);

        if let Some(existing) = items
            .iter_mut()
            .filter(|item| item.owner_id == draft.owner_id)
            .find(|item| item.matches(&draft.product_id, &draft.variant))
        {
            existing.quantity = existing
                .quantity
                .checked_add(draft.quantity)
                .ok_or_else(|| {
                    RepositoryError::DataCorruption("line item quantity overflow".to_owned())
                })?;
            return Ok(existing.clone());
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let item = draft.into_line_item(LineItemId::new(format!("srv-{id}")));
        items.push(item.clone());
        Ok(item)
    }

    async fn remove(&self, owner: &OwnerId, id: &LineItemId) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut items = lock(&self.inner.items);
        items.retain(|item| !(item.owner_id == *owner && item.id == *id));
        Ok(())
    }

    async fn set_quantity(
        &self,
        owner: &OwnerId,
        id: &LineItemId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut items = lock(&self.inner.items);
        if let Some(item) = items
            .iter_mut()
            .find(|item| item.owner_id == *owner && item.id == *id)
        {
            item.quantity = quantity;
        }
        Ok(())
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<LineItem>, RepositoryError> {
        self.check_available()?;
        let items = lock(&self.inner.items);
        Ok(items
            .iter()
            .filter(|item| item.owner_id == *owner)
            .cloned()
            .collect())
    }

    async fn clear(&self, owner: &OwnerId) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut items = lock(&self.inner.items);
        items.retain(|item| item.owner_id != *owner);
        Ok(())
    }
}

// ============================================================================
// Catalog fake
// ============================================================================

/// In-memory product catalog.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    products: HashMap<ProductId, ProductSnapshot>,
}

impl FakeCatalog {
    /// Add a product priced in cents.
    #[must_use]
    pub fn with_product(mut self, id: &str, name: &str, price_cents: u32) -> Self {
        self.products.insert(
            ProductId::new(id),
            ProductSnapshot {
                name: name.to_owned(),
                price: Money::from_cents(price_cents),
                image_url: None,
            },
        );
        self
    }
}

impl ProductCatalog for FakeCatalog {
    async fn product(&self, id: &ProductId) -> Result<ProductSnapshot, CatalogError> {
        self.products
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}

// ============================================================================
// Order store fake
// ============================================================================

/// In-memory order store with failure injection for persistence errors.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<OrderStoreInner>,
}

#[derive(Default)]
struct OrderStoreInner {
    orders: Mutex<Vec<Order>>,
    fail_next_create: AtomicBool,
}

impl InMemoryOrderStore {
    /// Make the next `create` call fail with a persistence error.
    pub fn fail_next_create(&self) {
        self.inner.fail_next_create.store(true, Ordering::Relaxed);
    }

    /// Snapshot of every stored order.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        lock(&self.inner.orders).clone()
    }

    /// Fetch one stored order without going through the trait.
    #[must_use]
    pub fn get_order(&self, id: &OrderId) -> Option<Order> {
        lock(&self.inner.orders)
            .iter()
            .find(|order| order.id == *id)
            .cloned()
    }
}

impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        if self.inner.fail_next_create.swap(false, Ordering::Relaxed) {
            return Err(RepositoryError::Storage(
                "injected order store failure".to_owned(),
            ));
        }

        let order = Order {
            id: OrderId::generate(),
            owner_id: order.owner_id,
            items: order.items,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::AwaitingPayment,
            payment_reference: None,
            subtotal: order.subtotal,
            shipping: order.shipping,
            discount: order.discount,
            total: order.total,
            created_at: Utc::now(),
        };

        lock(&self.inner.orders).push(order.clone());
        Ok(order)
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(lock(&self.inner.orders)
            .iter()
            .find(|order| order.id == *id)
            .cloned())
    }

    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = lock(&self.inner.orders)
            .iter()
            .filter(|order| order.owner_id == *owner)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_payment_status(
        &self,
        id: &OrderId,
        status: PaymentStatus,
        reference: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut orders = lock(&self.inner.orders);
        let order = orders
            .iter_mut()
            .find(|order| order.id == *id)
            .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))?;

        order.payment_status = status;
        if let Some(reference) = reference {
            order.payment_reference = Some(reference.to_owned());
        }
        Ok(())
    }
}

// ============================================================================
// Payment gateway fake
// ============================================================================

/// In-memory payment gateway with failure injection.
#[derive(Clone, Default)]
pub struct FakePaymentGateway {
    inner: Arc<PaymentGatewayInner>,
}

#[derive(Default)]
struct PaymentGatewayInner {
    intents: Mutex<Vec<(OrderId, Money)>>,
    confirmed: Mutex<Vec<String>>,
    fail_next_intent: AtomicBool,
    decline_confirm: AtomicBool,
}

impl FakePaymentGateway {
    /// Make the next `create_intent` call fail.
    pub fn fail_next_intent(&self) {
        self.inner.fail_next_intent.store(true, Ordering::Relaxed);
    }

    /// Make every `confirm` call come back declined.
    pub fn decline_confirmations(&self) {
        self.inner.decline_confirm.store(true, Ordering::Relaxed);
    }

    /// Intents created so far.
    #[must_use]
    pub fn intents(&self) -> Vec<(OrderId, Money)> {
        lock(&self.inner.intents).clone()
    }

    /// References confirmed so far.
    #[must_use]
    pub fn confirmed(&self) -> Vec<String> {
        lock(&self.inner.confirmed).clone()
    }
}

impl PaymentGateway for FakePaymentGateway {
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: Money,
    ) -> Result<PaymentIntent, PaymentError> {
        if self.inner.fail_next_intent.swap(false, Ordering::Relaxed) {
            return Err(PaymentError::Api {
                status: 503,
                message: "injected processor outage".to_owned(),
            });
        }

        lock(&self.inner.intents).push((*order_id, amount));
        Ok(PaymentIntent {
            reference: format!("pi_{order_id}"),
        })
    }

    async fn confirm(&self, reference: &str) -> Result<(), PaymentError> {
        if self.inner.decline_confirm.load(Ordering::Relaxed) {
            return Err(PaymentError::Declined("card_declined".to_owned()));
        }
        lock(&self.inner.confirmed).push(reference.to_owned());
        Ok(())
    }
}
