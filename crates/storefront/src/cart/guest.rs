//! Guest-mode cart backend over device-local storage.
//!
//! The guest cart is one serialized JSON blob in a device-scoped store.
//! Every mutation re-serializes the full cart (write-through); there is no
//! write-behind buffering, so the blob always matches the last completed
//! operation. Guest operations never touch the network.

use std::sync::{Arc, Mutex, PoisonError};

use mangaba_core::{LineItem, LineItemId, NewLineItem, OwnerId, Quantity};

use crate::cart::CartBackend;
use crate::db::RepositoryError;

/// Device-scoped storage for the serialized guest cart.
///
/// Mirrors the get/set surface of browser local storage: one opaque blob,
/// synchronous access. The real device store belongs to the client shell;
/// servers and tests use [`InMemoryCartStorage`].
pub trait CartBlobStore: Send + Sync {
    /// Read the stored blob, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] if the device store is
    /// unavailable.
    fn load(&self) -> Result<Option<String>, RepositoryError>;

    /// Replace the stored blob.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] if the device store rejects the
    /// write (e.g., quota exceeded).
    fn save(&self, blob: &str) -> Result<(), RepositoryError>;

    /// Delete the stored blob.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] if the device store is
    /// unavailable.
    fn clear(&self) -> Result<(), RepositoryError>;
}

/// In-memory [`CartBlobStore`].
#[derive(Debug, Default)]
pub struct InMemoryCartStorage {
    blob: Mutex<Option<String>>,
}

impl CartBlobStore for InMemoryCartStorage {
    fn load(&self) -> Result<Option<String>, RepositoryError> {
        let guard = self.blob.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save(&self, blob: &str) -> Result<(), RepositoryError> {
        let mut guard = self.blob.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(blob.to_owned());
        Ok(())
    }

    fn clear(&self) -> Result<(), RepositoryError> {
        let mut guard = self.blob.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        Ok(())
    }
}

/// Cart backend for guest shoppers.
pub struct GuestCartBackend {
    storage: Arc<dyn CartBlobStore>,
}

impl GuestCartBackend {
    /// Create a guest backend over the given device store.
    #[must_use]
    pub fn new(storage: Arc<dyn CartBlobStore>) -> Self {
        Self { storage }
    }

    fn read_items(&self) -> Result<Vec<LineItem>, RepositoryError> {
        match self.storage.load()? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_items(&self, items: &[LineItem]) -> Result<(), RepositoryError> {
        let blob = serde_json::to_string(items)?;
        self.storage.save(&blob)
    }

    /// Locally generated item ID: millisecond timestamp plus a random suffix.
    fn generate_id() -> LineItemId {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u16 = rand::random();
        LineItemId::new(format!("{millis}-{suffix:04x}"))
    }
}

impl CartBackend for GuestCartBackend {
    async fn upsert(&self, draft: NewLineItem) -> Result<LineItem, RepositoryError> {
        let mut items = self.read_items()?;

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
            let updated = existing.clone();
            self.write_items(&items)?;
            return Ok(updated);
        }

        let item = draft.into_line_item(Self::generate_id());
        items.push(item.clone());
        self.write_items(&items)?;
        Ok(item)
    }

    async fn remove(&self, owner: &OwnerId, id: &LineItemId) -> Result<(), RepositoryError> {
        let mut items = self.read_items()?;
        let before = items.len();
        items.retain(|item| !(item.owner_id == *owner && item.id == *id));

        // Absent IDs are a no-op; skip the write when nothing changed.
        if items.len() != before {
            self.write_items(&items)?;
        }
        Ok(())
    }

    async fn set_quantity(
        &self,
        owner: &OwnerId,
        id: &LineItemId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let mut items = self.read_items()?;

        if let Some(item) = items
            .iter_mut()
            .find(|item| item.owner_id == *owner && item.id == *id)
        {
            item.quantity = quantity;
            self.write_items(&items)?;
        }
        Ok(())
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<LineItem>, RepositoryError> {
        let items = self.read_items()?;
        Ok(items
            .into_iter()
            .filter(|item| item.owner_id == *owner)
            .collect())
    }

    async fn clear(&self, owner: &OwnerId) -> Result<(), RepositoryError> {
        let mut items = self.read_items()?;
        items.retain(|item| item.owner_id != *owner);

        if items.is_empty() {
            self.storage.clear()
        } else {
            self.write_items(&items)
        }
    }
}
