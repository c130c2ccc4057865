//! Remote cart repository for authenticated shoppers.
//!
//! One row per natural key `(owner_id, product_id, size, color)`, enforced
//! by a unique index. Adds go through a single upsert statement so two
//! concurrent adds of the same configuration converge on one row with the
//! summed quantity - the database serializes the increment, there is no
//! read-then-insert window to race through. This also covers concurrent
//! mutation from two sessions of the same owner.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use mangaba_core::{LineItem, LineItemId, Money, NewLineItem, OwnerId, ProductId, Quantity, Variant};

use super::RepositoryError;
use crate::cart::CartBackend;

/// Cart backend backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgCartBackend {
    pool: PgPool,
}

/// Row type for `storefront.cart_items`.
#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: String,
    owner_id: String,
    product_id: String,
    product_name: String,
    image_url: Option<String>,
    size: Option<String>,
    color: Option<String>,
    unit_price: Decimal,
    quantity: i32,
}

impl CartItemRow {
    /// Map a database row into the domain type.
    fn try_into_line_item(self) -> Result<LineItem, RepositoryError> {
        let quantity = u32::try_from(self.quantity)
            .ok()
            .and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "invalid quantity {} on cart item {}",
                    self.quantity, self.id
                ))
            })?;

        Ok(LineItem {
            id: LineItemId::new(self.id),
            owner_id: OwnerId::new(self.owner_id),
            product_id: ProductId::new(self.product_id),
            product_name: self.product_name,
            image_url: self.image_url,
            variant: Variant {
                size: self.size,
                color: self.color,
            },
            unit_price: Money::new(self.unit_price),
            quantity,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, owner_id, product_id, product_name, image_url, size, color, unit_price, quantity";

impl PgCartBackend {
    /// Create a new cart backend over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CartBackend for PgCartBackend {
    async fn upsert(&self, draft: NewLineItem) -> Result<LineItem, RepositoryError> {
        let quantity = i32::try_from(draft.quantity.get()).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "quantity {} out of range for storage",
                draft.quantity
            ))
        })?;

        // The conflict target matches the natural-key unique index; on
        // conflict the existing row keeps its id and price snapshot and only
        // the quantity grows.
        let sql = format!(
            "INSERT INTO storefront.cart_items \
             (id, owner_id, product_id, product_name, image_url, size, color, unit_price, quantity) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (owner_id, product_id, COALESCE(size, ''), COALESCE(color, '')) \
             DO UPDATE SET quantity = storefront.cart_items.quantity + EXCLUDED.quantity, \
                           updated_at = now() \
             RETURNING {SELECT_COLUMNS}"
        );

        let row: CartItemRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(draft.owner_id.as_str())
            .bind(draft.product_id.as_str())
            .bind(&draft.product_name)
            .bind(&draft.image_url)
            .bind(&draft.variant.size)
            .bind(&draft.variant.color)
            .bind(draft.unit_price.amount())
            .bind(quantity)
            .fetch_one(&self.pool)
            .await?;

        row.try_into_line_item()
    }

    async fn remove(&self, owner: &OwnerId, id: &LineItemId) -> Result<(), RepositoryError> {
        // Idempotent: deleting an absent id affects zero rows and succeeds.
        sqlx::query("DELETE FROM storefront.cart_items WHERE owner_id = $1 AND id = $2")
            .bind(owner.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_quantity(
        &self,
        owner: &OwnerId,
        id: &LineItemId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(quantity.get()).map_err(|_| {
            RepositoryError::DataCorruption(format!("quantity {quantity} out of range for storage"))
        })?;

        sqlx::query(
            "UPDATE storefront.cart_items \
             SET quantity = $3, updated_at = now() \
             WHERE owner_id = $1 AND id = $2",
        )
        .bind(owner.as_str())
        .bind(id.as_str())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<LineItem>, RepositoryError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM storefront.cart_items WHERE owner_id = $1"
        );

        let rows: Vec<CartItemRow> = sqlx::query_as(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(CartItemRow::try_into_line_item)
            .collect()
    }

    async fn clear(&self, owner: &OwnerId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart_items WHERE owner_id = $1")
            .bind(owner.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
