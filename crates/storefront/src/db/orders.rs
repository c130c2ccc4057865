//! Order repository.
//!
//! Orders are frozen cart snapshots: after creation only `payment_status`
//! (and its processor reference) ever changes, and rows are never deleted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use mangaba_core::{
    Money, NewOrder, Order, OrderId, OrderItem, OrderStatus, OwnerId, PaymentMethod,
    PaymentStatus, ProductId, Quantity, ShippingAddress, Variant,
};

use super::RepositoryError;

/// Persistence seam for orders.
///
/// The checkout orchestrator and the CLI both talk to this trait; tests use
/// an in-memory implementation.
pub trait OrderStore: Send + Sync {
    /// Persist a new order with `pending` / `awaiting_payment` status.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Fetch one order.
    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// All orders for a customer, newest first.
    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<Order>, RepositoryError>;

    /// Transition the payment status, optionally attaching a processor
    /// reference.
    async fn update_payment_status(
        &self,
        id: &OrderId,
        status: PaymentStatus,
        reference: Option<&str>,
    ) -> Result<(), RepositoryError>;
}

/// Order repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order repository over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row type for `storefront.orders`.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    owner_id: String,
    status: String,
    payment_status: String,
    payment_method: String,
    payment_reference: Option<String>,
    recipient: String,
    street: String,
    number: String,
    complement: Option<String>,
    district: String,
    city: String,
    state: String,
    postal_code: String,
    subtotal: Decimal,
    shipping: Decimal,
    discount: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
}

/// Row type for `storefront.order_items`.
#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: String,
    product_name: String,
    size: Option<String>,
    color: Option<String>,
    unit_price: Decimal,
    quantity: i32,
}

impl OrderRow {
    fn try_into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status: OrderStatus = self.status.parse().map_err(|e: String| {
            RepositoryError::DataCorruption(format!("order {}: {e}", self.id))
        })?;
        let payment_status: PaymentStatus = self.payment_status.parse().map_err(|e: String| {
            RepositoryError::DataCorruption(format!("order {}: {e}", self.id))
        })?;
        let payment_method: PaymentMethod = self.payment_method.parse().map_err(|e: String| {
            RepositoryError::DataCorruption(format!("order {}: {e}", self.id))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            owner_id: OwnerId::new(self.owner_id),
            items,
            shipping_address: ShippingAddress {
                recipient: self.recipient,
                street: self.street,
                number: self.number,
                complement: self.complement,
                district: self.district,
                city: self.city,
                state: self.state,
                postal_code: self.postal_code,
            },
            payment_method,
            status,
            payment_status,
            payment_reference: self.payment_reference,
            subtotal: Money::new(self.subtotal),
            shipping: Money::new(self.shipping),
            discount: Money::new(self.discount),
            total: Money::new(self.total),
            created_at: self.created_at,
        })
    }
}

impl OrderItemRow {
    fn try_into_order_item(self) -> Result<OrderItem, RepositoryError> {
        let quantity = u32::try_from(self.quantity)
            .ok()
            .and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "invalid quantity {} on order {}",
                    self.quantity, self.order_id
                ))
            })?;

        Ok(OrderItem {
            product_id: ProductId::new(self.product_id),
            product_name: self.product_name,
            variant: Variant {
                size: self.size,
                color: self.color,
            },
            unit_price: Money::new(self.unit_price),
            quantity,
        })
    }
}

const ORDER_COLUMNS: &str = "id, owner_id, status, payment_status, payment_method, \
     payment_reference, recipient, street, number, complement, district, city, state, \
     postal_code, subtotal, shipping, discount, total, created_at";

const ORDER_ITEM_COLUMNS: &str =
    "order_id, product_id, product_name, size, color, unit_price, quantity";

impl PgOrderStore {
    async fn items_for(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItemRow>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM storefront.order_items WHERE order_id = ANY($1)"
        );

        Ok(sqlx::query_as(&sql)
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?)
    }
}

impl OrderStore for PgOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let id = OrderId::generate();
        let status = OrderStatus::Pending;
        let payment_status = PaymentStatus::AwaitingPayment;

        let mut tx = self.pool.begin().await?;

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO storefront.orders \
             (id, owner_id, status, payment_status, payment_method, recipient, street, number, \
              complement, district, city, state, postal_code, subtotal, shipping, discount, total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING created_at",
        )
        .bind(id.as_uuid())
        .bind(order.owner_id.as_str())
        .bind(status.to_string())
        .bind(payment_status.to_string())
        .bind(order.payment_method.to_string())
        .bind(&order.shipping_address.recipient)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.number)
        .bind(&order.shipping_address.complement)
        .bind(&order.shipping_address.district)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.state)
        .bind(&order.shipping_address.postal_code)
        .bind(order.subtotal.amount())
        .bind(order.shipping.amount())
        .bind(order.discount.amount())
        .bind(order.total.amount())
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            let quantity = i32::try_from(item.quantity.get()).map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "quantity {} out of range for storage",
                    item.quantity
                ))
            })?;

            sqlx::query(
                "INSERT INTO storefront.order_items \
                 (order_id, product_id, product_name, size, color, unit_price, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(&item.product_name)
            .bind(&item.variant.size)
            .bind(&item.variant.color)
            .bind(item.unit_price.amount())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id,
            owner_id: order.owner_id,
            items: order.items,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            status,
            payment_status,
            payment_reference: None,
            subtotal: order.subtotal,
            shipping: order.shipping,
            discount: order.discount,
            total: order.total,
            created_at,
        })
    }

    async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = $1");

        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let items = self
                    .items_for(&[row.id])
                    .await?
                    .into_iter()
                    .map(OrderItemRow::try_into_order_item)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(row.try_into_order(items)?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders \
             WHERE owner_id = $1 ORDER BY created_at DESC"
        );

        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item_row in self.items_for(&ids).await? {
            let order_id = item_row.order_id;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(item_row.try_into_order_item()?);
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.try_into_order(items)
            })
            .collect()
    }

    async fn update_payment_status(
        &self,
        id: &OrderId,
        status: PaymentStatus,
        reference: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.orders \
             SET payment_status = $2, \
                 payment_reference = COALESCE($3, payment_reference) \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.to_string())
        .bind(reference)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("order {id}")));
        }

        Ok(())
    }
}
