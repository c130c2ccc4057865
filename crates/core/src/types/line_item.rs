//! Cart line item domain types.
//!
//! A line item is one product-variant configuration in a cart. The tuple
//! `(owner_id, product_id, size, color)` is the natural key: a cart never
//! holds two line items for the same configuration, so adding an existing
//! configuration increments the quantity instead.

use serde::{Deserialize, Serialize};

use crate::types::id::{LineItemId, OwnerId, ProductId};
use crate::types::money::Money;
use crate::types::quantity::Quantity;

/// Errors that can occur when constructing a [`NewLineItem`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineItemError {
    /// The product reference is blank.
    #[error("product id cannot be blank")]
    BlankProductId,
    /// The snapshotted unit price is below zero.
    #[error("unit price cannot be negative")]
    NegativeUnitPrice,
}

/// Free-text variant selectors for a line item.
///
/// Size and color come straight from the product page; together with the
/// product ID they identify one line item within a cart. Blank selectors are
/// normalized to `None` so `"", None` and whitespace all mean "no selection".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    /// Selected size, if the product has sizes.
    pub size: Option<String>,
    /// Selected color, if the product has colors.
    pub color: Option<String>,
}

impl Variant {
    /// Create a variant selection, normalizing blank selectors to `None`.
    #[must_use]
    pub fn new(size: Option<&str>, color: Option<&str>) -> Self {
        Self {
            size: normalize(size),
            color: normalize(color),
        }
    }

    /// A variant with no selections.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            size: None,
            color: None,
        }
    }
}

fn normalize(selector: Option<&str>) -> Option<String> {
    selector
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// One product-variant entry in a cart.
///
/// `unit_price` is a snapshot of the catalog price at the time the item was
/// added; it is not re-validated against the live catalog on reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique within a cart. Backend-assigned for remote items, locally
    /// generated for guest items.
    pub id: LineItemId,
    /// The shopper this item belongs to (guest pseudo-id or customer id).
    pub owner_id: OwnerId,
    /// Catalog reference.
    pub product_id: ProductId,
    /// Product name snapshot for display.
    pub product_name: String,
    /// Product image snapshot for display.
    pub image_url: Option<String>,
    /// Variant selection; part of the natural key.
    pub variant: Variant,
    /// Catalog price snapshot at add time.
    pub unit_price: Money,
    /// How many units; at least one.
    pub quantity: Quantity,
}

impl LineItem {
    /// Price of this line: `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity.get()
    }

    /// Whether this item occupies the natural-key slot for the given
    /// product-variant configuration.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, variant: &Variant) -> bool {
        self.product_id == *product_id && self.variant == *variant
    }
}

/// A validated draft line item, ready for a cart backend to persist.
///
/// Carries no ID: each backend assigns its own when inserting, and an upsert
/// that lands on an existing natural key keeps that row's ID and price
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    /// The shopper this item belongs to.
    pub owner_id: OwnerId,
    /// Catalog reference.
    pub product_id: ProductId,
    /// Product name snapshot.
    pub product_name: String,
    /// Product image snapshot.
    pub image_url: Option<String>,
    /// Variant selection.
    pub variant: Variant,
    /// Catalog price snapshot.
    pub unit_price: Money,
    /// Units to add; at least one.
    pub quantity: Quantity,
}

impl NewLineItem {
    /// Create a validated draft line item.
    ///
    /// # Errors
    ///
    /// Returns [`LineItemError::BlankProductId`] if the product ID is empty or
    /// whitespace, and [`LineItemError::NegativeUnitPrice`] if the price
    /// snapshot is below zero.
    pub fn new(
        owner_id: OwnerId,
        product_id: ProductId,
        product_name: impl Into<String>,
        image_url: Option<String>,
        variant: Variant,
        unit_price: Money,
        quantity: Quantity,
    ) -> Result<Self, LineItemError> {
        if product_id.as_str().trim().is_empty() {
            return Err(LineItemError::BlankProductId);
        }
        if unit_price.is_negative() {
            return Err(LineItemError::NegativeUnitPrice);
        }

        Ok(Self {
            owner_id,
            product_id,
            product_name: product_name.into(),
            image_url,
            variant,
            unit_price,
            quantity,
        })
    }

    /// Materialize the draft into a [`LineItem`] with a backend-assigned ID.
    #[must_use]
    pub fn into_line_item(self, id: LineItemId) -> LineItem {
        LineItem {
            id,
            owner_id: self.owner_id,
            product_id: self.product_id,
            product_name: self.product_name,
            image_url: self.image_url,
            variant: self.variant,
            unit_price: self.unit_price,
            quantity: self.quantity,
        }
    }
}
