//! Order domain types.
//!
//! An order is a frozen snapshot of a cart at checkout time. Once created it
//! is immutable except for payment-status transitions; orders are never
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{OrderId, OwnerId, ProductId};
use crate::types::line_item::{LineItem, Variant};
use crate::types::money::Money;
use crate::types::quantity::Quantity;

/// Order fulfillment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting processing.
    #[default]
    Pending,
    /// Being prepared for shipment.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Delivered to the shopper.
    Delivered,
    /// Cancelled before shipment.
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment lifecycle, tracked separately from fulfillment.
///
/// Orders are created `awaiting_payment`; a processor confirmation (card) or
/// a manual confirmation (pix, boleto) moves them to `paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment has not been confirmed yet.
    #[default]
    AwaitingPayment,
    /// Payment confirmed.
    Paid,
    /// Payment returned to the shopper.
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingPayment => "awaiting_payment",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "paid" => Ok(Self::Paid),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

/// How the shopper pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment captured by the processor.
    Card,
    /// Instant bank transfer; paid out of band against a generated code.
    Pix,
    /// Bank slip; paid out of band within its due date.
    Boleto,
}

impl PaymentMethod {
    /// Whether this method is captured by the payment processor.
    ///
    /// Methods that are not captured are settled out of band: the shopper is
    /// shown instructions and the order stays `awaiting_payment` until a
    /// manual confirmation.
    #[must_use]
    pub const fn requires_capture(self) -> bool {
        matches!(self, Self::Card)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Card => "card",
            Self::Pix => "pix",
            Self::Boleto => "boleto",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "pix" => Ok(Self::Pix),
            "boleto" => Ok(Self::Boleto),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Shipping address collected at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Who receives the package.
    pub recipient: String,
    /// Street name.
    pub street: String,
    /// Street number.
    pub number: String,
    /// Apartment, suite, etc.
    pub complement: Option<String>,
    /// Neighborhood.
    pub district: String,
    /// City.
    pub city: String,
    /// State code (e.g., "SP").
    pub state: String,
    /// Postal code (CEP).
    pub postal_code: String,
}

/// One product line frozen onto an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Catalog reference at order time.
    pub product_id: ProductId,
    /// Product name snapshot.
    pub product_name: String,
    /// Variant selection.
    pub variant: Variant,
    /// Unit price the shopper was charged.
    pub unit_price: Money,
    /// Units ordered.
    pub quantity: Quantity,
}

impl From<LineItem> for OrderItem {
    fn from(item: LineItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name,
            variant: item.variant,
            unit_price: item.unit_price,
            quantity: item.quantity,
        }
    }
}

/// A placed order (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// The customer who placed the order.
    pub owner_id: OwnerId,
    /// Frozen cart lines.
    pub items: Vec<OrderItem>,
    /// Where the order ships.
    pub shipping_address: ShippingAddress,
    /// Selected payment method.
    pub payment_method: PaymentMethod,
    /// Fulfillment status.
    pub status: OrderStatus,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Opaque processor reference, once one exists.
    pub payment_reference: Option<String>,
    /// Sum of line totals at order time.
    pub subtotal: Money,
    /// Shipping charged.
    pub shipping: Money,
    /// Discount applied.
    pub discount: Money,
    /// Amount due: `max(0, subtotal + shipping - discount)`.
    pub total: Money,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

/// A new order ready to be persisted.
///
/// Totals are computed server-side from the cart snapshot at creation time;
/// client-supplied totals are never trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// The customer placing the order.
    pub owner_id: OwnerId,
    /// Frozen cart lines.
    pub items: Vec<OrderItem>,
    /// Where the order ships.
    pub shipping_address: ShippingAddress,
    /// Selected payment method.
    pub payment_method: PaymentMethod,
    /// Sum of line totals.
    pub subtotal: Money,
    /// Shipping charged.
    pub shipping: Money,
    /// Discount applied.
    pub discount: Money,
    /// Amount due.
    pub total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::AwaitingPayment).expect("serializes"),
            "\"awaiting_payment\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).expect("serializes"),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Pix).expect("serializes"),
            "\"pix\""
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            PaymentStatus::AwaitingPayment,
            PaymentStatus::Paid,
            PaymentStatus::Refunded,
        ] {
            let parsed: PaymentStatus = status.to_string().parse().expect("parses");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_capture_requirement() {
        assert!(PaymentMethod::Card.requires_capture());
        assert!(!PaymentMethod::Pix.requires_capture());
        assert!(!PaymentMethod::Boleto.requires_capture());
    }
}
