//! Cart pricing rules.
//!
//! Pure arithmetic over a cart snapshot; no I/O and no failure modes. Totals
//! are always recomputed from the current line items, never cached, so they
//! cannot drift from the cart contents.

use mangaba_core::{LineItem, Money};
use serde::Serialize;

/// Subtotal at or above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(19_900);

/// Flat shipping fee charged below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Money = Money::from_cents(1_990);

/// Derived totals for a cart snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingResult {
    /// Sum of `unit_price × quantity` over all lines.
    pub subtotal: Money,
    /// Flat fee, or zero at or above the free-shipping threshold.
    pub shipping: Money,
    /// Discount applied against subtotal plus shipping.
    pub discount: Money,
    /// `max(0, subtotal + shipping - discount)`.
    pub total: Money,
}

/// Compute the totals for a cart snapshot.
///
/// Shipping is a step function with a single breakpoint: free at or above
/// [`FREE_SHIPPING_THRESHOLD`], the flat fee below it. An empty cart ships
/// nothing and is charged no shipping. The total is clamped at zero so an
/// oversized discount can never produce a negative amount due; a negative
/// discount is treated as no discount.
#[must_use]
pub fn quote(items: &[LineItem], discount: Money) -> PricingResult {
    let subtotal: Money = items.iter().map(LineItem::line_total).sum();

    let shipping = if items.is_empty() || subtotal >= FREE_SHIPPING_THRESHOLD {
        Money::ZERO
    } else {
        FLAT_SHIPPING_FEE
    };

    let discount = if discount.is_negative() {
        Money::ZERO
    } else {
        discount
    };

    let total = (subtotal + shipping).saturating_sub(discount);

    PricingResult {
        subtotal,
        shipping,
        discount,
        total,
    }
}
