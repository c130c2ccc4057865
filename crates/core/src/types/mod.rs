//! Core types for Mangaba.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod line_item;
pub mod money;
pub mod order;
pub mod quantity;

pub use id::*;
pub use line_item::{LineItem, LineItemError, NewLineItem, Variant};
pub use money::Money;
pub use order::{
    NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
pub use quantity::{Quantity, QuantityError};
