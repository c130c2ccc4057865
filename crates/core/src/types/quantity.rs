//! Line item quantity with a floor of one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantities start at one; removal is a separate operation.
    #[error("quantity must be at least 1")]
    Zero,
}

/// A cart line item quantity.
///
/// Never zero or negative: a line item with nothing in it does not exist, and
/// removal is an explicit operation rather than an update to quantity zero.
/// The constructor enforces the floor so the invariant cannot be bypassed by
/// deserialization either.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Quantity of one.
    pub const ONE: Self = Self(1);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] if `value` is zero.
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            Err(QuantityError::Zero)
        } else {
            Ok(Self(value))
        }
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add two quantities, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert!(Quantity::new(1).is_ok());
    }

    #[test]
    fn test_zero_is_rejected_on_deserialize() {
        let result: Result<Quantity, _> = serde_json::from_str("0");
        assert!(result.is_err());

        let three: Quantity = serde_json::from_str("3").expect("valid quantity");
        assert_eq!(three.get(), 3);
    }

    #[test]
    fn test_checked_add() {
        let two = Quantity::new(2).expect("valid");
        let one = Quantity::ONE;

        assert_eq!(two.checked_add(one), Quantity::new(3).ok());
        assert_eq!(Quantity(u32::MAX).checked_add(one), None);
    }
}
