//! Cart line quantity.
//!
//! A [`Quantity`] is always at least one. Arithmetic saturates at the floor
//! instead of producing zero, so decrementing a single item is a no-op.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Cart lines cannot hold zero items.
    #[error("quantity must be at least 1")]
    Zero,
}

/// Number of units of a product on a cart line (`>= 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] if `n` is zero.
    pub const fn new(n: u32) -> Result<Self, QuantityError> {
        if n == 0 {
            Err(QuantityError::Zero)
        } else {
            Ok(Self(n))
        }
    }

    /// Get the underlying count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Apply a signed delta, clamping to `1..=u32::MAX`.
    ///
    /// ```
    /// use shopline_core::Quantity;
    ///
    /// let three = Quantity::new(3).unwrap();
    /// assert_eq!(three.offset(-1000), Quantity::ONE);
    /// assert_eq!(three.offset(2).get(), 5);
    /// ```
    #[must_use]
    pub fn offset(self, delta: i64) -> Self {
        let next = i64::from(self.0).saturating_add(delta).max(1);
        Self(u32::try_from(next).unwrap_or(u32::MAX))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
