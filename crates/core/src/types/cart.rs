//! Cart types.
//!
//! The backend holds the authoritative cart as a list of
//! `{ productId, quantity }` pairs. [`EnrichedCartLine`] is the display form:
//! a cart line joined with its catalog product.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Product, ProductId, Quantity};

/// A line of the server-held cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl CartLine {
    /// Create a cart line.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedCartLine {
    pub product: Product,
    pub quantity: Quantity,
}

impl EnrichedCartLine {
    /// Product key of this line.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }
}
