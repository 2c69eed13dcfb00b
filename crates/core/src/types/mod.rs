//! Core types for Shopline.
//!
//! This module provides type-safe wrappers for the storefront's domain
//! concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod identity;
pub mod price;
pub mod product;
pub mod quantity;

pub use cart::{CartLine, EnrichedCartLine};
pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{Identity, Role};
pub use price::{Price, PriceError};
pub use product::{Category, Product, ProductImage};
pub use quantity::{Quantity, QuantityError};
