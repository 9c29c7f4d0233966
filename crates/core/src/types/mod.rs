//! Core types for FreshCart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod product_price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use product_price::{MAX_AMOUNT, ProductPrice, ProductPriceError};
pub use status::*;
