//! Domain models for the FreshCart API.
//!
//! Each submodule pairs a database row type (`sqlx::FromRow`) with the
//! validated domain type handlers work with, plus the request payloads that
//! create them.

pub mod address;
pub mod order;
pub mod product;
pub mod user;

pub use address::{Address, AddressError, NewAddress};
pub use order::{Order, OrderLineView, OrderView};
pub use product::{NewProduct, Product, ProductError, ProductSummary};
pub use user::User;
