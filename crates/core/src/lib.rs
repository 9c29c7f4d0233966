//! FreshCart Core - Shared types and pricing rules.
//!
//! This crate provides the domain vocabulary used across all FreshCart components:
//! - `api` - JSON REST API for the storefront client and seller dashboard
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Order totals are computed here so that the API, the
//! CLI and the tests all agree on the same arithmetic.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, order status and product pricing
//! - [`pricing`] - Cart totals and order line pricing with tax

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::*;
pub use types::*;
