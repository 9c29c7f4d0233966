//! Business logic services for the FreshCart API.
//!
//! # Services
//!
//! - `auth` - Registration, login, seller credentials, tokens and the token cache
//! - `catalog` - Product listings (cached) and seller catalog management
//! - `cart` - Server-side cart persistence and totals
//! - `orders` - Order placement, listings, status updates and payment webhooks

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
