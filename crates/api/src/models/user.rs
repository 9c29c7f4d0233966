//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;

use freshcart_core::{CartItems, Email, UserId};

use crate::db::RepositoryError;

/// A registered customer (domain type).
///
/// The password hash is never part of this type; it is only read by the
/// login path through [`crate::db::users::UserRepository::get_password_hash`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Persisted cart, product ID to quantity.
    pub cart_items: CartItems,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

/// Raw `users` row.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub cart_items: Json<CartItems>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            cart_items: row.cart_items.0,
            created_at: row.created_at,
        })
    }
}
