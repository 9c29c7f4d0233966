//! Address repository.

use sqlx::PgPool;

use freshcart_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::{Address, NewAddress};

const ADDRESS_COLUMNS: &str = "id, user_id, first_name, last_name, street, city, region, \
                               zipcode, country, phone, created_at";

/// Repository for shipping addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a validated address for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO addresses \
                 (user_id, first_name, last_name, street, city, region, zipcode, country, phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&address.first_name)
        .bind(&address.last_name)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.region)
        .bind(&address.zipcode)
        .bind(&address.country)
        .bind(&address.phone)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// All addresses belonging to a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetch several addresses by ID in one query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[AddressId]) -> Result<Vec<Address>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(AddressId::as_i32).collect();

        let rows = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
