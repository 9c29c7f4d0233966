//! Shipping addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use freshcart_core::{AddressId, UserId};

/// A stored shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub region: String,
    pub zipcode: String,
    pub country: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Address validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Address fields as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

impl NewAddress {
    /// Trim every field and reject blanks.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingField`] naming the first empty field.
    pub fn validate(self) -> Result<Self, AddressError> {
        Ok(Self {
            first_name: required("firstName", &self.first_name)?,
            last_name: required("lastName", &self.last_name)?,
            street: required("street", &self.street)?,
            city: required("city", &self.city)?,
            region: required("region", &self.region)?,
            zipcode: required("zipcode", &self.zipcode)?,
            country: required("country", &self.country)?,
            phone: required("phone", &self.phone)?,
        })
    }
}

fn required(name: &'static str, value: &str) -> Result<String, AddressError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AddressError::MissingField(name));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> NewAddress {
        serde_json::from_value(serde_json::json!({
            "firstName": " Ada ",
            "lastName": "Lovelace",
            "street": "12 Analytical Way",
            "city": "Kingston",
            "region": "St. Andrew",
            "zipcode": "00010",
            "country": "Jamaica",
            "phone": "+1 876 555 0100"
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_trims_fields() {
        let address = sample().validate().unwrap();
        assert_eq!(address.first_name, "Ada");
        assert_eq!(address.zipcode, "00010");
        assert_eq!(address.phone, "+1 876 555 0100");
    }

    #[test]
    fn test_validate_rejects_blank_field() {
        let mut address = sample();
        address.city = "   ".to_owned();
        assert_eq!(
            address.validate().unwrap_err(),
            AddressError::MissingField("city")
        );
    }

    #[test]
    fn test_missing_field_defaults_to_blank() {
        let address: NewAddress =
            serde_json::from_value(serde_json::json!({ "firstName": "Ada" })).unwrap();
        assert_eq!(
            address.validate().unwrap_err(),
            AddressError::MissingField("lastName")
        );
    }
}
