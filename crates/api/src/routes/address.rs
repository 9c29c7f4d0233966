//! Address handlers.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::addresses::AddressRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{Address, NewAddress};
use crate::response::ApiResponse;
use crate::state::AppState;

use super::JsonBody;

#[derive(Debug, Deserialize)]
pub struct AddAddressRequest {
    pub address: NewAddress,
}

#[derive(Debug, Serialize)]
pub struct AddressPayload {
    pub address: Address,
}

#[derive(Debug, Serialize)]
pub struct AddressesPayload {
    pub addresses: Vec<Address>,
}

/// `POST /api/address/add`
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    JsonBody(body): JsonBody<AddAddressRequest>,
) -> Result<ApiResponse<AddressPayload>, AppError> {
    let address = body.address.validate()?;
    let address = AddressRepository::new(state.pool())
        .create(user_id, &address)
        .await?;

    tracing::info!(address_id = %address.id, "Address added");
    Ok(ApiResponse::ok(AddressPayload { address }).with_message("Address added successfully"))
}

/// `GET /api/address/get`
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<ApiResponse<AddressesPayload>, AppError> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user_id)
        .await?;
    Ok(ApiResponse::ok(AddressesPayload { addresses }))
}
