//! Shipping address lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::AddressId;
use store::{Address, Repository};

use super::{AppState, parse_id};
use crate::error::ApiError;

/// GET /addresses/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Address>, ApiError> {
    let address_id: AddressId = parse_id(&id)?;
    Ok(Json(state.orders.get_address(address_id).await?))
}
