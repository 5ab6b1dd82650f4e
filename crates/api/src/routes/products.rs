//! Per-product sales figures.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use domain::ProductId;
use serde::Serialize;
use store::Repository;

use super::{AppState, parse_id, request_metadata};
use crate::error::ApiError;

#[derive(Serialize)]
pub struct SoldResponse {
    pub product_id: ProductId,
    pub sold: i64,
}

#[derive(Serialize)]
pub struct PurchasedResponse {
    pub product_id: ProductId,
    pub purchased: bool,
}

/// GET /products/{id}/sold counts units in handled orders.
#[tracing::instrument(skip(state))]
pub async fn sold<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SoldResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id)?;
    let sold = state.orders.sold_count(product_id).await?;
    Ok(Json(SoldResponse { product_id, sold }))
}

/// GET /products/{id}/purchased tells whether the caller has bought the product.
#[tracing::instrument(skip(state, headers))]
pub async fn purchased<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PurchasedResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id)?;
    let purchased = state
        .orders
        .has_purchased(&request_metadata(&headers), product_id)
        .await?;
    Ok(Json(PurchasedResponse {
        product_id,
        purchased,
    }))
}
