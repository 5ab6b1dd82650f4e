//! Order placement, cancellation, handling and listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use domain::{
    LineItem, OrderId, OrderView, PlaceOrder, PlacedOrder, ProductId, ShippingAddress, UserId,
};
use serde::Deserialize;
use store::{Order, OrderStatus, Repository};

use super::{AppState, parse_id, request_metadata};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub address: AddressRequest,
    pub items: Vec<LineItemRequest>,
}

#[derive(Deserialize)]
pub struct AddressRequest {
    pub name: String,
    pub phone: String,
    pub detail: String,
}

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub supplier_id: UserId,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// `?status=` filter for listings; absent means `waiting`.
#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl PlaceOrderRequest {
    fn into_command(self) -> Result<PlaceOrder, ApiError> {
        let address = ShippingAddress::new(
            self.address.name,
            self.address.phone,
            self.address.detail,
        )?;
        let items = self
            .items
            .into_iter()
            .map(|item| LineItem::new(item.product_id, item.supplier_id, item.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PlaceOrder::new(address, items)?)
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse()
        .map_err(|e: store::StoreError| ApiError::BadRequest(e.to_string()))
}

impl StatusQuery {
    fn status(&self) -> Result<OrderStatus, ApiError> {
        self.status
            .as_deref()
            .map_or(Ok(OrderStatus::Waiting), parse_status)
    }
}

// -- Handlers --

/// POST /orders places an order for the calling customer.
#[tracing::instrument(skip(state, headers, req))]
pub async fn place<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let command = req.into_command()?;
    let ctx = state.request_context();
    let placed = state
        .orders
        .place_order(&request_metadata(&headers), command, &ctx)
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// DELETE /orders/{id} cancels a waiting order and returns its stock.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let ctx = state.request_context();
    let order = state
        .orders
        .cancel_order(&request_metadata(&headers), order_id, &ctx)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/handle
#[tracing::instrument(skip(state, headers))]
pub async fn handle<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let order = state
        .orders
        .handle_order(&request_metadata(&headers), order_id)
        .await?;
    Ok(Json(order))
}

/// PUT /orders/{id}/status
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<StatusCode, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let status = parse_status(&req.status)?;
    state.orders.update_status(order_id, status).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /orders/customer lists the caller's orders.
#[tracing::instrument(skip(state, headers, query))]
pub async fn customer<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<StatusQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let status = query.status()?;
    let orders = state
        .orders
        .customer_orders(&request_metadata(&headers), status)
        .await?;
    Ok(Json(orders))
}

/// GET /orders/supplier lists orders addressed to the calling supplier.
#[tracing::instrument(skip(state, headers, query))]
pub async fn supplier<S: Repository + ?Sized + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<StatusQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let status = query.status()?;
    let orders = state
        .orders
        .supplier_orders(&request_metadata(&headers), status)
        .await?;
    Ok(Json(orders))
}
