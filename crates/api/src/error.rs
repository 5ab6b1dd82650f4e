//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{AuthError, InventoryError, OrderError};
use saga::{ExecutionError, StepError};
use store::StoreError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Order service error.
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Order(err) => order_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    let status = match &err {
        OrderError::Auth(AuthError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        OrderError::Auth(_) => StatusCode::UNAUTHORIZED,
        OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
        OrderError::InvalidAddress(_) | OrderError::InvalidQuantity { .. } | OrderError::NoItems => {
            StatusCode::BAD_REQUEST
        }
        OrderError::OrderNotFound(_) | OrderError::AddressNotFound(_) => StatusCode::NOT_FOUND,
        OrderError::InvalidState { .. } => StatusCode::CONFLICT,
        OrderError::PlacementFailed(failure) | OrderError::CancellationFailed(failure) => {
            step_failure_status(failure, err.inventory_cause())
        }
        OrderError::Saga(_) | OrderError::Store(_) => {
            tracing::error!(error = %err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// Business rejections are 422; a step that timed out or lost a backend is
/// reported as a gateway or availability failure.
fn step_failure_status(
    failure: &ExecutionError,
    inventory: Option<&InventoryError>,
) -> StatusCode {
    match (&failure.error, inventory) {
        (StepError::DeadlineExceeded, _) => StatusCode::GATEWAY_TIMEOUT,
        (StepError::Cancelled, _) => StatusCode::SERVICE_UNAVAILABLE,
        (_, Some(InventoryError::Unavailable(_))) => StatusCode::SERVICE_UNAVAILABLE,
        (_, Some(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        (error, None) if error.downcast_ref::<StoreError>().is_some() => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{OrderId, ProductId};
    use store::OrderStatus;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    fn placement_failed(error: StepError) -> OrderError {
        OrderError::PlacementFailed(ExecutionError {
            step: "decrement inventory 0".to_string(),
            index: 4,
            error,
        })
    }

    #[test]
    fn test_client_errors_map_to_4xx() {
        assert_eq!(
            status_of(OrderError::Auth(AuthError::MissingToken)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(OrderError::Forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(status_of(OrderError::NoItems), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(OrderError::OrderNotFound(OrderId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(OrderError::InvalidState {
                order_id: OrderId::new(1),
                status: OrderStatus::Handled,
                expected: OrderStatus::Waiting,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::BadRequest("bad id".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_backend_failures_map_to_5xx() {
        assert_eq!(
            status_of(OrderError::Store(StoreError::Unavailable("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(OrderError::Auth(AuthError::Unavailable("down".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_business_rejections_map_to_422() {
        let short = InventoryError::InsufficientStock {
            product_id: ProductId::new(7),
            available: 1,
            requested: 3,
        };
        assert_eq!(
            status_of(placement_failed(StepError::from_source(short))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(placement_failed(StepError::failed("rejected"))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_infrastructure_step_failures_map_to_5xx() {
        assert_eq!(
            status_of(placement_failed(StepError::DeadlineExceeded)),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(placement_failed(StepError::Cancelled)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(placement_failed(StepError::from_source(
                InventoryError::Unavailable("down".into())
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(OrderError::CancellationFailed(ExecutionError {
                step: "mark cancelled".to_string(),
                index: 0,
                error: StepError::from_source(StoreError::Unavailable("down".into())),
            })),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
