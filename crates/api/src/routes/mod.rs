//! HTTP route handlers and the state they share.

pub mod addresses;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderMap;
use domain::{OrderService, RequestMetadata};
use saga::ExecutionContext;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ?Sized> {
    pub orders: OrderService<S>,
    /// Deadline applied to each request's saga.
    pub saga_timeout: Duration,
}

impl<S: ?Sized> AppState<S> {
    /// A fresh context for one request, bounded by the saga timeout.
    pub fn request_context(&self) -> ExecutionContext {
        ExecutionContext::with_timeout(self.saga_timeout)
    }
}

/// Copies the request headers the auth service may look at.
pub(crate) fn request_metadata(headers: &HeaderMap) -> RequestMetadata {
    let mut metadata = RequestMetadata::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            metadata.insert(name.as_str(), value);
        }
    }
    metadata
}

/// Parses a numeric row id from a path segment.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid ID format: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::AUTHORIZATION;
    use domain::OrderId;

    #[test]
    fn test_metadata_carries_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        let metadata = request_metadata(&headers);
        assert_eq!(metadata.bearer_token(), Some("abc"));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id::<OrderId>("12").unwrap(), OrderId::new(12));
        assert!(matches!(
            parse_id::<OrderId>("twelve"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
