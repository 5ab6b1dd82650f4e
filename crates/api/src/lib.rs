//! HTTP API server for the order service.
//!
//! Exposes order placement, cancellation, handling and listings as REST
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{InMemoryAuthService, InMemoryInventoryService, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Repository;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Repository + ?Sized + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/ping", get(routes::health::ping))
        .route("/orders", post(routes::orders::place::<S>))
        .route("/orders/customer", get(routes::orders::customer::<S>))
        .route("/orders/supplier", get(routes::orders::supplier::<S>))
        .route("/orders/{id}", delete(routes::orders::cancel::<S>))
        .route("/orders/{id}/handle", post(routes::orders::handle::<S>))
        .route("/orders/{id}/status", put(routes::orders::update_status::<S>))
        .route("/addresses/{id}", get(routes::addresses::get::<S>))
        .route("/products/{id}/sold", get(routes::products::sold::<S>))
        .route("/products/{id}/purchased", get(routes::products::purchased::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over `store` with in-memory auth and inventory.
///
/// The collaborators are returned so callers can register tokens and stock.
pub fn create_default_state<S: Repository + ?Sized + 'static>(
    store: Arc<S>,
    config: &Config,
) -> (
    Arc<AppState<S>>,
    InMemoryAuthService,
    InMemoryInventoryService,
) {
    let auth = InMemoryAuthService::new();
    let inventory = InMemoryInventoryService::new();

    let orders = OrderService::new(store, Arc::new(auth.clone()), Arc::new(inventory.clone()))
        .with_compensation_timeout(config.compensation_timeout);

    let state = Arc::new(AppState {
        orders,
        saga_timeout: config.saga_timeout,
    });

    (state, auth, inventory)
}

/// Registers the tokens and products listed in `config` with the in-memory
/// collaborators.
pub async fn seed_collaborators(
    config: &Config,
    auth: &InMemoryAuthService,
    inventory: &InMemoryInventoryService,
) {
    for seed in &config.auth_tokens {
        auth.register(seed.token.clone(), seed.claims).await;
    }
    for seed in &config.products {
        inventory.add_product(seed.product.clone(), seed.stock).await;
    }
    tracing::info!(
        tokens = config.auth_tokens.len(),
        products = config.products.len(),
        "seeded auth and inventory"
    );
}
