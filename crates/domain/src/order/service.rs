//! Order service: placement, cancellation, supplier handling and listings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::{AddressId, OrderId, ProductId};
use futures_util::future::join_all;
use saga::{
    Coordinator, DEFAULT_COMPENSATION_TIMEOUT, ExecutionContext, FanOut, MetricsObserver, Saga,
    SagaError, SagaObserver, SagaOutcome, TracingObserver,
};
use store::{Address, Order, OrderStatus, Repository, StoreError};

use super::model::{OrderView, PlaceOrder, PlacedOrder};
use super::sagas::{PlacementState, cancellation_saga, placement_saga};
use crate::error::OrderError;
use crate::services::{AuthService, InventoryService, ProductSummary, RequestMetadata, UserRole};

/// Service for managing orders.
///
/// Placement and cancellation run as sagas so that a failure part way
/// through leaves no address, order row or stock change behind. Every call
/// builds its own saga and coordinator; concurrent requests share nothing
/// but the store and the collaborators.
pub struct OrderService<S: ?Sized> {
    store: Arc<S>,
    auth: Arc<dyn AuthService>,
    inventory: Arc<dyn InventoryService>,
    observer: Arc<dyn SagaObserver>,
    compensation_timeout: Duration,
}

impl<S> OrderService<S>
where
    S: Repository + ?Sized + 'static,
{
    /// Creates a service that reports saga progress to tracing and metrics.
    pub fn new(
        store: Arc<S>,
        auth: Arc<dyn AuthService>,
        inventory: Arc<dyn InventoryService>,
    ) -> Self {
        let observer = FanOut::default()
            .with(Arc::new(TracingObserver))
            .with(Arc::new(MetricsObserver));
        Self {
            store,
            auth,
            inventory,
            observer: Arc::new(observer),
            compensation_timeout: DEFAULT_COMPENSATION_TIMEOUT,
        }
    }

    /// Replaces the saga observer.
    pub fn with_observer(mut self, observer: Arc<dyn SagaObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Bounds how long each compensation may run.
    pub fn with_compensation_timeout(mut self, timeout: Duration) -> Self {
        self.compensation_timeout = timeout;
        self
    }

    /// Places an order.
    ///
    /// Creates the shipping address, then for each line item checks stock,
    /// writes the order row and takes the stock. Any failure undoes the
    /// completed steps in reverse order. Compensation failures are logged
    /// for reconciliation and never returned to the caller.
    ///
    /// The saga runs on its own task. Dropping this future cancels the run
    /// and the task rolls back what was already written.
    #[tracing::instrument(skip_all, fields(items = request.items().len()))]
    pub async fn place_order(
        &self,
        metadata: &RequestMetadata,
        request: PlaceOrder,
        ctx: &ExecutionContext,
    ) -> Result<PlacedOrder, OrderError> {
        let claims = self.auth.claims(metadata).await?;
        let (address, items) = request.into_parts();

        let saga = placement_saga(
            self.store.clone(),
            self.inventory.clone(),
            claims.user_id,
            address,
            &items,
        )?;
        let outcome = self
            .coordinator(saga)
            .play_detached(ctx, PlacementState::default())
            .await?;
        self.report_compensation_failures(&outcome);

        if let Some(error) = outcome.execution_error {
            metrics::counter!("orders_placement_failed_total").increment(1);
            tracing::warn!(run_id = %outcome.run_id, %error, "order placement failed");
            return Err(OrderError::PlacementFailed(error));
        }

        let PlacementState { address, orders } = outcome.data;
        let address = address.ok_or_else(|| {
            SagaError::PreconditionViolation("placement completed without an address".to_string())
        })?;
        let orders: Vec<Order> = orders.into_iter().flatten().collect();

        metrics::counter!("orders_placed_total").increment(orders.len() as u64);
        tracing::info!(
            run_id = %outcome.run_id,
            customer_id = %claims.user_id,
            address_id = %address.id,
            orders = orders.len(),
            "order placed"
        );

        Ok(PlacedOrder {
            run_id: outcome.run_id,
            address,
            orders,
        })
    }

    /// Cancels a waiting order and returns its stock.
    ///
    /// Only the order's customer or supplier may cancel it. The row is kept
    /// with status `Cancelled`. Of several concurrent cancellations only one
    /// restocks; the others fail with `InvalidState`.
    #[tracing::instrument(skip(self, metadata, ctx))]
    pub async fn cancel_order(
        &self,
        metadata: &RequestMetadata,
        order_id: OrderId,
        ctx: &ExecutionContext,
    ) -> Result<Order, OrderError> {
        let claims = self.auth.claims(metadata).await?;
        let order = self.store.get_order(order_id).await?;

        if claims.user_id != order.customer_id && claims.user_id != order.supplier_id {
            return Err(OrderError::Forbidden(
                "only the order's customer or supplier can cancel it",
            ));
        }
        ensure_waiting(&order)?;

        let saga = cancellation_saga(self.store.clone(), self.inventory.clone(), &order)?;
        let outcome = self.coordinator(saga).play_detached(ctx, ()).await?;
        self.report_compensation_failures(&outcome);

        if let Some(error) = outcome.execution_error {
            if let Some(&StoreError::StatusConflict {
                id,
                expected,
                actual,
            }) = error.error.downcast_ref::<StoreError>()
            {
                return Err(OrderError::InvalidState {
                    order_id: id,
                    status: actual,
                    expected,
                });
            }
            tracing::warn!(run_id = %outcome.run_id, %error, "order cancellation failed");
            return Err(OrderError::CancellationFailed(error));
        }

        metrics::counter!("orders_cancelled_total").increment(1);
        Ok(Order {
            status: OrderStatus::Cancelled,
            ..order
        })
    }

    /// Marks a waiting order as handled. Only the supplier may do this, and
    /// only while no cancellation has won the order.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn handle_order(
        &self,
        metadata: &RequestMetadata,
        order_id: OrderId,
    ) -> Result<Order, OrderError> {
        let claims = self.auth.claims(metadata).await?;
        let order = self.store.get_order(order_id).await?;

        if claims.user_id != order.supplier_id {
            return Err(OrderError::Forbidden(
                "only the order's supplier can handle it",
            ));
        }

        let handled = self
            .store
            .transition_status(order_id, OrderStatus::Waiting, OrderStatus::Handled)
            .await?;
        metrics::counter!("orders_handled_total").increment(1);

        Ok(handled)
    }

    /// Overwrites an order's status.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), OrderError> {
        self.store.update_status(order_id, status).await?;
        Ok(())
    }

    /// Loads a shipping address.
    pub async fn get_address(&self, address_id: AddressId) -> Result<Address, OrderError> {
        Ok(self.store.get_address(address_id).await?)
    }

    /// Lists the caller's own orders in the given status.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn customer_orders(
        &self,
        metadata: &RequestMetadata,
        status: OrderStatus,
    ) -> Result<Vec<OrderView>, OrderError> {
        let claims = self.auth.claims(metadata).await?;
        let orders = self
            .store
            .orders_by_customer(claims.user_id, status)
            .await?;
        Ok(self.enrich(orders).await)
    }

    /// Lists the orders addressed to the calling supplier in the given
    /// status. Customers are rejected.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn supplier_orders(
        &self,
        metadata: &RequestMetadata,
        status: OrderStatus,
    ) -> Result<Vec<OrderView>, OrderError> {
        let claims = self.auth.claims(metadata).await?;
        if claims.role == UserRole::Customer {
            return Err(OrderError::Forbidden("customers cannot list supplier orders"));
        }

        let orders = self
            .store
            .orders_by_supplier(claims.user_id, status)
            .await?;
        Ok(self.enrich(orders).await)
    }

    /// Returns the number of units sold, counting handled orders only.
    pub async fn sold_count(&self, product: ProductId) -> Result<i64, OrderError> {
        let quantities = self.store.handled_quantities(product).await?;
        Ok(quantities.into_iter().map(i64::from).sum())
    }

    /// Returns true if the caller has at least one handled order for the
    /// product. Store failures answer `false`.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn has_purchased(
        &self,
        metadata: &RequestMetadata,
        product: ProductId,
    ) -> Result<bool, OrderError> {
        let claims = self.auth.claims(metadata).await?;
        match self.store.count_handled(claims.user_id, product).await {
            Ok(count) => Ok(count > 0),
            Err(error) => {
                tracing::warn!(%error, "purchase lookup failed");
                Ok(false)
            }
        }
    }

    fn coordinator<D>(&self, saga: Saga<D>) -> Coordinator<D>
    where
        D: Clone + Send + 'static,
    {
        Coordinator::new(saga)
            .with_observer(self.observer.clone())
            .with_compensation_timeout(self.compensation_timeout)
    }

    fn report_compensation_failures<D>(&self, outcome: &SagaOutcome<D>) {
        if outcome.compensation_errors.is_empty() {
            return;
        }

        for failure in &outcome.compensation_errors {
            tracing::error!(
                saga = %outcome.saga,
                run_id = %outcome.run_id,
                step = %failure.step,
                error = %failure.error,
                "compensation failed, manual reconciliation required"
            );
        }
        tracing::error!(
            saga = %outcome.saga,
            run_id = %outcome.run_id,
            log = %outcome.log.summary(),
            "saga left external state inconsistent"
        );
    }

    /// Attaches catalog data and addresses. Orders whose product the catalog
    /// does not know are dropped; a failed catalog lookup yields no orders.
    async fn enrich(&self, orders: Vec<Order>) -> Vec<OrderView> {
        if orders.is_empty() {
            return Vec::new();
        }

        let mut product_ids: Vec<ProductId> = orders.iter().map(|o| o.product_id).collect();
        product_ids.sort();
        product_ids.dedup();

        let catalog: HashMap<ProductId, ProductSummary> =
            match self.inventory.products(&product_ids).await {
                Ok(products) => products.into_iter().map(|p| (p.product_id, p)).collect(),
                Err(error) => {
                    tracing::warn!(%error, "product lookup failed, returning no orders");
                    return Vec::new();
                }
            };

        let mut address_ids: Vec<AddressId> = orders.iter().map(|o| o.address_id).collect();
        address_ids.sort();
        address_ids.dedup();
        let addresses: HashMap<AddressId, Address> =
            join_all(address_ids.iter().map(|id| self.store.get_address(*id)))
                .await
                .into_iter()
                .filter_map(Result::ok)
                .map(|a| (a.id, a))
                .collect();

        orders
            .into_iter()
            .filter_map(|order| {
                let product = catalog.get(&order.product_id)?.clone();
                let address = addresses.get(&order.address_id).cloned();
                Some(OrderView {
                    order,
                    product,
                    address,
                })
            })
            .collect()
    }
}

fn ensure_waiting(order: &Order) -> Result<(), OrderError> {
    if order.status != OrderStatus::Waiting {
        return Err(OrderError::InvalidState {
            order_id: order.id,
            status: order.status,
            expected: OrderStatus::Waiting,
        });
    }
    Ok(())
}
