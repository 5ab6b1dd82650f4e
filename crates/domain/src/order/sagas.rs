//! Saga definitions for placing and cancelling orders.
//!
//! Every step is a small async function over the run's shared state. Values
//! produced by one step (the address id, each order row) are written into
//! [`PlacementState`] and read back by later steps and by compensations.

use std::sync::Arc;

use common::{AddressId, OrderId, UserId};
use saga::{ExecutionContext, RunData, Saga, SagaError, Step, StepError};
use store::{Address, NewAddress, NewOrder, Order, OrderStatus, Repository};

use super::model::{LineItem, ShippingAddress};
use crate::services::{InventoryError, InventoryService};

pub(crate) const PLACEMENT_SAGA: &str = "place-order";
pub(crate) const CANCELLATION_SAGA: &str = "cancel-order";

/// State shared by the steps of one placement run.
#[derive(Debug, Clone, Default)]
pub struct PlacementState {
    /// Address row written by the first step.
    pub address: Option<Address>,
    /// Order row per line item, by item position.
    pub orders: Vec<Option<Order>>,
}

impl PlacementState {
    fn address_id(&self) -> Option<AddressId> {
        self.address.as_ref().map(|a| a.id)
    }

    fn order_id(&self, slot: usize) -> Option<OrderId> {
        self.orders.get(slot).and_then(|o| o.as_ref()).map(|o| o.id)
    }
}

/// Builds the placement saga:
/// `create address`, then for each item `check inventory`, `create order`,
/// `decrement inventory`.
pub(crate) fn placement_saga<S>(
    store: Arc<S>,
    inventory: Arc<dyn InventoryService>,
    customer: UserId,
    address: ShippingAddress,
    items: &[LineItem],
) -> Result<Saga<PlacementState>, SagaError>
where
    S: Repository + ?Sized + 'static,
{
    let mut saga = Saga::new(PLACEMENT_SAGA);

    let new_address = NewAddress::from(address);
    let create_store = store.clone();
    let undo_store = store.clone();
    saga.add_step(
        Step::new("create address", move |_ctx: ExecutionContext, data| {
            create_address(create_store.clone(), new_address.clone(), data)
        })
        .compensate_with(move |_ctx: ExecutionContext, data| {
            delete_address(undo_store.clone(), data)
        }),
    )?;

    for (slot, item) in items.iter().copied().enumerate() {
        let check_inventory = inventory.clone();
        saga.add_step(Step::new(
            format!("check inventory {slot}"),
            move |_ctx: ExecutionContext, _data: RunData<PlacementState>| {
                check_stock(check_inventory.clone(), item)
            },
        ))?;

        let create_store = store.clone();
        let undo_store = store.clone();
        saga.add_step(
            Step::new(format!("create order {slot}"), move |_ctx: ExecutionContext, data| {
                create_order(create_store.clone(), customer, item, slot, data)
            })
            .compensate_with(move |_ctx: ExecutionContext, data| {
                delete_order(undo_store.clone(), slot, data)
            }),
        )?;

        let take_inventory = inventory.clone();
        let return_inventory = inventory.clone();
        saga.add_step(
            Step::new(
                format!("decrement inventory {slot}"),
                move |_ctx: ExecutionContext, _data: RunData<PlacementState>| {
                    decrement(take_inventory.clone(), item)
                },
            )
            .compensate_with(
                move |_ctx: ExecutionContext, _data: RunData<PlacementState>| {
                    increment(return_inventory.clone(), item)
                },
            ),
        )?;
    }

    Ok(saga)
}

/// Builds the cancellation saga: move the order from waiting to cancelled,
/// then return its stock. The status change is conditional, so only the
/// request that wins it restocks. If restocking fails the order goes back to
/// waiting.
pub(crate) fn cancellation_saga<S>(
    store: Arc<S>,
    inventory: Arc<dyn InventoryService>,
    order: &Order,
) -> Result<Saga<()>, SagaError>
where
    S: Repository + ?Sized + 'static,
{
    let product = order.product_id;
    let quantity = order.quantity;
    let order_id = order.id;
    let cancel_store = store.clone();
    let reopen_store = store;

    let mut saga = Saga::new(CANCELLATION_SAGA);
    saga.add_step(
        Step::new("mark cancelled", move |_ctx: ExecutionContext, _data: RunData<()>| {
            transition(
                cancel_store.clone(),
                order_id,
                OrderStatus::Waiting,
                OrderStatus::Cancelled,
            )
        })
        .compensate_with(move |_ctx: ExecutionContext, _data: RunData<()>| {
            transition(
                reopen_store.clone(),
                order_id,
                OrderStatus::Cancelled,
                OrderStatus::Waiting,
            )
        }),
    )?
    .add_step(Step::new(
        "restock inventory",
        move |_ctx: ExecutionContext, _data: RunData<()>| {
            let inventory = inventory.clone();
            async move {
                inventory
                    .increment(product, quantity)
                    .await
                    .map_err(StepError::from_source)
            }
        },
    ))?;

    Ok(saga)
}

async fn transition<S>(
    store: Arc<S>,
    order_id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), StepError>
where
    S: Repository + ?Sized,
{
    store
        .transition_status(order_id, from, to)
        .await
        .map(|_| ())
        .map_err(StepError::from_source)
}

async fn create_address<S>(
    store: Arc<S>,
    address: NewAddress,
    data: RunData<PlacementState>,
) -> Result<(), StepError>
where
    S: Repository + ?Sized,
{
    let created = store
        .create_address(address)
        .await
        .map_err(StepError::from_source)?;
    data.update(|state| state.address = Some(created)).await;
    Ok(())
}

async fn delete_address<S>(store: Arc<S>, data: RunData<PlacementState>) -> Result<(), StepError>
where
    S: Repository + ?Sized,
{
    let Some(id) = data.read(PlacementState::address_id).await else {
        return Ok(());
    };
    already_gone_is_ok(store.delete_address(id).await)
}

async fn check_stock(
    inventory: Arc<dyn InventoryService>,
    item: LineItem,
) -> Result<(), StepError> {
    let available = inventory
        .inventory_count(item.product_id())
        .await
        .map_err(StepError::from_source)?;
    let requested = i64::from(item.quantity());

    if available < requested {
        return Err(StepError::from_source(InventoryError::InsufficientStock {
            product_id: item.product_id(),
            available,
            requested,
        }));
    }
    Ok(())
}

async fn create_order<S>(
    store: Arc<S>,
    customer: UserId,
    item: LineItem,
    slot: usize,
    data: RunData<PlacementState>,
) -> Result<(), StepError>
where
    S: Repository + ?Sized,
{
    let address_id = data
        .read(PlacementState::address_id)
        .await
        .ok_or_else(|| StepError::failed("shipping address was not created"))?;

    let order = store
        .create_order(NewOrder {
            customer_id: customer,
            supplier_id: item.supplier_id(),
            product_id: item.product_id(),
            quantity: item.quantity(),
            address_id,
        })
        .await
        .map_err(StepError::from_source)?;

    data.update(|state| {
        if state.orders.len() <= slot {
            state.orders.resize(slot + 1, None);
        }
        state.orders[slot] = Some(order);
    })
    .await;
    Ok(())
}

async fn delete_order<S>(
    store: Arc<S>,
    slot: usize,
    data: RunData<PlacementState>,
) -> Result<(), StepError>
where
    S: Repository + ?Sized,
{
    let Some(id) = data.read(|state| state.order_id(slot)).await else {
        return Ok(());
    };
    already_gone_is_ok(store.delete_order(id).await)
}

async fn decrement(inventory: Arc<dyn InventoryService>, item: LineItem) -> Result<(), StepError> {
    inventory
        .decrement(item.product_id(), item.quantity())
        .await
        .map_err(StepError::from_source)
}

async fn increment(inventory: Arc<dyn InventoryService>, item: LineItem) -> Result<(), StepError> {
    inventory
        .increment(item.product_id(), item.quantity())
        .await
        .map_err(StepError::from_source)
}

// A compensation that finds its row already deleted has nothing left to undo.
fn already_gone_is_ok(result: store::Result<()>) -> Result<(), StepError> {
    match result {
        Err(e) if !e.is_not_found() => Err(StepError::from_source(e)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use store::{InMemoryStore, StoreError};

    use crate::services::InMemoryInventoryService;

    fn item(product: i64, quantity: i32) -> LineItem {
        LineItem::new(ProductId::new(product), UserId::new(50), quantity).unwrap()
    }

    #[test]
    fn test_placement_saga_shape() {
        let saga = placement_saga(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryInventoryService::new()),
            UserId::new(1),
            ShippingAddress::new("Ada", "555", "1 Way").unwrap(),
            &[item(1, 1), item(2, 2)],
        )
        .unwrap();

        assert_eq!(
            saga.step_names().collect::<Vec<_>>(),
            [
                "create address",
                "check inventory 0",
                "create order 0",
                "decrement inventory 0",
                "check inventory 1",
                "create order 1",
                "decrement inventory 1",
            ]
        );
    }

    #[test]
    fn test_cancellation_saga_shape() {
        let order = Order {
            id: OrderId::new(3),
            customer_id: UserId::new(1),
            supplier_id: UserId::new(2),
            product_id: ProductId::new(4),
            quantity: 2,
            address_id: AddressId::new(1),
            status: OrderStatus::Waiting,
            created_at: Default::default(),
        };
        let saga = cancellation_saga(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryInventoryService::new()),
            &order,
        )
        .unwrap();

        assert_eq!(
            saga.step_names().collect::<Vec<_>>(),
            ["mark cancelled", "restock inventory"]
        );
    }

    #[test]
    fn test_missing_rows_do_not_fail_compensation() {
        assert!(already_gone_is_ok(Err(StoreError::OrderNotFound(OrderId::new(1)))).is_ok());
        assert!(already_gone_is_ok(Ok(())).is_ok());
        assert!(already_gone_is_ok(Err(StoreError::Unavailable("down".into()))).is_err());
    }
}
