use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Claims, InMemoryAuthService, InMemoryInventoryService, LineItem, OrderService, PlaceOrder,
    ProductId, ProductSummary, RequestMetadata, ShippingAddress, UserId, UserRole,
};
use saga::{ExecutionContext, NoopObserver};
use store::InMemoryStore;

async fn setup(stock: i64) -> (OrderService<InMemoryStore>, InMemoryInventoryService) {
    let auth = InMemoryAuthService::new();
    auth.register("bench", Claims::new(UserId::new(1), UserRole::Customer))
        .await;

    let inventory = InMemoryInventoryService::new();
    for id in 1..=5 {
        inventory
            .add_product(
                ProductSummary {
                    product_id: ProductId::new(id),
                    name: format!("Product {id}"),
                    price: 100,
                    thumbnail: String::new(),
                },
                stock,
            )
            .await;
    }

    let service = OrderService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(auth),
        Arc::new(inventory.clone()),
    )
    .with_observer(Arc::new(NoopObserver));
    (service, inventory)
}

fn five_items(quantity: i32) -> PlaceOrder {
    let address = ShippingAddress::new("Bench", "000", "Loop Street").unwrap();
    let items = (1..=5)
        .map(|id| LineItem::new(ProductId::new(id), UserId::new(9), quantity).unwrap())
        .collect();
    PlaceOrder::new(address, items).unwrap()
}

fn bench_place_order_5_items(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (service, _inventory) = rt.block_on(setup(i64::MAX / 2));
    let metadata = RequestMetadata::bearer("bench");

    c.bench_function("order_service/place_order_5_items", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .place_order(&metadata, five_items(1), &ExecutionContext::new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_rollback_5_items(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (service, inventory) = rt.block_on(setup(1_000));
    rt.block_on(inventory.set_stock(ProductId::new(5), 0));
    let metadata = RequestMetadata::bearer("bench");

    c.bench_function("order_service/rollback_5_items", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = service
                    .place_order(&metadata, five_items(1), &ExecutionContext::new())
                    .await;
                assert!(result.is_err());
            });
        });
    });
}

criterion_group!(benches, bench_place_order_5_items, bench_rollback_5_items);
criterion_main!(benches);
