use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Address, AddressId, NewAddress, NewOrder, Order, OrderId, OrderStatus, ProductId, Result,
    StoreError, UserId,
    store::{AddressStore, OrderStore},
};

const ORDER_COLUMNS: &str =
    "id, customer_id, supplier_id, product_id, quantity, address_id, status, created_at";

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_address(row: PgRow) -> Result<Address> {
        Ok(Address {
            id: AddressId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            detail: row.try_get("detail")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            customer_id: UserId::new(row.try_get("customer_id")?),
            supplier_id: UserId::new(row.try_get("supplier_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: row.try_get("quantity")?,
            address_id: AddressId::new(row.try_get("address_id")?),
            status: status.parse()?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn orders_where(
        &self,
        column: &str,
        user: UserId,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {column} = $1 AND status = $2 ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user.get())
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl AddressStore for PostgresStore {
    #[tracing::instrument(skip(self, address))]
    async fn create_address(&self, address: NewAddress) -> Result<Address> {
        let row = sqlx::query(
            r#"
            INSERT INTO addresses (name, phone, detail)
            VALUES ($1, $2, $3)
            RETURNING id, name, phone, detail
            "#,
        )
        .bind(&address.name)
        .bind(&address.phone)
        .bind(&address.detail)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_address(row)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_address(&self, id: AddressId) -> Result<()> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AddressNotFound(id));
        }
        Ok(())
    }

    async fn get_address(&self, id: AddressId) -> Result<Address> {
        let row: Option<PgRow> =
            sqlx::query("SELECT id, name, phone, detail FROM addresses WHERE id = $1")
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Self::row_to_address(row),
            None => Err(StoreError::AddressNotFound(id)),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[tracing::instrument(skip(self, order), fields(product_id = %order.product_id))]
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let sql = format!(
            r#"
            INSERT INTO orders (customer_id, supplier_id, product_id, quantity, address_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(order.customer_id.get())
            .bind(order.supplier_id.get())
            .bind(order.product_id.get())
            .bind(order.quantity)
            .bind(order.address_id.get())
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_order(row)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Order> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(StoreError::OrderNotFound(id)),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let sql = format!(
            "UPDATE orders SET status = $1 WHERE id = $2 AND status = $3 RETURNING {ORDER_COLUMNS}"
        );
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(id.get())
            .bind(from.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => {
                let current = self.get_order(id).await?;
                Err(StoreError::StatusConflict {
                    id,
                    expected: from,
                    actual: current.status,
                })
            }
        }
    }

    async fn orders_by_customer(
        &self,
        customer: UserId,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        self.orders_where("customer_id", customer, status).await
    }

    async fn orders_by_supplier(
        &self,
        supplier: UserId,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        self.orders_where("supplier_id", supplier, status).await
    }

    async fn handled_quantities(&self, product: ProductId) -> Result<Vec<i32>> {
        let quantities: Vec<i32> =
            sqlx::query_scalar("SELECT quantity FROM orders WHERE product_id = $1 AND status = $2")
                .bind(product.get())
                .bind(OrderStatus::Handled.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(quantities)
    }

    async fn count_handled(&self, customer: UserId, product: ProductId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE customer_id = $1 AND product_id = $2 AND status = $3",
        )
        .bind(customer.get())
        .bind(product.get())
        .bind(OrderStatus::Handled.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
