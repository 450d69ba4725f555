//! Postgres-backed stock store.
//!
//! Row locking is delegated to PostgreSQL: `locked_read` issues
//! `SELECT … FOR UPDATE`, `client_exists` issues `SELECT … FOR SHARE`, and the
//! ledger upsert is a single `INSERT … ON CONFLICT … DO UPDATE` statement.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Constraint` |
//! | Database (serialization failure / deadlock) | `40001` / `40P01` | `Conflict` |
//! | Database (lock not available / query canceled) | `55P03` / `57014` | `Timeout` |
//! | Database (other) | Any other | `Backend` |
//! | PoolTimedOut | N/A | `Timeout` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Backend` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use stockroom_core::{ClientId, ProductId, Timestamps};
use stockroom_inventory::ClientStock;
use stockroom_parties::{Client, ClientUpdate, ContactInfo, NewClient};
use stockroom_products::{NewProduct, Product, ProductUpdate};

use super::r#trait::{
    ClientLedgerStore, ClientRepository, ClientStockReader, InventoryStore, ProductRepository,
    StoreError, TransactionManager,
};

/// Transaction type handed to the store contracts.
pub type PgTx = Transaction<'static, Postgres>;

/// Postgres-backed store implementing every storage contract.
///
/// Uses the SQLx connection pool, which is `Send + Sync`; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgStockStore {
    pool: Arc<PgPool>,
    lock_timeout: Duration,
}

impl PgStockStore {
    /// `lock_timeout` bounds how long a transfer waits on a contended product row.
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            lock_timeout,
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))
    }
}

#[async_trait]
impl TransactionManager for PgStockStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // SET does not take bind parameters; the value is an integer we format.
        let statement = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;

        Ok(tx)
    }

    async fn commit(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl InventoryStore<PgTx> for PgStockStore {
    #[instrument(skip(self, tx), fields(product_id = %product_id), err)]
    async fn locked_read(&self, tx: &mut PgTx, product_id: ProductId) -> Result<Option<i64>, StoreError> {
        let quantity = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT quantity
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("locked_read", e))?;

        debug!(?quantity, "product row locked");
        Ok(quantity)
    }

    #[instrument(skip(self, tx), fields(product_id = %product_id), err)]
    async fn write_quantity(
        &self,
        tx: &mut PgTx,
        product_id: ProductId,
        new_quantity: i64,
    ) -> Result<(), StoreError> {
        let updated = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            UPDATE products
            SET quantity = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id
            "#,
        )
        .bind(new_quantity)
        .bind(product_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("write_quantity", e))?;

        match updated {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl ClientLedgerStore<PgTx> for PgStockStore {
    async fn client_exists(&self, tx: &mut PgTx, client_id: ClientId) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM clients WHERE id = $1 FOR SHARE")
            .bind(client_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("client_exists", e))?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, tx), fields(client_id = %client_id, product_id = %product_id), err)]
    async fn add_quantity(
        &self,
        tx: &mut PgTx,
        client_id: ClientId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO client_stocks (client_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (client_id, product_id)
            DO UPDATE SET
                quantity = client_stocks.quantity + EXCLUDED.quantity,
                updated_at = NOW()
            RETURNING quantity
            "#,
        )
        .bind(client_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(delta)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("add_quantity", e))
    }
}

#[async_trait]
impl ProductRepository for PgStockStore {
    async fn create_product(&self, input: NewProduct) -> Result<Product, StoreError> {
        let product = Product::create(ProductId::new(), input, Utc::now())?;
        let row = sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_in_cents, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price_in_cents, quantity, created_at, updated_at
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_in_cents)
        .bind(product.quantity)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        decode::<ProductRow>(&row).map(Into::into)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price_in_cents, quantity, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| decode::<ProductRow>(&r).map(Into::into)).transpose()
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError> {
        update.validate()?;
        // UPDATE takes the same row lock as a transfer's FOR UPDATE.
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = $1, description = $2, price_in_cents = $3, quantity = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING id, name, description, price_in_cents, quantity, created_at, updated_at
            "#,
        )
        .bind(update.name.trim())
        .bind(&update.description)
        .bind(update.price_in_cents)
        .bind(update.quantity)
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?
        .ok_or(StoreError::NotFound)?;

        decode::<ProductRow>(&row).map(Into::into)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ClientRepository for PgStockStore {
    async fn create_client(&self, input: NewClient) -> Result<Client, StoreError> {
        let client = Client::create(ClientId::new(), input, Utc::now())?;
        let row = sqlx::query(
            r#"
            INSERT INTO clients (id, name, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, phone, created_at, updated_at
            "#,
        )
        .bind(client.id.as_uuid())
        .bind(&client.name)
        .bind(client.contact.email.as_deref())
        .bind(client.contact.phone.as_deref())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_client", e))?;

        decode::<ClientRow>(&row).map(Into::into)
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, created_at, updated_at FROM clients WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_client", e))?;

        row.map(|r| decode::<ClientRow>(&r).map(Into::into)).transpose()
    }

    async fn update_client(&self, id: ClientId, update: ClientUpdate) -> Result<Client, StoreError> {
        // Normalize through the domain type so both backends store the same shape.
        let mut staged = self.get_client(id).await?.ok_or(StoreError::NotFound)?;
        staged.apply_update(update, Utc::now())?;

        let row = sqlx::query(
            r#"
            UPDATE clients
            SET name = $1, email = $2, phone = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING id, name, email, phone, created_at, updated_at
            "#,
        )
        .bind(&staged.name)
        .bind(staged.contact.email.as_deref())
        .bind(staged.contact.phone.as_deref())
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_client", e))?
        .ok_or(StoreError::NotFound)?;

        decode::<ClientRow>(&row).map(Into::into)
    }

    async fn delete_client(&self, id: ClientId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_client", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ClientStockReader for PgStockStore {
    async fn get_client_stock(
        &self,
        client_id: ClientId,
        product_id: ProductId,
    ) -> Result<Option<ClientStock>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT client_id, product_id, quantity, created_at, updated_at
            FROM client_stocks
            WHERE client_id = $1 AND product_id = $2
            "#,
        )
        .bind(client_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_client_stock", e))?;

        row.map(|r| decode::<ClientStockRow>(&r).map(Into::into)).transpose()
    }
}

/// Map SQLx errors to StoreError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Constraint(msg),
                Some("40001") | Some("40P01") => StoreError::Conflict(msg),
                Some("55P03") | Some("57014") => StoreError::Timeout(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Timeout(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow) -> Result<T, StoreError> {
    T::from_row(row).map_err(|e| StoreError::Backend(format!("failed to decode row: {}", e)))
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: uuid::Uuid,
    name: String,
    description: String,
    price_in_cents: i64,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price_in_cents: row.try_get("price_in_cents")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price_in_cents: row.price_in_cents,
            quantity: row.quantity,
            timestamps: Timestamps {
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[derive(Debug)]
struct ClientRow {
    id: uuid::Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ClientRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ClientRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: ClientId::from_uuid(row.id),
            name: row.name,
            contact: ContactInfo {
                email: row.email,
                phone: row.phone,
            },
            timestamps: Timestamps {
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[derive(Debug)]
struct ClientStockRow {
    client_id: uuid::Uuid,
    product_id: uuid::Uuid,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ClientStockRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ClientStockRow {
            client_id: row.try_get("client_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ClientStockRow> for ClientStock {
    fn from(row: ClientStockRow) -> Self {
        ClientStock {
            client_id: ClientId::from_uuid(row.client_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            timestamps: Timestamps {
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_infrastructure_kinds() {
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::PoolTimedOut),
            StoreError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::PoolClosed),
            StoreError::Backend(_)
        ));
        assert_eq!(map_sqlx_error("op", sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn product_row_converts_to_domain_record() {
        let now = Utc::now();
        let id = uuid::Uuid::now_v7();
        let product: Product = ProductRow {
            id,
            name: "Widget".into(),
            description: String::new(),
            price_in_cents: 100,
            quantity: 4,
            created_at: now,
            updated_at: now,
        }
        .into();
        assert_eq!(product.id, ProductId::from_uuid(id));
        assert_eq!(product.quantity, 4);
        assert_eq!(product.timestamps.created_at, now);
    }
}
