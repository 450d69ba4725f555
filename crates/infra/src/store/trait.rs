use async_trait::async_trait;
use thiserror::Error;

use stockroom_core::{ClientId, DomainError, ProductId};
use stockroom_inventory::ClientStock;
use stockroom_parties::{Client, ClientUpdate, NewClient};
use stockroom_products::{NewProduct, Product, ProductUpdate};

/// Storage operation error.
///
/// These are **infrastructure errors** (missing rows, lock/constraint failures,
/// connectivity) as opposed to the transfer taxonomy, which the engine derives
/// from them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A row write was attempted without holding its lock in the same transaction.
    #[error("row lock not held by this transaction: {0}")]
    LockNotHeld(String),

    /// Referential or uniqueness conflict (e.g. deleting a product still held by a client).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A check constraint (e.g. non-negative quantity) rejected the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// Lock wait or statement deadline exceeded.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Connection loss, pool closed, poisoned lock, decode failure, ...
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Input rejected by domain validation before touching storage.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Opens, commits and rolls back transactions handed to the store contracts.
///
/// Dropping a `Tx` without committing must roll it back and release every lock
/// it holds.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    type Tx: Send + 'static;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;
}

/// Product quantity access inside a caller-supplied transaction.
#[async_trait]
pub trait InventoryStore<Tx: Send + 'static>: Send + Sync {
    /// Read the product quantity and take an exclusive row lock held until `tx`
    /// ends. Other lockers of the same row block until then.
    ///
    /// Returns `Ok(None)` when the product does not exist.
    async fn locked_read(&self, tx: &mut Tx, product_id: ProductId) -> Result<Option<i64>, StoreError>;

    /// Overwrite the product quantity. Only valid while `tx` holds the row lock.
    async fn write_quantity(
        &self,
        tx: &mut Tx,
        product_id: ProductId,
        new_quantity: i64,
    ) -> Result<(), StoreError>;
}

/// Client stock ledger access inside a caller-supplied transaction.
#[async_trait]
pub trait ClientLedgerStore<Tx: Send + 'static>: Send + Sync {
    /// Whether the client exists; the row stays share-locked until `tx` ends so
    /// it cannot be deleted underneath the transfer.
    async fn client_exists(&self, tx: &mut Tx, client_id: ClientId) -> Result<bool, StoreError>;

    /// Insert `(client, product)` with `delta`, or add `delta` to the existing
    /// row, as one atomic store operation. Returns the resulting quantity.
    async fn add_quantity(
        &self,
        tx: &mut Tx,
        client_id: ClientId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError>;
}

/// Product CRUD (single-record, auto-committed).
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, input: NewProduct) -> Result<Product, StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Replace editable fields. Serializes with in-flight transfers on the same row.
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError>;

    /// Fails with `Conflict` while any client ledger still references the product.
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;
}

/// Client CRUD (single-record, auto-committed).
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create_client(&self, input: NewClient) -> Result<Client, StoreError>;

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError>;

    async fn update_client(&self, id: ClientId, update: ClientUpdate) -> Result<Client, StoreError>;

    async fn delete_client(&self, id: ClientId) -> Result<(), StoreError>;
}

/// Exact-key reads of committed ledger rows.
#[async_trait]
pub trait ClientStockReader: Send + Sync {
    async fn get_client_stock(
        &self,
        client_id: ClientId,
        product_id: ProductId,
    ) -> Result<Option<ClientStock>, StoreError>;
}
