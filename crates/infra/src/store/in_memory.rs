use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use tracing::debug;

use stockroom_core::{ClientId, Entity, ProductId};
use stockroom_inventory::ClientStock;
use stockroom_parties::{Client, ClientUpdate, NewClient};
use stockroom_products::{NewProduct, Product, ProductUpdate};

use super::r#trait::{
    ClientLedgerStore, ClientRepository, ClientStockReader, InventoryStore, ProductRepository,
    StoreError, TransactionManager,
};

type LedgerKey = (ClientId, ProductId);

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    clients: HashMap<ClientId, Client>,
    ledger: HashMap<LedgerKey, ClientStock>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Committed state. Commits apply all staged writes under one write guard,
    /// so readers never observe half of a transaction.
    tables: RwLock<Tables>,
    /// Per-product exclusive row locks (the `FOR UPDATE` equivalent).
    row_locks: Mutex<HashMap<ProductId, Arc<RowLock<()>>>>,
    next_tx: AtomicU64,
}

/// In-memory transactional store for products, clients and client ledgers.
///
/// Intended for tests/dev. It implements real row locking: a transaction's
/// `locked_read` holds an owned async mutex guard per product until the
/// transaction commits, rolls back or is dropped. Writes are staged in the
/// transaction and applied at commit; ledger credits are applied additively
/// against the committed row at that moment, which makes the upsert atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockStore {
    inner: Arc<Inner>,
}

/// A transaction against [`InMemoryStockStore`].
///
/// Dropping it without commit discards staged writes and releases its locks.
#[derive(Debug)]
pub struct InMemoryTx {
    id: u64,
    locked: HashMap<ProductId, OwnedMutexGuard<()>>,
    product_writes: HashMap<ProductId, i64>,
    ledger_credits: HashMap<LedgerKey, i64>,
}

impl InMemoryTx {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn holds_lock(&self, product_id: ProductId) -> bool {
        self.locked.contains_key(&product_id)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner.tables.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner.tables.write().map_err(|_| poisoned())
    }

    /// Row lock for an existing product. Unknown ids get no entry, so the lock
    /// table only ever holds committed products.
    fn row_lock(&self, product_id: ProductId) -> Result<Option<Arc<RowLock<()>>>, StoreError> {
        let tables = self.read()?;
        if !tables.products.contains_key(&product_id) {
            return Ok(None);
        }
        let mut locks = self.inner.row_locks.lock().map_err(|_| poisoned())?;
        Ok(Some(locks.entry(product_id).or_default().clone()))
    }

    async fn lock_row(&self, product_id: ProductId) -> Result<Option<OwnedMutexGuard<()>>, StoreError> {
        match self.row_lock(product_id)? {
            Some(lock) => Ok(Some(lock.lock_owned().await)),
            None => Ok(None),
        }
    }

    #[cfg(test)]
    fn row_lock_count(&self) -> usize {
        self.inner.row_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    fn committed_quantity(&self, product_id: ProductId) -> Result<Option<i64>, StoreError> {
        Ok(self.read()?.products.get(&product_id).map(|p| p.quantity))
    }

    fn committed_ledger_quantity(&self, key: LedgerKey) -> Result<i64, StoreError> {
        let tables = self.read()?;
        let (client_id, product_id) = key;
        if !tables.clients.contains_key(&client_id) {
            return Err(StoreError::Conflict(format!(
                "client_stocks.client_id references missing client {client_id}"
            )));
        }
        if !tables.products.contains_key(&product_id) {
            return Err(StoreError::Conflict(format!(
                "client_stocks.product_id references missing product {product_id}"
            )));
        }
        Ok(tables.ledger.get(&key).map(|row| row.quantity).unwrap_or(0))
    }

    /// Validate every staged write against current committed state, then
    /// publish all of them under a single write guard.
    fn apply_commit(&self, tx: &InMemoryTx) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut tables = self.write()?;

        let mut products = Vec::with_capacity(tx.product_writes.len());
        for (id, quantity) in &tx.product_writes {
            let mut product = tables.products.get(id).cloned().ok_or(StoreError::NotFound)?;
            product.set_quantity(*quantity, now)?;
            products.push(product);
        }

        let mut rows = Vec::with_capacity(tx.ledger_credits.len());
        for (&(client_id, product_id), &delta) in &tx.ledger_credits {
            if !tables.clients.contains_key(&client_id) {
                return Err(StoreError::Conflict(format!(
                    "client {client_id} was deleted before commit"
                )));
            }
            if !tables.products.contains_key(&product_id) {
                return Err(StoreError::Conflict(format!(
                    "product {product_id} was deleted before commit"
                )));
            }
            let row = match tables.ledger.get(&(client_id, product_id)) {
                Some(existing) => {
                    let mut row = existing.clone();
                    row.credit(delta, now)?;
                    row
                }
                None => ClientStock::opened(client_id, product_id, delta, now)?,
            };
            rows.push(row);
        }

        for product in products {
            tables.products.insert(*product.id(), product);
        }
        for row in rows {
            tables.ledger.insert((row.client_id, row.product_id), row);
        }
        Ok(())
    }

    fn replace_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError> {
        let mut tables = self.write()?;
        let product = tables.products.get_mut(&id).ok_or(StoreError::NotFound)?;
        product.apply_update(update, Utc::now())?;
        Ok(product.clone())
    }

    fn remove_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.products.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if tables.ledger.keys().any(|(_, product_id)| *product_id == id) {
            return Err(StoreError::Conflict(format!(
                "product {id} is still held in client stock"
            )));
        }
        tables.products.remove(&id);
        drop(tables);

        let mut locks = self.inner.row_locks.lock().map_err(|_| poisoned())?;
        locks.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl TransactionManager for InMemoryStockStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx, StoreError> {
        let id = self.inner.next_tx.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(InMemoryTx {
            id,
            locked: HashMap::new(),
            product_writes: HashMap::new(),
            ledger_credits: HashMap::new(),
        })
    }

    async fn commit(&self, tx: InMemoryTx) -> Result<(), StoreError> {
        self.apply_commit(&tx)?;
        debug!(tx_id = tx.id, writes = tx.product_writes.len(), "in-memory commit");
        // Row guards are released only after the writes are visible.
        drop(tx);
        Ok(())
    }

    async fn rollback(&self, tx: InMemoryTx) -> Result<(), StoreError> {
        debug!(tx_id = tx.id, "in-memory rollback");
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl InventoryStore<InMemoryTx> for InMemoryStockStore {
    async fn locked_read(
        &self,
        tx: &mut InMemoryTx,
        product_id: ProductId,
    ) -> Result<Option<i64>, StoreError> {
        if !tx.locked.contains_key(&product_id) {
            let Some(guard) = self.lock_row(product_id).await? else {
                return Ok(None);
            };
            tx.locked.insert(product_id, guard);
        }
        if let Some(staged) = tx.product_writes.get(&product_id) {
            return Ok(Some(*staged));
        }
        self.committed_quantity(product_id)
    }

    async fn write_quantity(
        &self,
        tx: &mut InMemoryTx,
        product_id: ProductId,
        new_quantity: i64,
    ) -> Result<(), StoreError> {
        if !tx.holds_lock(product_id) {
            return Err(StoreError::LockNotHeld(product_id.to_string()));
        }
        if new_quantity < 0 {
            return Err(StoreError::Constraint("products.quantity >= 0".to_string()));
        }
        if self.committed_quantity(product_id)?.is_none() {
            return Err(StoreError::NotFound);
        }
        tx.product_writes.insert(product_id, new_quantity);
        Ok(())
    }
}

#[async_trait]
impl ClientLedgerStore<InMemoryTx> for InMemoryStockStore {
    async fn client_exists(&self, _tx: &mut InMemoryTx, client_id: ClientId) -> Result<bool, StoreError> {
        Ok(self.read()?.clients.contains_key(&client_id))
    }

    async fn add_quantity(
        &self,
        tx: &mut InMemoryTx,
        client_id: ClientId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        if delta <= 0 {
            return Err(StoreError::Constraint("client_stocks.quantity delta > 0".to_string()));
        }
        let key = (client_id, product_id);
        let committed = self.committed_ledger_quantity(key)?;
        let staged = tx.ledger_credits.entry(key).or_insert(0);
        *staged = staged
            .checked_add(delta)
            .ok_or_else(|| StoreError::Constraint("client_stocks.quantity overflow".to_string()))?;
        committed
            .checked_add(*staged)
            .ok_or_else(|| StoreError::Constraint("client_stocks.quantity overflow".to_string()))
    }
}

#[async_trait]
impl ProductRepository for InMemoryStockStore {
    async fn create_product(&self, input: NewProduct) -> Result<Product, StoreError> {
        let product = Product::create(ProductId::new(), input, Utc::now())?;
        self.write()?.products.insert(*product.id(), product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError> {
        update.validate()?;
        let _row = self.lock_row(id).await?.ok_or(StoreError::NotFound)?;
        self.replace_product(id, update)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let _row = self.lock_row(id).await?.ok_or(StoreError::NotFound)?;
        self.remove_product(id)
    }
}

#[async_trait]
impl ClientRepository for InMemoryStockStore {
    async fn create_client(&self, input: NewClient) -> Result<Client, StoreError> {
        let client = Client::create(ClientId::new(), input, Utc::now())?;
        self.write()?.clients.insert(*client.id(), client.clone());
        Ok(client)
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        Ok(self.read()?.clients.get(&id).cloned())
    }

    async fn update_client(&self, id: ClientId, update: ClientUpdate) -> Result<Client, StoreError> {
        let mut tables = self.write()?;
        let client = tables.clients.get_mut(&id).ok_or(StoreError::NotFound)?;
        client.apply_update(update, Utc::now())?;
        Ok(client.clone())
    }

    async fn delete_client(&self, id: ClientId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.clients.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if tables.ledger.keys().any(|(client_id, _)| *client_id == id) {
            return Err(StoreError::Conflict(format!("client {id} still holds stock")));
        }
        tables.clients.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ClientStockReader for InMemoryStockStore {
    async fn get_client_stock(
        &self,
        client_id: ClientId,
        product_id: ProductId,
    ) -> Result<Option<ClientStock>, StoreError> {
        Ok(self.read()?.ledger.get(&(client_id, product_id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stockroom_parties::ContactInfo;

    use super::*;

    async fn seed(store: &InMemoryStockStore, quantity: i64) -> (ProductId, ClientId) {
        let product = store
            .create_product(NewProduct {
                name: "Widget".into(),
                description: String::new(),
                price_in_cents: 250,
                quantity,
            })
            .await
            .unwrap();
        let client = store
            .create_client(NewClient {
                name: "Acme".into(),
                contact: ContactInfo::default(),
            })
            .await
            .unwrap();
        (product.id, client.id)
    }

    #[tokio::test]
    async fn unknown_products_leave_no_row_locks_behind() {
        let store = InMemoryStockStore::new();
        for _ in 0..1000 {
            let mut tx = store.begin().await.unwrap();
            assert_eq!(store.locked_read(&mut tx, ProductId::new()).await.unwrap(), None);
            store.rollback(tx).await.unwrap();
        }
        let missing = ProductId::new();
        assert_eq!(
            store
                .update_product(
                    missing,
                    ProductUpdate {
                        name: "Gadget".into(),
                        description: String::new(),
                        price_in_cents: 100,
                        quantity: 1,
                    },
                )
                .await
                .unwrap_err(),
            StoreError::NotFound
        );
        assert_eq!(store.delete_product(missing).await.unwrap_err(), StoreError::NotFound);
        assert_eq!(store.row_lock_count(), 0);

        let (product_id, _) = seed(&store, 1).await;
        let mut tx = store.begin().await.unwrap();
        store.locked_read(&mut tx, product_id).await.unwrap();
        assert_eq!(store.row_lock_count(), 1);
        store.rollback(tx).await.unwrap();
        store.delete_product(product_id).await.unwrap();
        assert_eq!(store.row_lock_count(), 0);
    }

    #[tokio::test]
    async fn write_without_lock_is_refused() {
        let store = InMemoryStockStore::new();
        let (product_id, _) = seed(&store, 10).await;
        let mut tx = store.begin().await.unwrap();
        let err = store.write_quantity(&mut tx, product_id, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::LockNotHeld(_)));
    }

    #[tokio::test]
    async fn staged_writes_are_invisible_until_commit() {
        let store = InMemoryStockStore::new();
        let (product_id, client_id) = seed(&store, 10).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(store.locked_read(&mut tx, product_id).await.unwrap(), Some(10));
        store.write_quantity(&mut tx, product_id, 4).await.unwrap();
        assert_eq!(store.add_quantity(&mut tx, client_id, product_id, 6).await.unwrap(), 6);

        assert_eq!(store.get_product(product_id).await.unwrap().unwrap().quantity, 10);
        assert!(store.get_client_stock(client_id, product_id).await.unwrap().is_none());

        store.commit(tx).await.unwrap();
        assert_eq!(store.get_product(product_id).await.unwrap().unwrap().quantity, 4);
        let row = store.get_client_stock(client_id, product_id).await.unwrap().unwrap();
        assert_eq!(row.quantity, 6);
    }

    #[tokio::test]
    async fn rollback_discards_everything() {
        let store = InMemoryStockStore::new();
        let (product_id, client_id) = seed(&store, 10).await;

        let mut tx = store.begin().await.unwrap();
        store.locked_read(&mut tx, product_id).await.unwrap();
        store.write_quantity(&mut tx, product_id, 0).await.unwrap();
        store.add_quantity(&mut tx, client_id, product_id, 10).await.unwrap();
        store.rollback(tx).await.unwrap();

        assert_eq!(store.get_product(product_id).await.unwrap().unwrap().quantity, 10);
        assert!(store.get_client_stock(client_id, product_id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn locked_read_blocks_second_locker_until_commit() {
        let store = InMemoryStockStore::new();
        let (product_id, _) = seed(&store, 10).await;

        let mut holder = store.begin().await.unwrap();
        store.locked_read(&mut holder, product_id).await.unwrap();
        store.write_quantity(&mut holder, product_id, 7).await.unwrap();

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let seen = store.locked_read(&mut tx, product_id).await.unwrap();
                store.rollback(tx).await.unwrap();
                seen
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        store.commit(holder).await.unwrap();
        let seen = tokio::time::timeout(Duration::from_secs(2), contender)
            .await
            .expect("contender should acquire the lock after commit")
            .unwrap();
        assert_eq!(seen, Some(7));
    }

    #[tokio::test]
    async fn dropping_a_transaction_releases_its_lock() {
        let store = InMemoryStockStore::new();
        let (product_id, _) = seed(&store, 1).await;

        {
            let mut tx = store.begin().await.unwrap();
            store.locked_read(&mut tx, product_id).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        let read = tokio::time::timeout(
            Duration::from_millis(200),
            store.locked_read(&mut tx, product_id),
        )
        .await;
        assert!(matches!(read, Ok(Ok(Some(1)))));
    }

    #[tokio::test]
    async fn concurrent_credits_to_one_pair_accumulate() {
        let store = InMemoryStockStore::new();
        let (product_id, client_id) = seed(&store, 0).await;

        let mut a = store.begin().await.unwrap();
        let mut b = store.begin().await.unwrap();
        store.add_quantity(&mut a, client_id, product_id, 5).await.unwrap();
        store.add_quantity(&mut b, client_id, product_id, 5).await.unwrap();
        store.commit(a).await.unwrap();
        store.commit(b).await.unwrap();

        let row = store.get_client_stock(client_id, product_id).await.unwrap().unwrap();
        assert_eq!(row.quantity, 10);
    }

    #[tokio::test]
    async fn add_quantity_for_unknown_client_is_a_conflict() {
        let store = InMemoryStockStore::new();
        let (product_id, _) = seed(&store, 3).await;
        let mut tx = store.begin().await.unwrap();
        let err = store
            .add_quantity(&mut tx, ClientId::new(), product_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn referenced_rows_cannot_be_deleted() {
        let store = InMemoryStockStore::new();
        let (product_id, client_id) = seed(&store, 3).await;

        let mut tx = store.begin().await.unwrap();
        store.locked_read(&mut tx, product_id).await.unwrap();
        store.write_quantity(&mut tx, product_id, 2).await.unwrap();
        store.add_quantity(&mut tx, client_id, product_id, 1).await.unwrap();
        store.commit(tx).await.unwrap();

        assert!(matches!(store.delete_product(product_id).await, Err(StoreError::Conflict(_))));
        assert!(matches!(store.delete_client(client_id).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn client_deleted_mid_transaction_fails_the_commit() {
        let store = InMemoryStockStore::new();
        let (product_id, client_id) = seed(&store, 3).await;

        let mut tx = store.begin().await.unwrap();
        store.locked_read(&mut tx, product_id).await.unwrap();
        store.write_quantity(&mut tx, product_id, 2).await.unwrap();
        store.add_quantity(&mut tx, client_id, product_id, 1).await.unwrap();

        store.delete_client(client_id).await.unwrap();
        assert!(matches!(store.commit(tx).await, Err(StoreError::Conflict(_))));
        assert_eq!(store.get_product(product_id).await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn crud_round_trip_for_products() {
        let store = InMemoryStockStore::new();
        let (product_id, _) = seed(&store, 3).await;

        let updated = store
            .update_product(
                product_id,
                ProductUpdate {
                    name: "Gadget".into(),
                    description: "new".into(),
                    price_in_cents: 99,
                    quantity: 8,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Gadget");
        assert_eq!(updated.quantity, 8);

        store.delete_product(product_id).await.unwrap();
        assert!(store.get_product(product_id).await.unwrap().is_none());
        assert_eq!(store.delete_product(product_id).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn invalid_product_update_is_rejected_before_locking() {
        let store = InMemoryStockStore::new();
        let (product_id, _) = seed(&store, 3).await;
        let err = store
            .update_product(
                product_id,
                ProductUpdate {
                    name: " ".into(),
                    description: String::new(),
                    price_in_cents: 1,
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }
}
