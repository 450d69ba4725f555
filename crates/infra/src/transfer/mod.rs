//! Stock transfer engine (application-level orchestration).
//!
//! Moves a quantity of a product from global stock into a client's ledger as a
//! single all-or-nothing transaction that stays correct under concurrent
//! transfers against the same product.
//!
//! ## Transfer Flow
//!
//! ```text
//! StockTransfer
//!   ↓
//! 0. Validate quantity (no transaction opened, no lock taken)
//!   ↓
//! 1. Begin transaction
//!   ↓
//! 2. Locked read of the product quantity (exclusive row lock until the tx ends)
//!   ↓
//! 3. Re-check stock against the locked value
//!   ↓
//! 4. Write the decremented product quantity
//!   ↓
//! 5. Check the client exists (inside the tx, after the product lock)
//!   ↓
//! 6. Atomic upsert of the client ledger row (insert or add)
//!   ↓
//! 7. Commit
//! ```
//!
//! Any failure between 1 and 7 rolls the transaction back, so neither the
//! product decrement nor the ledger credit is ever visible on its own.
//!
//! ## Concurrency
//!
//! The stock check in step 3 reads the value observed **under** the row lock.
//! Concurrent transfers on the same product serialize at step 2; each one sees
//! the quantity left by the previous committer. Transfers on different
//! products never wait on each other.
//!
//! ## Deadline
//!
//! Steps 1 to 6 run under a deadline. When it elapses the in-flight
//! transaction is dropped, which rolls it back and releases its locks, and the
//! caller gets `TransferError::TransactionFailure(StoreError::Timeout(_))`.
//! Nothing has been committed at that point, so the timeout is safe to retry.
//!
//! The commit in step 7 is not raced against the deadline. Once COMMIT has
//! been sent, abandoning it would leave the outcome unknown; its duration is
//! bounded by the backend instead.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use stockroom_core::{ClientId, ProductId};
use stockroom_inventory::{StockTransfer, withdraw};

use crate::store::{ClientLedgerStore, InventoryStore, StoreError, TransactionManager};

/// Outcome taxonomy of a transfer.
///
/// Every variant except `TransactionFailure` is a business outcome the caller
/// can act on; `TransactionFailure` means the transfer did not happen for
/// infrastructure reasons and may be retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("client {0} not found")]
    ClientNotFound(ClientId),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("transaction failed: {0}")]
    TransactionFailure(#[source] StoreError),
}

impl From<StoreError> for TransferError {
    fn from(value: StoreError) -> Self {
        TransferError::TransactionFailure(value)
    }
}

/// Committed result of a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub product_id: ProductId,
    pub client_id: ClientId,
    pub quantity: i64,
    /// Product quantity after the decrement.
    pub remaining_stock: i64,
    /// Client ledger quantity after the credit.
    pub client_quantity: i64,
}

/// Executes stock transfers against injected store contracts.
///
/// ## Generic Parameters
///
/// - `T`: transaction manager; its `Tx` is what the stores operate in
/// - `I`: product quantity store (locked read / write)
/// - `L`: client ledger store (existence check / atomic upsert)
///
/// Usually three clones of one backend.
#[derive(Debug, Clone)]
pub struct TransferEngine<T, I, L> {
    transactions: T,
    inventory: I,
    ledger: L,
    deadline: Duration,
}

impl<T, I, L> TransferEngine<T, I, L>
where
    T: TransactionManager,
    I: InventoryStore<T::Tx>,
    L: ClientLedgerStore<T::Tx>,
{
    pub fn new(transactions: T, inventory: I, ledger: L, deadline: Duration) -> Self {
        Self {
            transactions,
            inventory,
            ledger,
            deadline,
        }
    }

    /// Transfer `request.quantity` units from the product's stock to the
    /// client's ledger.
    ///
    /// On success both writes are committed together. On any error, neither
    /// is.
    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            client_id = %request.client_id,
            quantity = request.quantity
        )
    )]
    pub async fn transfer(&self, request: StockTransfer) -> Result<TransferReceipt, TransferError> {
        if request.validate().is_err() {
            return Err(TransferError::InvalidQuantity(request.quantity));
        }

        let outcome = self.run(request).await;

        match &outcome {
            Ok(receipt) => info!(
                remaining_stock = receipt.remaining_stock,
                client_quantity = receipt.client_quantity,
                "stock transferred"
            ),
            Err(TransferError::TransactionFailure(e)) => warn!(error = %e, "transfer failed"),
            Err(e) => info!(reason = %e, "transfer rejected"),
        }
        outcome
    }

    async fn run(&self, request: StockTransfer) -> Result<TransferReceipt, TransferError> {
        let (tx, receipt) = match tokio::time::timeout(self.deadline, self.stage(request)).await {
            Ok(staged) => staged?,
            Err(_) => {
                return Err(TransferError::TransactionFailure(StoreError::Timeout(format!(
                    "transfer exceeded deadline of {}ms",
                    self.deadline.as_millis()
                ))));
            }
        };

        self.transactions.commit(tx).await?;
        Ok(receipt)
    }

    /// Begin and apply both writes, handing back the open transaction.
    async fn stage(&self, request: StockTransfer) -> Result<(T::Tx, TransferReceipt), TransferError> {
        let mut tx = self.transactions.begin().await?;

        match self.apply(&mut tx, request).await {
            Ok(receipt) => Ok((tx, receipt)),
            Err(e) => {
                if let Err(rollback_err) = self.transactions.rollback(tx).await {
                    warn!(error = %rollback_err, "rollback failed; transaction dropped");
                }
                Err(e)
            }
        }
    }

    async fn apply(&self, tx: &mut T::Tx, request: StockTransfer) -> Result<TransferReceipt, TransferError> {
        let available = self
            .inventory
            .locked_read(tx, request.product_id)
            .await?
            .ok_or(TransferError::ProductNotFound(request.product_id))?;
        debug!(available, "product locked");

        let remaining_stock = withdraw(available, request.quantity).map_err(|short| {
            TransferError::InsufficientStock {
                available: short.available,
                requested: short.requested,
            }
        })?;

        self.inventory
            .write_quantity(tx, request.product_id, remaining_stock)
            .await?;

        if !self.ledger.client_exists(tx, request.client_id).await? {
            return Err(TransferError::ClientNotFound(request.client_id));
        }

        let client_quantity = self
            .ledger
            .add_quantity(tx, request.client_id, request.product_id, request.quantity)
            .await?;

        Ok(TransferReceipt {
            product_id: request.product_id,
            client_id: request.client_id,
            quantity: request.quantity,
            remaining_stock,
            client_quantity,
        })
    }
}
