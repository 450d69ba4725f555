//! Storage boundary for products, clients and client stock ledgers.
//!
//! The transfer engine only sees the transactional contracts
//! ([`TransactionManager`], [`InventoryStore`], [`ClientLedgerStore`]); the CRUD
//! surface is exposed through the repository traits.

pub mod in_memory;
pub mod postgres;
pub mod schema;
pub mod r#trait;

pub use in_memory::{InMemoryStockStore, InMemoryTx};
pub use postgres::PgStockStore;
pub use r#trait::{
    ClientLedgerStore, ClientRepository, ClientStockReader, InventoryStore, ProductRepository,
    StoreError, TransactionManager,
};
