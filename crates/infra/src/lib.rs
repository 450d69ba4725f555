//! Infrastructure layer: transactional stores, the stock transfer engine, and
//! configuration.

pub mod config;
pub mod store;
pub mod transfer;


pub use config::{AppConfig, ConfigError};
pub use store::{
    ClientLedgerStore, ClientRepository, ClientStockReader, InMemoryStockStore, InventoryStore,
    PgStockStore, ProductRepository, StoreError, TransactionManager,
};
pub use transfer::{TransferEngine, TransferError, TransferReceipt};
