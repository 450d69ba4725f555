//! Inventory domain module: client stock ledgers and the stock transfer rules.
//!
//! Business rules only (no IO, no HTTP, no storage). The transactional
//! orchestration lives in `stockroom-infra`.

pub mod ledger;
pub mod transfer;

pub use ledger::ClientStock;
pub use transfer::{StockShortfall, StockTransfer, withdraw};
