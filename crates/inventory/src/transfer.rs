use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::{ClientId, DomainError, DomainResult, ProductId};

/// Request to move `quantity` units of a product from global stock into a
/// client's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransfer {
    pub product_id: ProductId,
    pub client_id: ClientId,
    pub quantity: i64,
}

impl StockTransfer {
    pub fn new(product_id: ProductId, client_id: ClientId, quantity: i64) -> Self {
        Self {
            product_id,
            client_id,
            quantity,
        }
    }

    /// Quantity must be a positive integer.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "transfer quantity must be positive, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}

/// Locked stock was below the requested quantity.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("insufficient stock: requested {requested}, available {available}")]
pub struct StockShortfall {
    pub available: i64,
    pub requested: i64,
}

/// Quantity left after withdrawing `requested` from `available`.
///
/// `available` must be the value observed under the row lock; checking an
/// unlocked read here is a race.
pub fn withdraw(available: i64, requested: i64) -> Result<i64, StockShortfall> {
    if requested > available {
        return Err(StockShortfall {
            available,
            requested,
        });
    }
    Ok(available - requested)
}
