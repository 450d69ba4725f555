use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{ClientId, DomainError, DomainResult, ProductId, Timestamps};

/// Quantity of one product held by one client.
///
/// Identity is the `(client_id, product_id)` pair; at most one row exists per
/// pair and transfers accumulate into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStock {
    pub client_id: ClientId,
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl ClientStock {
    /// First credit for a pair.
    pub fn opened(
        client_id: ClientId,
        product_id: ProductId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("initial ledger quantity must be positive"));
        }
        Ok(Self {
            client_id,
            product_id,
            quantity,
            timestamps: Timestamps::created(now),
        })
    }

    /// Add `delta` to the held quantity. Ledger rows are never decremented here.
    pub fn credit(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<i64> {
        if delta <= 0 {
            return Err(DomainError::validation("ledger credit must be positive"));
        }
        self.quantity = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("ledger quantity overflow"))?;
        self.timestamps.touch(now);
        Ok(self.quantity)
    }
}
