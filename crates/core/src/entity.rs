//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Creation/modification audit timestamps carried by every persisted record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    /// Both timestamps set to `now` (a freshly created record).
    pub fn created(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at`, never moving it before `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}
