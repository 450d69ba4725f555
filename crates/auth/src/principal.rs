use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller named by the `sub` claim of a verified bearer token.
///
/// Only used to tag requests and log lines; stock operations do not depend on
/// who the caller is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    /// Fresh id, for minting tokens in tests and local tooling.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
