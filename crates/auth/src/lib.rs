//! `stockroom-auth`: bearer-token verification boundary.
//!
//! Token issuance and password handling live outside this system; this crate
//! only turns a presented token into a verified actor identity.

pub mod claims;
pub mod jwt;
pub mod principal;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::PrincipalId;
