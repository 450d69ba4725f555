//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, Timestamps};
pub use error::{DomainError, DomainResult};
pub use id::{ClientId, ProductId};
