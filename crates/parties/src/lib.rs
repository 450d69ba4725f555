//! Parties domain module (clients that receive stock).
//!
//! Pure domain logic: validation and record construction, no IO.

pub mod client;

pub use client::{Client, ClientUpdate, ContactInfo, NewClient};
