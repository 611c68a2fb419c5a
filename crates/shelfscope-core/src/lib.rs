//! Shelfscope Core - shared data model for the seller dashboard engine
//!
//! This crate provides the types every other Shelfscope crate depends on:
//!
//! - `Value` - Tagged cell value (null, bool, integer, float, string)
//! - `Record` - One table row, an ordered field map with a stable identity
//! - `ShelfscopeError` - Error type shared by the library crates
//! - `Clock` - Time source used by TTL checks

mod clock;
mod error;
mod types;

pub use clock::*;
pub use error::*;
pub use types::*;
