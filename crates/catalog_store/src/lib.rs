//! Catalog storage for Trove
//!
//! This crate provides the storage abstraction for users, item types, items
//! and activities. It ships an in-memory backend (for tests and ephemeral
//! use) and a SQLite backend for persistent single-node deployments.

mod defaults;
mod error;
mod memory;
mod sqlite;
mod traits;

pub use defaults::*;
pub use error::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;
