//! Core entity definitions for Trove.
//!
//! This crate defines the data types shared across the Trove backend:
//! users, item types, items, activities, the opaque external tokens they
//! are addressed by, and the display-name template engine.

mod activity;
mod item;
mod item_type;
pub mod naming;
mod token;
mod user;

pub use activity::*;
pub use item::*;
pub use item_type::*;
pub use token::*;
pub use user::*;
