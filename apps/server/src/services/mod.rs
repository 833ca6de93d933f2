//! Business logic sitting between the HTTP handlers and the store.

pub mod activities;
pub mod items;
pub mod naming;
pub mod plugins;
pub mod validation;
