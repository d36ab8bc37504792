//! Shapes shared between the store, the HTTP handlers and their clients.

pub mod api;
pub mod events;
pub mod models;
