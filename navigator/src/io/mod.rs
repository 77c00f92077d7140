//! Side-effecting adapters: files, configuration and the route store.

pub mod config;
pub mod landmarks;
pub mod route_store;
pub mod source;
