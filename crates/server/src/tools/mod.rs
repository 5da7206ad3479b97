//! MCP tool implementations.
//!
//! `sw_fetch` dispatches a fetch event through the worker; the cache tools
//! inspect the partitions without touching the network.

pub mod cache;
pub mod fetch;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{SwFetchParams, fetch_impl};
