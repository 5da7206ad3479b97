//! Client side of egecache.
//!
//! This crate provides the network fetch pipeline and the offline caching
//! worker: request classification, cache partition management, and the
//! fetch strategies that decide between cache and network.

pub mod fetch;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Network, ResponseSource, Scope, canonicalize};
pub use worker::{Classifier, Engine, Phase, ResourceClass, Route, StoreManager, Strategy, Worker, WorkerSettings};
