//! SQLite-backed storage for versioned cache partitions.
//!
//! This module provides the durable key-value store behind the worker,
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - A tagged partition registry (kind + version per partition)
//! - Entries keyed by a SHA-256 hash of the request identity
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Version-based garbage collection of whole partitions

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedEntry, EntryAge};
pub use partitions::{PartitionId, PartitionKind, PartitionRecord};
