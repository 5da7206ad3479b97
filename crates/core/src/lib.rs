//! Core types and shared functionality for egecache.
//!
//! This crate provides:
//! - Versioned cache partitions with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CachedEntry, EntryAge, PartitionId, PartitionKind, PartitionRecord};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
