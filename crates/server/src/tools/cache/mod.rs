//! Cache inspection tools.
//!
//! Both tools read the partitions directly and never reach the network.

pub mod keys;
pub mod lookup;

pub use keys::keys_impl;
pub use lookup::{CacheMatchParams, match_impl};
