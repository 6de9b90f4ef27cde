//! In-memory result cache shared by the adapters and the aggregator
//!
//! This module provides a cache manager holding normalized result sets under
//! keys derived from the operation or provider, the query text and the limit.
//! Entries older than the configured TTL read as absent; they are only
//! physically removed by an explicit clear.

mod manager;

pub use manager::{CacheError, CacheKey, CacheManager};
