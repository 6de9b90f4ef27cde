//! Free Library Hub
//!
//! Aggregates free book catalogs from Project Gutenberg, Open Library and the
//! Internet Archive into one normalized schema, behind a TTL cache that
//! tolerates partial provider failure.

pub mod aggregator;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod guard;
pub mod http;

pub use aggregator::Aggregator;
pub use cache::{CacheError, CacheKey, CacheManager};
pub use config::Config;
pub use data::{Books, NormalizedBook, Source};
