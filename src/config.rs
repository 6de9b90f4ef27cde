//! Runtime configuration for the aggregator

use std::time::Duration;

use crate::guard::DEFAULT_DEADLINE;

/// Base URL for the Gutendex mirror of Project Gutenberg
pub const GUTENBERG_BASE_URL: &str = "https://gutendex.com";

/// Base URL for the Open Library API
pub const OPEN_LIBRARY_BASE_URL: &str = "https://openlibrary.org";

/// Base URL for the Internet Archive API
pub const ARCHIVE_BASE_URL: &str = "https://archive.org";

/// How long cached result sets stay fresh, in minutes
pub const CACHE_TTL_MINUTES: i64 = 30;

/// Settings shared by the adapters and the aggregator
///
/// Base URLs are overridable so that mirrors or local doubles can stand in
/// for the real providers.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deadline applied to every outbound request
    pub request_timeout: Duration,
    /// Freshness window for cache entries
    pub cache_ttl: chrono::Duration,
    /// `User-Agent` header sent to providers
    pub user_agent: String,
    /// Gutendex base URL
    pub gutenberg_url: String,
    /// Open Library base URL
    pub open_library_url: String,
    /// Internet Archive base URL
    pub archive_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_DEADLINE,
            cache_ttl: chrono::Duration::minutes(CACHE_TTL_MINUTES),
            user_agent: format!("freelib/{}", env!("CARGO_PKG_VERSION")),
            gutenberg_url: GUTENBERG_BASE_URL.to_string(),
            open_library_url: OPEN_LIBRARY_BASE_URL.to_string(),
            archive_url: ARCHIVE_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Overrides the request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the cache TTL
    pub fn with_cache_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Overrides the `User-Agent` header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
