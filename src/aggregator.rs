//! Aggregation of the provider adapters into logical operations
//!
//! The aggregator fans out to the adapters concurrently, waits for every one
//! of them to settle, then merges the partial results in a fixed provider
//! order. Adapters swallow their own upstream failures, so the worst outcome
//! of any operation here is a shorter result; only a broken cache is an error.
//!
//! Providers already return their listings sorted by popularity; no local
//! re-sorting happens.

use std::sync::Arc;

use tracing::instrument;

use crate::cache::{CacheError, CacheKey, CacheManager};
use crate::config::Config;
use crate::data::gutenberg::POPULAR_MODE;
use crate::data::{
    ArchiveClient, Books, GutenbergClient, NormalizedBook, OpenLibraryClient, Source, Upstream,
};
use crate::http::{HttpTransport, Transport, TransportError};

/// Smallest accepted result limit
pub const MIN_LIMIT: usize = 1;

/// Largest accepted result limit
pub const MAX_LIMIT: usize = 100;

/// Cache key of the trending listing
pub const TRENDING_KEY: &str = "trending";

/// Books requested from each provider for the trending listing
pub const TRENDING_LIMIT: usize = 10;

/// Open Library query used for the trending listing
pub const TRENDING_QUERY: &str = "fiction";

/// Books requested from each provider for a search
pub const SEARCH_SOURCE_LIMIT: usize = 15;

/// Category labels offered for browsing
pub const BROWSE_CATEGORIES: [&str; 15] = [
    "Fiction",
    "Non-fiction",
    "Science",
    "History",
    "Philosophy",
    "Poetry",
    "Drama",
    "Adventure",
    "Romance",
    "Mystery",
    "Fantasy",
    "Biography",
    "Children",
    "Education",
    "Technology",
];

/// Clamps a caller-supplied limit into `MIN_LIMIT..=MAX_LIMIT`
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_LIMIT, MAX_LIMIT)
}

/// Whether a book's title, authors or any subject contains `needle`
///
/// `needle` must already be trimmed and lowercased.
pub fn matches_query(book: &NormalizedBook, needle: &str) -> bool {
    book.title.to_lowercase().contains(needle)
        || book.authors.to_lowercase().contains(needle)
        || matches_category(book, needle)
}

/// Whether any of a book's subjects contains `needle`
///
/// `needle` must already be trimmed and lowercased.
pub fn matches_category(book: &NormalizedBook, needle: &str) -> bool {
    book.subjects
        .iter()
        .any(|subject| subject.to_lowercase().contains(needle))
}

/// Combines the three provider adapters behind a shared cache
#[derive(Clone)]
pub struct Aggregator {
    gutenberg: GutenbergClient,
    open_library: OpenLibraryClient,
    archive: ArchiveClient,
    cache: CacheManager,
}

impl Aggregator {
    /// Creates an aggregator talking to the real providers over HTTPS
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.user_agent)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates an aggregator on top of a custom transport
    ///
    /// Each aggregator owns a fresh cache.
    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let cache = CacheManager::new(config.cache_ttl);
        let upstream = Upstream::new(transport, cache.clone(), config.request_timeout);

        Self {
            gutenberg: GutenbergClient::new(upstream.clone(), config.gutenberg_url.clone()),
            open_library: OpenLibraryClient::new(
                upstream.clone(),
                config.open_library_url.clone(),
            ),
            archive: ArchiveClient::new(upstream, config.archive_url.clone()),
            cache,
        }
    }

    /// The cache shared by this aggregator and its adapters
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Popular books from every provider
    ///
    /// Ordered Gutenberg, Open Library, Internet Archive regardless of which
    /// provider answers first. The merged listing is cached under
    /// `TRENDING_KEY`, including when some providers came back empty.
    pub async fn trending(&self) -> Result<Books, CacheError> {
        let key = CacheKey::named(TRENDING_KEY);
        if let Some(books) = self.cache.get(&key)? {
            tracing::debug!(%key, "Serving trending books from cache");
            return Ok(books);
        }

        let (classics, catalog, collection) = futures::join!(
            self.gutenberg.fetch(TRENDING_LIMIT),
            self.open_library.fetch(TRENDING_QUERY, TRENDING_LIMIT),
            self.archive.fetch(TRENDING_LIMIT),
        );
        let (classics, catalog, collection) = (classics?, catalog?, collection?);

        let books: Books = classics
            .iter()
            .chain(catalog.iter())
            .chain(collection.iter())
            .cloned()
            .collect();
        tracing::debug!(
            gutenberg = classics.len(),
            open_library = catalog.len(),
            archive = collection.len(),
            "Merged trending books"
        );

        self.cache.put(key, Arc::clone(&books))?;
        Ok(books)
    }

    /// Searches Gutenberg and Open Library for `query`
    ///
    /// Gutenberg has no search parameter, so its popular listing is filtered
    /// locally with [`matches_query`]. Filtered Gutenberg results come first.
    /// A blank query returns the trending listing.
    #[instrument(skip(self), level = "debug")]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Books, CacheError> {
        let limit = clamp_limit(limit);
        let query = query.trim();
        if query.is_empty() {
            return self.trending_up_to(limit).await;
        }
        let needle = query.to_lowercase();

        let (classics, catalog) = futures::join!(
            self.gutenberg.fetch(SEARCH_SOURCE_LIMIT),
            self.open_library.fetch(query, SEARCH_SOURCE_LIMIT),
        );
        let (classics, catalog) = (classics?, catalog?);

        Ok(classics
            .iter()
            .filter(|book| matches_query(book, &needle))
            .chain(catalog.iter())
            .take(limit)
            .cloned()
            .collect())
    }

    /// Books in `category` from Open Library and Gutenberg
    ///
    /// Gutenberg results are filtered locally with [`matches_category`] and
    /// follow the Open Library results. A blank category returns the
    /// trending listing.
    #[instrument(skip(self), level = "debug")]
    pub async fn by_category(&self, category: &str, limit: usize) -> Result<Books, CacheError> {
        let limit = clamp_limit(limit);
        let category = category.trim();
        if category.is_empty() {
            return self.trending_up_to(limit).await;
        }
        let needle = category.to_lowercase();

        let (catalog, classics) = futures::join!(
            self.open_library.fetch(category, limit),
            self.gutenberg.fetch(limit),
        );
        let (catalog, classics) = (catalog?, classics?);

        Ok(catalog
            .iter()
            .chain(
                classics
                    .iter()
                    .filter(|book| matches_category(book, &needle)),
            )
            .take(limit)
            .cloned()
            .collect())
    }

    /// Books from a single provider
    ///
    /// `query` is sent to Open Library as the search text. Gutenberg cannot
    /// search, so a query other than `POPULAR_MODE` filters its listing
    /// locally. The Internet Archive listing ignores `query`.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_source(
        &self,
        source: Source,
        query: &str,
        limit: usize,
    ) -> Result<Books, CacheError> {
        let limit = clamp_limit(limit);
        match source {
            Source::Gutenberg => {
                let books = self.gutenberg.fetch(limit).await?;
                let needle = query.trim().to_lowercase();
                if needle.is_empty() || needle == POPULAR_MODE {
                    return Ok(books);
                }
                Ok(books
                    .iter()
                    .filter(|book| matches_query(book, &needle))
                    .cloned()
                    .collect())
            }
            Source::OpenLibrary => self.open_library.fetch(query, limit).await,
            Source::InternetArchive => self.archive.fetch(limit).await,
        }
    }

    /// Empties the cache unconditionally
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear()?;
        tracing::info!("Book cache cleared");
        Ok(())
    }

    /// The trending listing truncated to `limit`
    async fn trending_up_to(&self, limit: usize) -> Result<Books, CacheError> {
        let books = self.trending().await?;
        if books.len() <= limit {
            Ok(books)
        } else {
            Ok(Books::from(&books[..limit]))
        }
    }
}
