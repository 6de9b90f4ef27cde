//! Project Gutenberg adapter (via the Gutendex API)
//!
//! Gutendex only exposes a popularity-sorted listing here; there is no
//! free-text parameter, so queries are applied by the aggregator after the
//! fact.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{
    decode_record, non_blank, non_blank_list, nullable, parse_envelope, Books, NormalizedBook,
    Source, Upstream,
};
use crate::cache::CacheError;
use crate::guard::FetchError;
use crate::http::Request;

/// Query mode used in cache keys for the unfiltered popularity listing
pub const POPULAR_MODE: &str = "popular";

/// Preferred content formats for the download link, best first
const DOWNLOAD_FORMATS: [&str; 3] = ["text/html", "text/plain", "application/epub+zip"];

/// Format key holding the cover image
const COVER_FORMAT: &str = "image/jpeg";

/// Client for the most downloaded English titles on Project Gutenberg
#[derive(Clone)]
pub struct GutenbergClient {
    upstream: Upstream,
    base_url: String,
}

impl GutenbergClient {
    pub(crate) fn new(upstream: Upstream, base_url: impl Into<String>) -> Self {
        Self {
            upstream,
            base_url: base_url.into(),
        }
    }

    /// Fetches up to `limit` of the most downloaded books
    ///
    /// Provider failures yield an empty list; only a broken cache is an error.
    pub async fn fetch(&self, limit: usize) -> Result<Books, CacheError> {
        self.upstream
            .fetch_books(
                Source::Gutenberg,
                POPULAR_MODE,
                limit,
                self.listing_request(),
                parse_listing,
            )
            .await
    }

    /// Builds the listing request; the limit is applied locally
    fn listing_request(&self) -> Request {
        Request::new(format!("{}/books/", self.base_url.trim_end_matches('/')))
            .param("sort", "download_count")
            .param("languages", "en")
            .param("page", 1)
    }
}

/// Gutendex listing envelope
#[derive(Debug, Deserialize)]
struct GutendexListing {
    results: Vec<Value>,
}

/// A single book from the Gutendex listing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GutendexBook {
    id: Option<u64>,
    title: Option<String>,
    #[serde(deserialize_with = "nullable")]
    authors: Vec<GutendexPerson>,
    #[serde(deserialize_with = "nullable")]
    subjects: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    languages: Vec<String>,
    copyright: Option<bool>,
    download_count: Option<u64>,
    /// Content links keyed by MIME type
    #[serde(deserialize_with = "nullable")]
    formats: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GutendexPerson {
    name: Option<String>,
}

impl GutendexBook {
    /// Link for `mime`: the exact key first, then any key with that prefix
    fn format_url(&self, mime: &str) -> Option<String> {
        self.formats
            .get(mime)
            .or_else(|| {
                self.formats
                    .iter()
                    .find(|(key, _)| key.starts_with(mime))
                    .map(|(_, url)| url)
            })
            .and_then(|url| non_blank(Some(url.clone())))
    }
}

/// Parses a Gutendex listing into at most `limit` books
fn parse_listing(body: &str, limit: usize) -> Result<Vec<NormalizedBook>, FetchError> {
    let listing: GutendexListing = parse_envelope(body)?;

    Ok(listing
        .results
        .into_iter()
        .filter_map(decode_record)
        .filter_map(normalize)
        .take(limit)
        .collect())
}

/// Maps one Gutendex record; records without an id are skipped
fn normalize(record: GutendexBook) -> Option<NormalizedBook> {
    let id = record.id?;
    let download_url = DOWNLOAD_FORMATS
        .iter()
        .copied()
        .find_map(|mime| record.format_url(mime));
    let cover_image = record.format_url(COVER_FORMAT);

    let authors = record
        .authors
        .into_iter()
        .filter_map(|person| non_blank(person.name))
        .collect();

    let mut book = NormalizedBook::new(id.to_string(), Source::Gutenberg)
        .with_title(non_blank(record.title))
        .with_authors(authors)
        .with_subjects(non_blank_list(record.subjects));

    if let Some(url) = download_url {
        book.download_url = url;
    }
    if let Some(cover) = cover_image {
        book.cover_image = cover;
    }
    book.download_count = record.download_count;
    book.languages = non_blank_list(record.languages);
    book.copyright = record.copyright;
    book.formats = record.formats;

    Some(book)
}
