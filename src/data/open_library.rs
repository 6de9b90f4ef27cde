//! Open Library search adapter
//!
//! Free-text search restricted to works with full text available.

use serde::Deserialize;
use serde_json::Value;

use super::{
    decode_record, non_blank, non_blank_list, nullable, parse_envelope, Books, NormalizedBook,
    Source, Upstream,
};
use crate::cache::CacheError;
use crate::guard::FetchError;
use crate::http::Request;

/// Query used when the caller supplies none
pub const DEFAULT_QUERY: &str = "popular";

/// Public site that work keys are relative to
const SITE_URL: &str = "https://openlibrary.org";

/// Cover image service
const COVERS_URL: &str = "https://covers.openlibrary.org/b/id";

/// Client for the Open Library search API
#[derive(Clone)]
pub struct OpenLibraryClient {
    upstream: Upstream,
    base_url: String,
}

impl OpenLibraryClient {
    pub(crate) fn new(upstream: Upstream, base_url: impl Into<String>) -> Self {
        Self {
            upstream,
            base_url: base_url.into(),
        }
    }

    /// Searches for up to `limit` books matching `query`
    ///
    /// A blank query searches for `DEFAULT_QUERY`. Provider failures yield an
    /// empty list; only a broken cache is an error.
    pub async fn fetch(&self, query: &str, limit: usize) -> Result<Books, CacheError> {
        let query = match query.trim() {
            "" => DEFAULT_QUERY,
            trimmed => trimmed,
        };
        self.upstream
            .fetch_books(
                Source::OpenLibrary,
                query,
                limit,
                self.search_request(query, limit),
                parse_search,
            )
            .await
    }

    fn search_request(&self, query: &str, limit: usize) -> Request {
        Request::new(format!("{}/search.json", self.base_url.trim_end_matches('/')))
            .param("q", query)
            .param("limit", limit)
            .param("has_fulltext", true)
    }
}

/// Search response envelope
#[derive(Debug, Deserialize)]
struct OpenLibrarySearch {
    docs: Vec<Value>,
}

/// A single work from the search results
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenLibraryDoc {
    key: Option<String>,
    title: Option<String>,
    #[serde(deserialize_with = "nullable")]
    author_name: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    subject: Vec<String>,
    first_publish_year: Option<i32>,
    #[serde(deserialize_with = "nullable")]
    isbn: Vec<String>,
    cover_i: Option<i64>,
    has_fulltext: Option<bool>,
    #[serde(deserialize_with = "nullable")]
    language: Vec<String>,
}

fn parse_search(body: &str, limit: usize) -> Result<Vec<NormalizedBook>, FetchError> {
    let search: OpenLibrarySearch = parse_envelope(body)?;

    Ok(search
        .docs
        .into_iter()
        .filter_map(decode_record)
        .filter_map(normalize)
        .take(limit)
        .collect())
}

fn normalize(doc: OpenLibraryDoc) -> Option<NormalizedBook> {
    let key = non_blank(doc.key)?;
    let download_url = if key.starts_with('/') {
        format!("{}{}", SITE_URL, key)
    } else {
        format!("{}/{}", SITE_URL, key)
    };

    let mut book = NormalizedBook::new(key, Source::OpenLibrary)
        .with_title(non_blank(doc.title))
        .with_authors(non_blank_list(doc.author_name))
        .with_subjects(non_blank_list(doc.subject));

    book.download_url = download_url;
    if let Some(cover_id) = doc.cover_i {
        book.cover_image = format!("{}/{}-M.jpg", COVERS_URL, cover_id);
    }
    book.publish_year = doc.first_publish_year;
    book.isbn = non_blank_list(doc.isbn).into_iter().next();
    book.has_fulltext = doc.has_fulltext;
    book.languages = non_blank_list(doc.language);

    Some(book)
}
