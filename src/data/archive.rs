//! Internet Archive adapter
//!
//! Lists the most downloaded items of the `opensource_books` collection
//! through the advanced search API. Archive metadata is loosely typed: most
//! fields may be a single string or a list.

use serde::Deserialize;
use serde_json::Value;

use super::{
    decode_record, non_blank, parse_envelope, Books, Count, NormalizedBook, OneOrMany, Source,
    Upstream,
};
use crate::cache::CacheError;
use crate::guard::FetchError;
use crate::http::Request;

/// Query mode used in cache keys for the collection listing
pub const COLLECTION_MODE: &str = "opensource_books";

/// Fields requested from the search API
const FIELDS: &str = "identifier,title,creator,subject,downloads,date,description";

/// Public detail page prefix
const DETAILS_URL: &str = "https://archive.org/details";

/// Thumbnail service prefix
const THUMBNAIL_URL: &str = "https://archive.org/services/img";

/// Client for the Internet Archive open-source books collection
#[derive(Clone)]
pub struct ArchiveClient {
    upstream: Upstream,
    base_url: String,
}

impl ArchiveClient {
    pub(crate) fn new(upstream: Upstream, base_url: impl Into<String>) -> Self {
        Self {
            upstream,
            base_url: base_url.into(),
        }
    }

    /// Fetches up to `limit` of the collection's most downloaded items
    ///
    /// Provider failures yield an empty list; only a broken cache is an error.
    pub async fn fetch(&self, limit: usize) -> Result<Books, CacheError> {
        self.upstream
            .fetch_books(
                Source::InternetArchive,
                COLLECTION_MODE,
                limit,
                self.collection_request(limit),
                parse_collection,
            )
            .await
    }

    fn collection_request(&self, limit: usize) -> Request {
        Request::new(format!(
            "{}/advancedsearch.php",
            self.base_url.trim_end_matches('/')
        ))
        .param("q", format!("collection:{}", COLLECTION_MODE))
        .param("fl", FIELDS)
        .param("sort[]", "downloads desc")
        .param("rows", limit)
        .param("page", 1)
        .param("output", "json")
    }
}

/// Advanced search envelope
#[derive(Debug, Deserialize)]
struct ArchiveSearch {
    response: ArchiveDocs,
}

#[derive(Debug, Deserialize)]
struct ArchiveDocs {
    docs: Vec<Value>,
}

/// A single item from the collection listing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArchiveDoc {
    identifier: Option<String>,
    title: Option<OneOrMany>,
    creator: Option<OneOrMany>,
    subject: Option<OneOrMany>,
    downloads: Option<Count>,
    date: Option<String>,
    description: Option<OneOrMany>,
}

fn parse_collection(body: &str, limit: usize) -> Result<Vec<NormalizedBook>, FetchError> {
    let search: ArchiveSearch = parse_envelope(body)?;

    Ok(search
        .response
        .docs
        .into_iter()
        .filter_map(decode_record)
        .filter_map(normalize)
        .take(limit)
        .collect())
}

fn normalize(doc: ArchiveDoc) -> Option<NormalizedBook> {
    let identifier = non_blank(doc.identifier)?;
    let list = |field: Option<OneOrMany>| field.map(OneOrMany::into_vec).unwrap_or_default();

    let mut book = NormalizedBook::new(identifier.clone(), Source::InternetArchive)
        .with_title(doc.title.and_then(OneOrMany::first))
        .with_authors(list(doc.creator))
        .with_subjects(list(doc.subject));

    book.download_url = format!("{}/{}", DETAILS_URL, identifier);
    book.cover_image = format!("{}/{}", THUMBNAIL_URL, identifier);
    book.download_count = doc.downloads.as_ref().and_then(Count::value);
    book.date = non_blank(doc.date);
    book.description = match list(doc.description) {
        parts if parts.is_empty() => None,
        parts => Some(parts.join("\n")),
    };

    Some(book)
}
