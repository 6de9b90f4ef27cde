//! Normalized book model and provider adapters
//!
//! Every provider adapter maps its own wire format onto [`NormalizedBook`],
//! applying the same default and sentinel rules so downstream consumers can
//! rely on every core field being populated.

pub mod archive;
pub mod gutenberg;
pub mod open_library;

pub use archive::ArchiveClient;
pub use gutenberg::GutenbergClient;
pub use open_library::OpenLibraryClient;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cache::{CacheError, CacheKey, CacheManager};
use crate::guard::{guard, FetchError};
use crate::http::{Request, Transport};

/// Title used when a provider omits one
pub const UNTITLED: &str = "Untitled";

/// Author string used when a provider omits authors
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Link used when no download or detail page can be built
pub const NO_LINK: &str = "#";

/// Cover shown when a provider has no cover image
pub const DEFAULT_COVER: &str = "/images/default-book.jpg";

/// Maximum number of subjects kept per book
pub const MAX_SUBJECTS: usize = 3;

/// Shared, immutable snapshot of an ordered result set
pub type Books = Arc<[NormalizedBook]>;

/// The external catalogs books are aggregated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Public-domain classics via Gutendex
    #[serde(rename = "Project Gutenberg")]
    Gutenberg,
    /// General catalog with full-text filter
    #[serde(rename = "Open Library")]
    OpenLibrary,
    /// Internet Archive open-source books collection
    #[serde(rename = "Internet Archive")]
    InternetArchive,
}

impl Source {
    /// All providers, in aggregation order
    pub const ALL: [Source; 3] = [
        Source::Gutenberg,
        Source::OpenLibrary,
        Source::InternetArchive,
    ];

    /// Short machine name used in cache keys and on the command line
    pub fn key(&self) -> &'static str {
        match self {
            Source::Gutenberg => "gutenberg",
            Source::OpenLibrary => "openlibrary",
            Source::InternetArchive => "archive",
        }
    }

    /// Human-readable label stored on every normalized book
    pub fn label(&self) -> &'static str {
        match self {
            Source::Gutenberg => "Project Gutenberg",
            Source::OpenLibrary => "Open Library",
            Source::InternetArchive => "Internet Archive",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a provider name is not recognized
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown provider: '{0}'. Valid providers: gutenberg, openlibrary, archive")]
pub struct SourceParseError(pub String);

impl FromStr for Source {
    type Err = SourceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gutenberg" => Ok(Source::Gutenberg),
            "openlibrary" | "open-library" | "open_library" => Ok(Source::OpenLibrary),
            "archive" | "internet-archive" | "internetarchive" => Ok(Source::InternetArchive),
            _ => Err(SourceParseError(s.to_string())),
        }
    }
}

/// A book record in the common schema produced by every adapter
///
/// Optional provider-specific fields serialize as `null` (or an empty list or
/// map) rather than being omitted, so the key set is the same for every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBook {
    /// Provider-scoped identifier
    pub id: String,
    /// Book title, or `UNTITLED`
    pub title: String,
    /// Comma-joined author names, or `UNKNOWN_AUTHOR`
    pub authors: String,
    /// Up to `MAX_SUBJECTS` subjects
    pub subjects: Vec<String>,
    /// Provider the record came from
    pub source: Source,
    /// Detail page or direct content link, or `NO_LINK`
    pub download_url: String,
    /// Cover image URL, or `DEFAULT_COVER`
    pub cover_image: String,
    /// Download or popularity count reported by the provider
    pub download_count: Option<u64>,
    /// Year of first publication
    pub publish_year: Option<i32>,
    /// First listed ISBN
    pub isbn: Option<String>,
    /// Free-form date string as reported by the provider
    pub date: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Whether the provider has the full text available
    pub has_fulltext: Option<bool>,
    /// Language codes
    pub languages: Vec<String>,
    /// Copyright flag, if the provider reports one
    pub copyright: Option<bool>,
    /// Alternative content links keyed by MIME type; empty outside Gutenberg
    pub formats: BTreeMap<String, String>,
}

impl NormalizedBook {
    /// Creates a record with every core field set to its sentinel
    pub fn new(id: impl Into<String>, source: Source) -> Self {
        Self {
            id: id.into(),
            title: UNTITLED.to_string(),
            authors: UNKNOWN_AUTHOR.to_string(),
            subjects: Vec::new(),
            source,
            download_url: NO_LINK.to_string(),
            cover_image: DEFAULT_COVER.to_string(),
            download_count: None,
            publish_year: None,
            isbn: None,
            date: None,
            description: None,
            has_fulltext: None,
            languages: Vec::new(),
            copyright: None,
            formats: BTreeMap::new(),
        }
    }

    /// Sets the title unless the provider gave none
    fn with_title(mut self, title: Option<String>) -> Self {
        if let Some(title) = title {
            self.title = title;
        }
        self
    }

    /// Sets the comma-joined author string unless the list is empty
    fn with_authors(mut self, authors: Vec<String>) -> Self {
        if !authors.is_empty() {
            self.authors = authors.join(", ");
        }
        self
    }

    /// Keeps at most `MAX_SUBJECTS` subjects
    fn with_subjects(mut self, mut subjects: Vec<String>) -> Self {
        subjects.truncate(MAX_SUBJECTS);
        self.subjects = subjects;
        self
    }
}

/// Shared fetch path for the adapters: cache lookup, guarded request,
/// normalization and write-back
#[derive(Clone)]
pub(crate) struct Upstream {
    transport: Arc<dyn Transport>,
    cache: CacheManager,
    deadline: Duration,
}

impl Upstream {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        cache: CacheManager,
        deadline: Duration,
    ) -> Self {
        Self {
            transport,
            cache,
            deadline,
        }
    }

    /// Returns cached books for `(source, query, limit)` or performs `request`
    ///
    /// Upstream failures are logged and yield an empty result, which is not
    /// cached. Only a broken cache is reported as an error.
    pub(crate) async fn fetch_books<P>(
        &self,
        source: Source,
        query: &str,
        limit: usize,
        request: Request,
        parse: P,
    ) -> Result<Books, CacheError>
    where
        P: FnOnce(&str, usize) -> Result<Vec<NormalizedBook>, FetchError>,
    {
        let key = CacheKey::new(source.key(), query, limit);
        if let Some(books) = self.cache.get(&key)? {
            tracing::debug!(%key, "Cache hit");
            return Ok(books);
        }
        tracing::debug!(%key, url = %request.url, "Cache miss; fetching from provider");

        let result = guard(self.deadline, self.transport.get(&request))
            .await
            .and_then(|body| parse(&body, limit));

        match result {
            Ok(mut books) => {
                books.truncate(limit);
                let books: Books = books.into();
                self.cache.put(key, Arc::clone(&books))?;
                Ok(books)
            }
            Err(err) => {
                tracing::warn!(
                    source = source.key(),
                    error = %err,
                    "Provider fetch failed; returning no books"
                );
                Ok(Books::from(Vec::new()))
            }
        }
    }
}

/// Decodes a response body into a provider envelope
///
/// Undecodable JSON is a transport failure; valid JSON without the expected
/// top-level structure is a shape validation failure.
fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::UpstreamTransport(format!("Invalid JSON: {}", e)))?;
    serde_json::from_value(root)
        .map_err(|e| FetchError::ShapeValidation(e.to_string()))
}

/// Decodes one wire record; records that do not fit the struct are dropped
fn decode_record<T: DeserializeOwned>(record: Value) -> Option<T> {
    serde_json::from_value(record).ok()
}

/// Deserializes an explicit `null` as the type's default
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Trims a string, treating blank values as absent
fn non_blank(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trims every entry and drops blank ones
fn non_blank_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| non_blank(Some(value)))
        .collect()
}

/// A metadata field given either as a single string or as a list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

impl OneOrMany {
    /// Non-blank entries, in order
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => non_blank_list(vec![value]),
            OneOrMany::Many(values) => non_blank_list(values.into_iter().flatten().collect()),
        }
    }

    /// The first non-blank entry
    fn first(self) -> Option<String> {
        self.into_vec().into_iter().next()
    }
}

/// A counter reported as a number or as numeric text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Count {
    Whole(u64),
    Fractional(f64),
    Text(String),
}

impl Count {
    /// The count as a non-negative integer, if it is one
    fn value(&self) -> Option<u64> {
        match self {
            Count::Whole(n) => Some(*n),
            Count::Fractional(f) => (*f >= 0.0).then(|| *f as u64),
            Count::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_from_str_aliases() {
        assert_eq!("gutenberg".parse::<Source>(), Ok(Source::Gutenberg));
        assert_eq!("OpenLibrary".parse::<Source>(), Ok(Source::OpenLibrary));
        assert_eq!("open-library".parse::<Source>(), Ok(Source::OpenLibrary));
        assert_eq!("archive".parse::<Source>(), Ok(Source::InternetArchive));
        assert_eq!(
            "internet-archive".parse::<Source>(),
            Ok(Source::InternetArchive)
        );
    }

    #[test]
    fn test_source_from_str_invalid() {
        let err = "goodreads".parse::<Source>().unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
        assert!(err.to_string().contains("goodreads"));
    }

    #[test]
    fn test_source_serializes_as_label() {
        for source in Source::ALL {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.label()));
        }
    }

    #[test]
    fn test_new_book_has_sentinels() {
        let book = NormalizedBook::new("42", Source::InternetArchive);

        assert_eq!(book.title, UNTITLED);
        assert_eq!(book.authors, UNKNOWN_AUTHOR);
        assert_eq!(book.download_url, NO_LINK);
        assert_eq!(book.cover_image, DEFAULT_COVER);
        assert!(book.subjects.is_empty());
    }

    #[test]
    fn test_book_serializes_every_key() {
        let book = NormalizedBook::new("1", Source::Gutenberg);
        let value = serde_json::to_value(&book).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "id",
            "title",
            "authors",
            "subjects",
            "source",
            "downloadUrl",
            "coverImage",
            "downloadCount",
            "publishYear",
            "isbn",
            "date",
            "description",
            "hasFulltext",
            "languages",
            "copyright",
            "formats",
        ] {
            assert!(object.contains_key(key), "Missing key {}", key);
        }
        assert!(object["isbn"].is_null());
        assert_eq!(object["source"], "Project Gutenberg");
        assert_eq!(object["formats"], json!({}));
    }

    #[test]
    fn test_with_subjects_truncates_to_three() {
        let subjects = ["a", "b", "c", "d", "e"].map(String::from).to_vec();
        let book = NormalizedBook::new("1", Source::OpenLibrary).with_subjects(subjects);
        assert_eq!(book.subjects, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_with_authors_keeps_sentinel_for_empty_list() {
        let book = NormalizedBook::new("1", Source::OpenLibrary).with_authors(Vec::new());
        assert_eq!(book.authors, UNKNOWN_AUTHOR);

        let book = NormalizedBook::new("1", Source::OpenLibrary)
            .with_authors(vec!["Jane Austen".into(), "Anon".into()]);
        assert_eq!(book.authors, "Jane Austen, Anon");
    }

    #[test]
    fn test_one_or_many_accepts_scalar_and_list() {
        let one: OneOrMany = serde_json::from_value(json!("  Poetry ")).unwrap();
        assert_eq!(one.into_vec(), vec!["Poetry"]);

        let many: OneOrMany = serde_json::from_value(json!(["", "A", null, "B"])).unwrap();
        assert_eq!(many.clone().into_vec(), vec!["A", "B"]);
        assert_eq!(many.first(), Some("A".to_string()));

        let blank: OneOrMany = serde_json::from_value(json!("")).unwrap();
        assert_eq!(blank.first(), None);
    }

    #[test]
    fn test_count_accepts_numbers_and_numeric_strings() {
        let count = |value: Value| serde_json::from_value::<Count>(value).unwrap().value();
        assert_eq!(count(json!(120)), Some(120));
        assert_eq!(count(json!(12.0)), Some(12));
        assert_eq!(count(json!("77")), Some(77));
        assert_eq!(count(json!(-3)), None);
        assert_eq!(count(json!("many")), None);
    }

    #[derive(Debug, Deserialize)]
    struct Envelope {
        results: Vec<Value>,
    }

    #[test]
    fn test_parse_envelope_requires_structure() {
        let envelope: Envelope = parse_envelope(r#"{"results": [1, 2]}"#).unwrap();
        assert_eq!(envelope.results.len(), 2);

        let err = parse_envelope::<Envelope>(r#"{"detail": "missing"}"#).unwrap_err();
        assert!(matches!(err, FetchError::ShapeValidation(_)));

        let err = parse_envelope::<Envelope>(r#"{"results": "nope"}"#).unwrap_err();
        assert!(matches!(err, FetchError::ShapeValidation(_)));
    }

    #[test]
    fn test_parse_envelope_rejects_garbage_as_transport_error() {
        let err = parse_envelope::<Envelope>("<html>busy</html>").unwrap_err();
        assert!(matches!(err, FetchError::UpstreamTransport(_)));
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Record {
        #[serde(deserialize_with = "nullable")]
        tags: Vec<String>,
    }

    #[test]
    fn test_nullable_treats_null_as_empty() {
        let record: Record = serde_json::from_value(json!({ "tags": null })).unwrap();
        assert!(record.tags.is_empty());

        let record: Record = serde_json::from_value(json!({})).unwrap();
        assert!(record.tags.is_empty());

        let record: Record = serde_json::from_value(json!({ "tags": ["a"] })).unwrap();
        assert_eq!(record.tags, vec!["a"]);
    }

    #[test]
    fn test_decode_record_drops_mismatched_records() {
        assert!(decode_record::<Envelope>(json!("junk")).is_none());
        assert!(decode_record::<Envelope>(json!({"results": []})).is_some());
    }
}
