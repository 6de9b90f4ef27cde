//! HTTP transport used by the source adapters
//!
//! The adapters talk to providers through the [`Transport`] trait so that the
//! real `reqwest` client can be swapped for a scripted double in tests.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::guard::FetchError;

/// A GET request: endpoint plus query parameters
///
/// Parameters are kept separate from the URL so the transport can encode
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Endpoint without a query string
    pub url: String,
    /// Query parameters, in order
    pub query: Vec<(&'static str, String)>,
}

impl Request {
    /// Creates a request for `url` with no parameters
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
        }
    }

    /// Appends a query parameter
    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    /// Looks up the first value of a query parameter
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Status and body of a completed GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// Whether the status code is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests on behalf of the adapters
///
/// Implementations must stop waiting for bytes when the returned future is
/// dropped; the deadline guard relies on this for cancellation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a GET request and returns the status with the full body
    ///
    /// Non-success statuses are returned as `Ok`; classifying them is the
    /// guard's job. Connection-level failures are `FetchError::UpstreamTransport`.
    async fn get(&self, request: &Request) -> Result<RawResponse, FetchError>;
}

/// Errors that can occur while setting up the HTTP transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be built (TLS backend or invalid settings)
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// `reqwest`-backed transport that identifies itself with a `User-Agent`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport sending `user_agent` with every request
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(client))
    }

    /// Wraps an already configured HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &Request) -> Result<RawResponse, FetchError> {
        tracing::debug!(
            url = %request.url,
            query = ?request.query,
            "Sending upstream request"
        );
        let response = self
            .client
            .get(&request.url)
            .query(&request.query)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}
