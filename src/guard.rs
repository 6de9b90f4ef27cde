//! Deadline guard for outbound provider requests
//!
//! Every upstream call goes through [`guard`], which bounds it with a hard
//! deadline and classifies the outcome into a [`FetchError`]. The guard never
//! retries.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::http::RawResponse;

/// Default deadline for a single outbound request
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(10_000);

/// Errors that can occur while fetching from a provider
///
/// These never leave the source adapters; they are logged and replaced by an
/// empty result there.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete before the deadline
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The provider answered with a non-success status code
    #[error("Upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    /// Connection, DNS, TLS or body decoding failure
    #[error("Upstream transport failed: {0}")]
    UpstreamTransport(String),

    /// The response JSON lacks the expected top-level structure
    #[error("Unexpected response shape: {0}")]
    ShapeValidation(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::UpstreamTransport(err.to_string())
    }
}

/// Runs `request` with a hard deadline
///
/// If the deadline elapses first, the request future is dropped, which makes
/// the transport stop waiting for bytes, and `FetchError::Timeout` is
/// returned. The timer lives inside the returned future and is released on
/// every exit path.
///
/// # Returns
/// * `Ok(String)` - The response body of a 2xx response
/// * `Err(FetchError)` - Timeout, non-success status, or transport failure
pub async fn guard<F>(deadline: Duration, request: F) -> Result<String, FetchError>
where
    F: Future<Output = Result<RawResponse, FetchError>>,
{
    match tokio::time::timeout(deadline, request).await {
        Err(_elapsed) => Err(FetchError::Timeout(deadline)),
        Ok(Err(err)) => Err(err),
        Ok(Ok(response)) if !response.is_success() => {
            Err(FetchError::UpstreamStatus(response.status))
        }
        Ok(Ok(response)) => Ok(response.body),
    }
}
