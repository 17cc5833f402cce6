//! Error types for catalog queries.
//!
//! Every variant is a transient failure from the resolver's point of view: the
//! retry policy retries it and then downgrades it to "no match". A catalog
//! that explicitly reports zero records returns `Ok(None)` instead.

use thiserror::Error;

use crate::record::RecordError;

/// Errors raised by a single catalog request.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network-level failure (DNS, connection refused, TLS, body read)
    #[error("network error querying {url}: {source}\n  Suggestion: Check your connection or the catalog's base_url")]
    Network {
        /// Request URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded the configured per-request timeout
    #[error("timeout querying {url}\n  Suggestion: Raise --timeout or retry later")]
    Timeout {
        /// Request URL
        url: String,
    },

    /// The catalog answered with a non-success status
    #[error("HTTP {status} from {url}\n  Suggestion: The catalog may be down; it will be retried")]
    HttpStatus {
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response is neither a match nor an explicit zero-result answer
    #[error("unexpected response from {url}: {reason}\n  Suggestion: The catalog may have returned an error document")]
    UnexpectedResponse {
        /// Request URL
        url: String,
        /// What was wrong with the body
        reason: String,
    },

    /// The matched record could not be parsed
    #[error("unreadable record from {url}: {source}")]
    MalformedRecord {
        /// Request URL
        url: String,
        /// Parser failure
        #[source]
        source: RecordError,
    },

    /// The shared HTTP client could not be built
    #[error("cannot build catalog HTTP client: {reason}\n  Suggestion: Check proxy environment variables")]
    ClientBuild {
        /// Builder failure detail
        reason: String,
    },
}

impl CatalogError {
    /// Classifies a transport error, splitting out timeouts.
    pub fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an unexpected-response error.
    pub fn unexpected_response(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a record parse failure.
    pub fn malformed_record(url: impl Into<String>, source: RecordError) -> Self {
        Self::MalformedRecord {
            url: url.into(),
            source,
        }
    }

    /// Creates a client construction error.
    pub fn client_build(reason: impl Into<String>) -> Self {
        Self::ClientBuild {
            reason: reason.into(),
        }
    }
}
