#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![allow(clippy::result_large_err)]

// Tracing target constants for consistent logging
pub const TRACING_TARGET_CLIENT: &str = "strato_storage::client";
pub const TRACING_TARGET_ITER: &str = "strato_storage::iter";
pub const TRACING_TARGET_BUCKETS: &str = "strato_storage::buckets";
pub const TRACING_TARGET_OBJECTS: &str = "strato_storage::objects";

pub mod client;
pub mod iter;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

// Re-export for convenience
pub use crate::client::{StorageClient, StorageConfig, StorageCredentials, Transport};
pub use crate::iter::{BucketIter, ObjectIter, PageDecoder, PageIter};
pub use crate::types::{Bucket, BucketRef, Object, ObjectRef};

/// Error type for object-storage operations.
#[derive(Debug, thiserror::Error)]
#[must_use = "errors should be handled appropriately"]
pub enum Error {
    /// Configuration error.
    ///
    /// This includes invalid configuration parameters, missing required
    /// settings, malformed URLs, or other issues with the client setup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A local precondition was violated before any request was issued.
    ///
    /// Deriving a resource path requires the resource's identity (a
    /// non-empty name, an owning bucket). Nothing is sent over the wire
    /// when this occurs.
    #[error("Invalid resource identity: {0}")]
    Precondition(String),

    /// The targeted resource does not exist (HTTP 404).
    ///
    /// Lookup conveniences translate this into `None`; page fetches inside
    /// a listing propagate it unchanged.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The server answered with a non-2xx status other than 404.
    ///
    /// Carries the response metadata for diagnostics.
    #[error("Server error (status {status})")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: std::collections::HashMap<String, String>,
        /// Response body, as text.
        body: String,
    },

    /// The response could not be interpreted as expected.
    ///
    /// Either the declared content type was not JSON where JSON was
    /// expected, or a JSON document was missing required fields (a listing
    /// without `items`, a record without `name`).
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// A listing was driven past its terminal page.
    ///
    /// This is caller misuse, not a server condition; the iterator must be
    /// reset before it can fetch again.
    #[error("No more pages; reset the iterator before fetching again")]
    Exhausted,

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport failure (connect, timeout, protocol).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Returns whether this error indicates a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns whether this error reports an exhausted listing.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Error::Exhausted)
    }

    /// Returns whether retrying the same operation could succeed.
    ///
    /// Server-side 5xx statuses and transport failures are considered
    /// transient; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Server { status, .. } => (500..600).contains(status),
            Error::Http(_) => true,
            _ => false,
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::NotFound(_) => Some(404),
            Error::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Specialized [`Result`] type for storage operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_predicate() {
        let err = Error::NotFound("GET /b/missing".into());
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_server_error_retryability() {
        let transient = Error::Server {
            status: 503,
            headers: Default::default(),
            body: String::new(),
        };
        assert!(transient.is_retryable());
        assert_eq!(transient.status(), Some(503));

        let permanent = Error::Server {
            status: 403,
            headers: Default::default(),
            body: String::new(),
        };
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn test_exhausted_is_local() {
        let err = Error::Exhausted;
        assert!(err.is_exhausted());
        assert_eq!(err.status(), None);
        assert!(!err.is_retryable());
    }
}
