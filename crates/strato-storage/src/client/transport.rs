//! The request capability consumed by the rest of the crate.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;

use crate::Result;

/// A single-request capability against the storage API.
///
/// The pagination engine and the domain handles treat the connection as an
/// opaque collaborator: one method call is one HTTP request against a path
/// below the API root. [`StorageClient`](crate::StorageClient) is the real
/// implementation; tests drive listings through an in-memory mock instead.
///
/// Implementations must surface HTTP 404 as [`Error::NotFound`] and any
/// other non-2xx status as [`Error::Server`], so callers can tell absence
/// apart from failure without inspecting status codes themselves.
///
/// [`Error::NotFound`]: crate::Error::NotFound
/// [`Error::Server`]: crate::Error::Server
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one API request and decodes the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) if the response
    /// declares a non-JSON content type, in addition to the status-code
    /// mapping described on the trait.
    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value>;

    /// Issues one API request and returns the raw response body.
    async fn request_raw(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Bytes>;
}
