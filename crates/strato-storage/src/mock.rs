//! In-memory mock transport for testing.
//!
//! [`MockTransport`] implements the [`Transport`] capability against a
//! queue of canned responses and records every request it receives, so
//! tests can drive listings and assert on fetch counts and query
//! parameters without a live endpoint.
//!
//! This module is available to this crate's own tests and, behind the
//! `test-utils` feature, to downstream crates:
//!
//! ```toml
//! [dev-dependencies]
//! strato-storage = { version = "...", features = ["test-utils"] }
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;

use crate::client::Transport;
use crate::{Error, Result};

/// One request observed by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method, as text.
    pub method: String,
    /// Request path below the API root.
    pub path: String,
    /// Query parameters, exactly as passed by the caller.
    pub query: Vec<(String, String)>,
}

/// A canned answer for one request.
#[derive(Debug)]
enum CannedResponse {
    Json(Value),
    Raw(Bytes),
    Error(Error),
}

/// Transport double that replays canned responses in FIFO order.
///
/// Responses are consumed one per request; a request arriving with an
/// empty queue fails with a configuration error rather than panicking.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<CannedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON response.
    pub fn push_json(&self, value: Value) {
        self.push(CannedResponse::Json(value));
    }

    /// Queues a raw-bytes response.
    pub fn push_raw(&self, data: impl Into<Bytes>) {
        self.push(CannedResponse::Raw(data.into()));
    }

    /// Queues an error.
    pub fn push_error(&self, error: Error) {
        self.push(CannedResponse::Error(error));
    }

    /// Returns every request observed so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mock lock poisoned").clone()
    }

    fn push(&self, response: CannedResponse) {
        self.responses
            .lock()
            .expect("mock lock poisoned")
            .push_back(response);
    }

    fn record(&self, method: &Method, path: &str, query: &[(String, String)]) {
        self.requests
            .lock()
            .expect("mock lock poisoned")
            .push(RecordedRequest {
                method: method.to_string(),
                path: path.to_string(),
                query: query.to_vec(),
            });
    }

    fn pop(&self) -> Result<CannedResponse> {
        self.responses
            .lock()
            .expect("mock lock poisoned")
            .pop_front()
            .ok_or_else(|| Error::Config("MockTransport: no canned response queued".to_string()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        _body: Option<Value>,
    ) -> Result<Value> {
        self.record(&method, path, query);

        match self.pop()? {
            CannedResponse::Json(value) => Ok(value),
            CannedResponse::Raw(_) => Err(Error::Malformed(
                "Expected a JSON response, got raw bytes".to_string(),
            )),
            CannedResponse::Error(error) => Err(error),
        }
    }

    async fn request_raw(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Bytes> {
        self.record(&method, path, query);

        match self.pop()? {
            CannedResponse::Raw(data) => Ok(data),
            CannedResponse::Json(value) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
            CannedResponse::Error(error) => Err(error),
        }
    }
}
