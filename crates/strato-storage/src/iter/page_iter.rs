//! Generic engine for walking token-paginated listing endpoints.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::Stream;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::Transport;
use crate::{Error, Result, TRACING_TARGET_ITER};

/// Query parameter carrying the continuation token between pages.
const PAGE_TOKEN_PARAM: &str = "pageToken";

/// Decodes one page of raw listing records into domain objects.
///
/// This is the engine's only point of specialization: the bucket listing
/// and the object listing differ solely in their bound path and in how a
/// raw record becomes a domain object. Records must be decoded in the
/// order received.
pub trait PageDecoder {
    /// The domain object this decoder produces.
    type Item;

    /// Decodes the raw records of one page, in order.
    fn decode_page(&self, items: &[Value]) -> Result<Vec<Self::Item>>;
}

/// Wire shape of one listing response page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    items: Option<Vec<Value>>,
    next_page_token: Option<String>,
}

/// A lazy walk over a token-paginated listing endpoint.
///
/// The iterator holds a cursor over the pages of one listing query: the
/// bound path, the number of pages fetched so far, and the continuation
/// token the last page returned. Items are pulled one at a time with
/// [`next`](Self::next); pages are fetched on demand, strictly one after
/// the other, and never prefetched. A continuation token is only valid for
/// the exact query that produced it, which is why the path is fixed at
/// construction.
///
/// The cursor is single-owner: iterating requires `&mut self`, and two
/// consumers of the same logical listing must each construct their own
/// iterator. Once the final page has been seen, explicit page fetches fail
/// with [`Error::Exhausted`] until [`reset`](Self::reset) rewinds the
/// cursor to the beginning.
pub struct PageIter<D: PageDecoder> {
    transport: Arc<dyn Transport>,
    path: String,
    decoder: D,
    page_number: u64,
    next_page_token: Option<String>,
    pending: VecDeque<D::Item>,
}

impl<D: PageDecoder> PageIter<D> {
    /// Creates an iterator over the listing at `path`, decoding each page
    /// with `decoder`.
    pub fn new(transport: Arc<dyn Transport>, path: impl Into<String>, decoder: D) -> Self {
        Self {
            transport,
            path: path.into(),
            decoder,
            page_number: 0,
            next_page_token: None,
            pending: VecDeque::new(),
        }
    }

    /// Returns the listing path this iterator is bound to.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the number of pages fetched so far.
    #[inline]
    pub fn page_number(&self) -> u64 {
        self.page_number
    }

    /// Returns whether another page can be fetched.
    ///
    /// True before the first fetch unconditionally; afterwards, exactly
    /// when the most recent page carried a continuation token.
    pub fn has_next_page(&self) -> bool {
        if self.page_number == 0 {
            return true;
        }

        self.next_page_token.is_some()
    }

    /// Fetches the next page and decodes its items.
    ///
    /// The request carries the `pageToken` parameter when a continuation
    /// token is held, and omits it entirely on the first page. Iterator
    /// state advances only after the page has been fetched, parsed, and
    /// decoded; any failure leaves the cursor exactly where it was, so the
    /// same page can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] without issuing a request if the
    /// listing has no next page. Transport errors (a 404 included) and
    /// malformed pages propagate unchanged.
    pub async fn fetch_page(&mut self) -> Result<Vec<D::Item>> {
        if !self.has_next_page() {
            return Err(Error::Exhausted);
        }

        debug!(
            target: TRACING_TARGET_ITER,
            path = %self.path,
            page = self.page_number,
            "Fetching listing page"
        );

        let raw = self
            .transport
            .request_json(Method::GET, &self.path, &self.query_params(), None)
            .await?;

        let page: ListPage = serde_json::from_value(raw)
            .map_err(|err| Error::Malformed(format!("Invalid listing response: {err}")))?;
        let records = page
            .items
            .ok_or_else(|| Error::Malformed("Listing response missing `items`".to_string()))?;

        let items = self.decoder.decode_page(&records)?;

        // Commit the cursor only now that the page decoded cleanly.
        self.page_number += 1;
        self.next_page_token = page.next_page_token.filter(|token| !token.is_empty());

        debug!(
            target: TRACING_TARGET_ITER,
            path = %self.path,
            page = self.page_number,
            count = items.len(),
            has_more = self.next_page_token.is_some(),
            "Listing page fetched"
        );

        Ok(items)
    }

    /// Yields the next item of the listing, fetching pages on demand.
    ///
    /// Returns `Ok(None)` once the final page has been drained. Pages that
    /// are empty but carry a continuation token do not end the sequence.
    pub async fn next(&mut self) -> Result<Option<D::Item>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(Some(item));
            }

            if !self.has_next_page() {
                return Ok(None);
            }

            let items = self.fetch_page().await?;
            self.pending.extend(items);
        }
    }

    /// Drains the remaining sequence into a fully materialized, ordered
    /// list.
    pub async fn all(&mut self) -> Result<Vec<D::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }

        Ok(items)
    }

    /// Rewinds the cursor to the beginning of the listing.
    ///
    /// The iterator returns to its just-constructed state: page zero, no
    /// token, nothing buffered. Re-driving it reproduces the sequence,
    /// assuming a stable backing collection.
    pub fn reset(&mut self) {
        self.page_number = 0;
        self.next_page_token = None;
        self.pending.clear();
    }

    fn query_params(&self) -> Vec<(String, String)> {
        match &self.next_page_token {
            Some(token) => vec![(PAGE_TOKEN_PARAM.to_string(), token.clone())],
            None => Vec::new(),
        }
    }
}

impl<D: PageDecoder> PageIter<D> {
    /// Adapts the iterator into a [`Stream`] of items.
    ///
    /// The stream pulls from the cursor and inherits its sequencing: one
    /// page request in flight at a time, no prefetch.
    pub fn into_stream(self) -> impl Stream<Item = Result<D::Item>> {
        async_stream::try_stream! {
            let mut iter = self;
            while let Some(item) = iter.next().await? {
                yield item;
            }
        }
    }
}

impl<D: PageDecoder> std::fmt::Debug for PageIter<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageIter")
            .field("path", &self.path)
            .field("page_number", &self.page_number)
            .field("has_next_page", &self.has_next_page())
            .field("buffered", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::mock::MockTransport;

    /// Decodes records down to their `name` field, for engine tests that
    /// don't care about domain objects.
    struct NameDecoder;

    impl PageDecoder for NameDecoder {
        type Item = String;

        fn decode_page(&self, items: &[Value]) -> Result<Vec<String>> {
            items
                .iter()
                .map(|record| {
                    record
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .ok_or_else(|| Error::Malformed("Record missing `name`".to_string()))
                })
                .collect()
        }
    }

    fn iter_over(transport: &Arc<MockTransport>) -> PageIter<NameDecoder> {
        PageIter::new(transport.clone(), "/things", NameDecoder)
    }

    #[tokio::test]
    async fn test_two_page_scenario() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({
            "items": [{"name": "A"}, {"name": "B"}],
            "nextPageToken": "t1",
        }));
        transport.push_json(json!({
            "items": [{"name": "C"}],
        }));

        let mut iter = iter_over(&transport);
        let mut seen = Vec::new();
        while let Some(name) = iter.next().await.unwrap() {
            seen.push(name);
        }

        assert_eq!(seen, vec!["A", "B", "C"]);
        assert_eq!(iter.page_number(), 2);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/things");
        assert!(requests[0].query.is_empty());
        assert_eq!(
            requests[1].query,
            vec![("pageToken".to_string(), "t1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_has_next_page_truth_table() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"items": [{"name": "A"}], "nextPageToken": "t1"}));
        transport.push_json(json!({"items": []}));

        let mut iter = iter_over(&transport);
        // Fresh: true regardless of token state.
        assert!(iter.has_next_page());

        iter.fetch_page().await.unwrap();
        // In progress: token present.
        assert!(iter.has_next_page());

        iter.fetch_page().await.unwrap();
        // Exhausted: final page carried no token.
        assert!(!iter.has_next_page());
    }

    #[tokio::test]
    async fn test_fetch_past_exhaustion() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"items": [{"name": "A"}]}));

        let mut iter = iter_over(&transport);
        iter.fetch_page().await.unwrap();

        let err = iter.fetch_page().await.unwrap_err();
        assert!(err.is_exhausted());
        // No request was issued and the cursor did not move.
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(iter.page_number(), 1);
    }

    #[tokio::test]
    async fn test_reset_restores_fresh_state() {
        let pages = || {
            (
                json!({"items": [{"name": "A"}], "nextPageToken": "t1"}),
                json!({"items": [{"name": "B"}]}),
            )
        };

        let transport = Arc::new(MockTransport::new());
        let (first, last) = pages();
        transport.push_json(first);
        transport.push_json(last);

        let mut iter = iter_over(&transport);
        let first_run = iter.all().await.unwrap();
        assert!(!iter.has_next_page());

        iter.reset();
        assert_eq!(iter.page_number(), 0);
        assert!(iter.has_next_page());

        let (first, last) = pages();
        transport.push_json(first);
        transport.push_json(last);
        let second_run = iter.all().await.unwrap();

        assert_eq!(first_run, second_run);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_for_retry() {
        let transport = Arc::new(MockTransport::new());
        transport.push_error(Error::Server {
            status: 503,
            headers: Default::default(),
            body: String::new(),
        });

        let mut iter = iter_over(&transport);
        let err = iter.fetch_page().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(iter.page_number(), 0);
        assert!(iter.has_next_page());

        // Retrying the same page now succeeds.
        transport.push_json(json!({"items": [{"name": "A"}]}));
        let items = iter.fetch_page().await.unwrap();
        assert_eq!(items, vec!["A"]);
        assert_eq!(iter.page_number(), 1);
    }

    #[tokio::test]
    async fn test_not_found_during_page_fetch_is_an_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_error(Error::NotFound("GET /things".into()));

        let mut iter = iter_over(&transport);
        let err = iter.next().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_empty_token_treated_as_absent() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({
            "items": [{"name": "A"}],
            "nextPageToken": "",
        }));

        let mut iter = iter_over(&transport);
        iter.fetch_page().await.unwrap();
        assert!(!iter.has_next_page());
    }

    #[tokio::test]
    async fn test_missing_items_is_malformed() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"nextPageToken": "t1"}));

        let mut iter = iter_over(&transport);
        let err = iter.fetch_page().await.unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        // The malformed page was not committed.
        assert_eq!(iter.page_number(), 0);
    }

    #[tokio::test]
    async fn test_decoder_error_leaves_state() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"items": [{"size": 3}], "nextPageToken": "t1"}));

        let mut iter = iter_over(&transport);
        let err = iter.fetch_page().await.unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        assert_eq!(iter.page_number(), 0);
        assert!(iter.has_next_page());
    }

    #[tokio::test]
    async fn test_empty_page_with_token_continues() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"items": [], "nextPageToken": "t1"}));
        transport.push_json(json!({"items": [{"name": "A"}]}));

        let mut iter = iter_over(&transport);
        assert_eq!(iter.next().await.unwrap(), Some("A".to_string()));
        assert_eq!(iter.next().await.unwrap(), None);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_all_materializes_in_order() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({
            "items": [{"name": "A"}, {"name": "B"}],
            "nextPageToken": "t1",
        }));
        transport.push_json(json!({
            "items": [{"name": "C"}, {"name": "D"}],
        }));

        let mut iter = iter_over(&transport);
        let items = iter.all().await.unwrap();
        assert_eq!(items, vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_stream_adapter_preserves_sequence() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({
            "items": [{"name": "A"}],
            "nextPageToken": "t1",
        }));
        transport.push_json(json!({"items": [{"name": "B"}]}));

        let stream = iter_over(&transport).into_stream();
        futures::pin_mut!(stream);

        let mut seen = Vec::new();
        while let Some(item) = stream.next().await {
            seen.push(item.unwrap());
        }

        assert_eq!(seen, vec!["A", "B"]);
    }
}
