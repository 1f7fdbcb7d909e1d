//! Bucket-listing specialization of the pagination engine.

use std::sync::Arc;

use serde_json::Value;

use crate::types::Bucket;
use crate::{Result, StorageClient};

use super::page_iter::{PageDecoder, PageIter};

/// Iterator over all buckets visible to a client.
///
/// Bound to the fixed bucket-collection path; each raw record becomes a
/// [`Bucket`] associated with the listing client. Obtained from
/// [`StorageClient::list_buckets`].
pub type BucketIter = PageIter<BucketDecoder>;

/// Decodes bucket-listing records into [`Bucket`] handles.
#[derive(Debug, Clone)]
pub struct BucketDecoder {
    client: StorageClient,
}

impl PageDecoder for BucketDecoder {
    type Item = Bucket;

    fn decode_page(&self, items: &[Value]) -> Result<Vec<Bucket>> {
        items
            .iter()
            .map(|record| Bucket::from_record(self.client.clone(), record))
            .collect()
    }
}

impl BucketIter {
    /// Creates the bucket listing for a client.
    pub(crate) fn for_client(client: &StorageClient) -> Self {
        PageIter::new(
            Arc::new(client.clone()),
            Bucket::COLLECTION_PATH,
            BucketDecoder {
                client: client.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::mock::MockTransport;
    use crate::{Error, StorageConfig, StorageCredentials};

    fn test_client() -> StorageClient {
        let endpoint = Url::parse("https://api.strato.dev").unwrap();
        let credentials = StorageCredentials::new("api-token");
        let config = StorageConfig::new(endpoint, "demo-project", credentials).unwrap();
        StorageClient::new(config).unwrap()
    }

    fn mock_iter(transport: &Arc<MockTransport>) -> BucketIter {
        PageIter::new(
            transport.clone(),
            Bucket::COLLECTION_PATH,
            BucketDecoder {
                client: test_client(),
            },
        )
    }

    #[test]
    fn test_bound_to_collection_path() {
        let iter = BucketIter::for_client(&test_client());
        assert_eq!(iter.path(), "/b");
    }

    #[tokio::test]
    async fn test_decodes_buckets_in_order() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({
            "items": [{"name": "alpha"}, {"name": "beta"}],
            "nextPageToken": "t1",
        }));
        transport.push_json(json!({"items": [{"name": "gamma"}]}));

        let mut iter = mock_iter(&transport);
        let buckets = iter.all().await.unwrap();

        let names: Vec<&str> = buckets.iter().map(Bucket::name).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_record_without_name_is_malformed() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"items": [{"location": "eu-west"}]}));

        let mut iter = mock_iter(&transport);
        let err = iter.next().await.unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
