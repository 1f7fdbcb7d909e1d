//! Object-listing specialization of the pagination engine.

use std::sync::Arc;

use serde_json::Value;

use crate::types::{Bucket, Object};
use crate::Result;

use super::page_iter::{PageDecoder, PageIter};

/// Iterator over all objects in one bucket.
///
/// Bound to the bucket's object-collection path; each raw record becomes
/// an [`Object`] associated with that bucket (and, through it, the
/// client). Obtained from [`Bucket::list_objects`]; constructed fresh per
/// listing call.
pub type ObjectIter = PageIter<ObjectDecoder>;

/// Decodes object-listing records into [`Object`] handles.
#[derive(Debug, Clone)]
pub struct ObjectDecoder {
    bucket: Bucket,
}

impl PageDecoder for ObjectDecoder {
    type Item = Object;

    fn decode_page(&self, items: &[Value]) -> Result<Vec<Object>> {
        items
            .iter()
            .map(|record| Object::from_record(self.bucket.clone(), record))
            .collect()
    }
}

impl ObjectIter {
    /// Creates the object listing for a bucket.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the bucket's name is empty, before
    /// any request is issued.
    pub(crate) fn for_bucket(bucket: &Bucket) -> Result<Self> {
        let path = bucket.objects_path()?;

        Ok(PageIter::new(
            Arc::new(bucket.client().clone()),
            path,
            ObjectDecoder {
                bucket: bucket.clone(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::mock::MockTransport;
    use crate::{Error, StorageClient, StorageConfig, StorageCredentials};

    fn test_bucket() -> Bucket {
        let endpoint = Url::parse("https://api.strato.dev").unwrap();
        let credentials = StorageCredentials::new("api-token");
        let config = StorageConfig::new(endpoint, "demo-project", credentials).unwrap();
        StorageClient::new(config).unwrap().bucket("alpha")
    }

    fn mock_iter(transport: &Arc<MockTransport>) -> ObjectIter {
        let bucket = test_bucket();
        PageIter::new(
            transport.clone(),
            bucket.objects_path().unwrap(),
            ObjectDecoder { bucket },
        )
    }

    #[test]
    fn test_bound_to_bucket_objects_path() {
        let iter = ObjectIter::for_bucket(&test_bucket()).unwrap();
        assert_eq!(iter.path(), "/b/alpha/o");
    }

    #[test]
    fn test_construction_requires_bucket_identity() {
        let bucket = test_bucket().client().bucket("");
        let err = ObjectIter::for_bucket(&bucket).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn test_decodes_objects_with_metadata() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({
            "items": [
                {"name": "x/y.txt", "size": "11"},
                {"name": "z.bin", "size": "4096"},
            ],
        }));

        let mut iter = mock_iter(&transport);
        let objects = iter.all().await.unwrap();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name(), "x/y.txt");
        assert_eq!(objects[0].bucket().name(), "alpha");
        assert_eq!(objects[0].size(), Some(11));
        assert_eq!(objects[1].name(), "z.bin");
        assert_eq!(objects[1].path().unwrap(), "/b/alpha/o/z.bin");
    }

    #[tokio::test]
    async fn test_record_without_name_is_malformed() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(json!({"items": [{"size": "11"}]}));

        let mut iter = mock_iter(&transport);
        let err = iter.next().await.unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
