//! Bucket handles and bucket-scoped object operations.

use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::client::{Transport, absent_on_not_found};
use crate::{Error, Result, StorageClient, TRACING_TARGET_OBJECTS};

use super::object::{Object, ObjectRef, object_path};

/// Derives the REST path for a bucket name.
///
/// The mapping is deterministic and injective: `alpha` becomes `/b/alpha`.
/// An empty name is rejected locally, before any request is issued.
pub(crate) fn bucket_path(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::Precondition(
            "Cannot derive a bucket path without a name".to_string(),
        ));
    }

    Ok(format!("{}/{name}", Bucket::COLLECTION_PATH))
}

/// A named top-level container in the storage service.
///
/// A `Bucket` is a handle: the bucket's name plus a clone of the client
/// that can fetch more data about it. Constructing one does not issue a
/// request and does not guarantee the bucket exists.
#[derive(Debug, Clone)]
pub struct Bucket {
    client: StorageClient,
    name: String,
}

impl Bucket {
    /// Collection path for buckets in the JSON API.
    pub(crate) const COLLECTION_PATH: &'static str = "/b";

    /// Path segment separating a bucket from its contained objects.
    pub(crate) const OBJECTS_SEGMENT: &'static str = "/o";

    /// Creates a local bucket handle.
    pub(crate) fn new(client: StorageClient, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    /// Builds a bucket from a raw API record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the record has no `name` field.
    pub(crate) fn from_record(client: StorageClient, record: &Value) -> Result<Self> {
        let name = record
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Malformed("Bucket record missing `name`".to_string()))?;

        Ok(Self::new(client, name))
    }

    /// Returns the bucket name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the client this bucket issues requests through.
    #[inline]
    pub fn client(&self) -> &StorageClient {
        &self.client
    }

    /// Returns the REST path for this bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if the bucket name is empty.
    pub fn path(&self) -> Result<String> {
        bucket_path(&self.name)
    }

    /// Returns the REST path of this bucket's object collection.
    pub(crate) fn objects_path(&self) -> Result<String> {
        Ok(format!("{}{}", self.path()?, Self::OBJECTS_SEGMENT))
    }

    /// Checks whether this bucket exists on the server.
    pub async fn exists(&self) -> Result<bool> {
        self.client.bucket_exists(&self.name).await
    }

    /// Deletes this bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket does not exist or is not empty.
    pub async fn delete(&self) -> Result<()> {
        self.client.delete_bucket(self.name.clone()).await
    }

    /// Returns a local handle to an object in this bucket, without issuing
    /// a request.
    pub fn object(&self, name: impl Into<String>) -> Object {
        Object::new(self.clone(), name)
    }

    /// Fetches an object's record by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such object exists, or any
    /// transport error.
    #[instrument(skip(self), target = TRACING_TARGET_OBJECTS, fields(bucket = %self.name, object = %name))]
    pub async fn get_object(&self, name: &str) -> Result<Object> {
        let path = object_path(&self.name, name)?;

        debug!(
            target: TRACING_TARGET_OBJECTS,
            bucket = %self.name,
            object = %name,
            "Fetching object"
        );
        let record = self
            .client
            .request_json(reqwest::Method::GET, &path, &[], None)
            .await
            .map_err(|err| {
                error!(
                    target: TRACING_TARGET_OBJECTS,
                    bucket = %self.name,
                    object = %name,
                    error = %err,
                    "Failed to fetch object"
                );
                err
            })?;

        Object::from_record(self.clone(), &record)
    }

    /// Fetches an object by name, mapping absence to `None`.
    ///
    /// # Errors
    ///
    /// Propagates every error except [`Error::NotFound`].
    pub async fn lookup_object(&self, name: &str) -> Result<Option<Object>> {
        absent_on_not_found(self.get_object(name).await)
    }

    /// Deletes an object, given either its name or a handle.
    #[instrument(skip(self, object), target = TRACING_TARGET_OBJECTS, fields(bucket = %self.name))]
    pub async fn delete_object(&self, object: impl Into<ObjectRef>) -> Result<()> {
        let name = object.into().into_name();
        let path = object_path(&self.name, &name)?;

        debug!(
            target: TRACING_TARGET_OBJECTS,
            bucket = %self.name,
            object = %name,
            "Deleting object"
        );
        let start = std::time::Instant::now();
        let result = self
            .client
            .request_raw(reqwest::Method::DELETE, &path, &[])
            .await;
        let elapsed = start.elapsed();

        match result {
            Ok(_body) => {
                info!(
                    target: TRACING_TARGET_OBJECTS,
                    bucket = %self.name,
                    object = %name,
                    elapsed = ?elapsed,
                    "Object deleted successfully"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    target: TRACING_TARGET_OBJECTS,
                    bucket = %self.name,
                    object = %name,
                    error = %err,
                    elapsed = ?elapsed,
                    "Failed to delete object"
                );
                Err(err)
            }
        }
    }

    /// Returns an iterator over all objects in this bucket.
    ///
    /// The iterator is bound to this bucket's object collection path; no
    /// request is issued until the first item or page is pulled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if the bucket name is empty.
    pub fn list_objects(&self) -> Result<crate::iter::ObjectIter> {
        crate::iter::ObjectIter::for_bucket(self)
    }

    /// Fetches all objects in this bucket into a fully materialized,
    /// ordered list.
    pub async fn all_objects(&self) -> Result<Vec<Object>> {
        self.list_objects()?.all().await
    }
}

/// A bucket argument given either as a bare name or as a resolved handle.
///
/// Operations that only need a bucket's identity accept this instead of
/// guessing at string-or-handle inputs; the reference is resolved to a name
/// once, at the API boundary.
#[derive(Debug, Clone)]
pub enum BucketRef {
    /// A bucket identified by name only.
    Name(String),
    /// An already-resolved bucket handle.
    Handle(Bucket),
}

impl BucketRef {
    /// Resolves this reference to the bucket name.
    pub fn into_name(self) -> String {
        match self {
            BucketRef::Name(name) => name,
            BucketRef::Handle(bucket) => bucket.name,
        }
    }
}

impl From<&str> for BucketRef {
    fn from(name: &str) -> Self {
        BucketRef::Name(name.to_string())
    }
}

impl From<String> for BucketRef {
    fn from(name: String) -> Self {
        BucketRef::Name(name)
    }
}

impl From<Bucket> for BucketRef {
    fn from(bucket: Bucket) -> Self {
        BucketRef::Handle(bucket)
    }
}

impl From<&Bucket> for BucketRef {
    fn from(bucket: &Bucket) -> Self {
        BucketRef::Handle(bucket.clone())
    }
}
