//! Object handles: named entries stored inside a bucket.

use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};

use crate::{Error, Result, TRACING_TARGET_OBJECTS};

use super::bucket::{Bucket, bucket_path};

/// Derives the REST path for an object name within a bucket.
///
/// Composed hierarchically from the bucket path: object `x/y.txt` in bucket
/// `alpha` becomes `/b/alpha/o/x/y.txt`. Empty identity on either side is
/// rejected locally, before any request is issued.
pub(crate) fn object_path(bucket_name: &str, name: &str) -> Result<String> {
    let bucket = bucket_path(bucket_name)?;

    if name.is_empty() {
        return Err(Error::Precondition(
            "Cannot derive an object path without an object name".to_string(),
        ));
    }

    Ok(format!("{bucket}{}/{name}", Bucket::OBJECTS_SEGMENT))
}

/// An individual stored object, identified by name within a bucket.
///
/// An `Object` is a handle: the object's name, the bucket it belongs to
/// (and through it, the client), and whatever raw record the server has
/// already reported about it. Objects have no existence of their own:
/// every request they issue goes through their bucket's client.
#[derive(Debug, Clone)]
pub struct Object {
    bucket: Bucket,
    name: String,
    record: Map<String, Value>,
}

impl Object {
    /// Creates a local object handle with no server-reported metadata.
    pub(crate) fn new(bucket: Bucket, name: impl Into<String>) -> Self {
        Self {
            bucket,
            name: name.into(),
            record: Map::new(),
        }
    }

    /// Builds an object from a raw API record, retaining the full record
    /// as extra metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the record is not a JSON object or
    /// has no `name` field.
    pub(crate) fn from_record(bucket: Bucket, record: &Value) -> Result<Self> {
        let fields = record
            .as_object()
            .ok_or_else(|| Error::Malformed("Object record is not a JSON object".to_string()))?;

        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Malformed("Object record missing `name`".to_string()))?
            .to_string();

        Ok(Self {
            bucket,
            name,
            record: fields.clone(),
        })
    }

    /// Returns the object name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bucket this object belongs to.
    #[inline]
    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Returns the raw record the server reported for this object.
    ///
    /// Empty for handles created locally that have not been fetched or
    /// uploaded yet.
    #[inline]
    pub fn record(&self) -> &Map<String, Value> {
        &self.record
    }

    /// Returns the REST path for this object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if the object or bucket name is
    /// empty.
    pub fn path(&self) -> Result<String> {
        object_path(self.bucket.name(), &self.name)
    }

    /// Returns the object size in bytes, if reported.
    ///
    /// The API reports sizes as decimal strings; numeric values are
    /// accepted too.
    pub fn size(&self) -> Option<u64> {
        match self.record.get("size")? {
            Value::String(text) => text.parse().ok(),
            value => value.as_u64(),
        }
    }

    /// Returns the object's ETag, if reported.
    pub fn etag(&self) -> Option<&str> {
        self.record.get("etag").and_then(Value::as_str)
    }

    /// Returns the object's content type, if reported.
    pub fn content_type(&self) -> Option<&str> {
        self.record.get("contentType").and_then(Value::as_str)
    }

    /// Returns the object's last-update timestamp, if reported and
    /// parseable.
    pub fn updated(&self) -> Option<jiff::Timestamp> {
        self.record
            .get("updated")
            .and_then(Value::as_str)
            .and_then(|text| text.parse().ok())
    }

    /// Checks whether this object exists on the server.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.bucket.lookup_object(&self.name).await?.is_some())
    }

    /// Deletes this object.
    pub async fn delete(&self) -> Result<()> {
        self.bucket.delete_object(self.name.clone()).await
    }

    /// Uploads `data` as this object's contents, whole-buffer.
    ///
    /// Returns a fresh handle built from the record the server reports for
    /// the stored object. Passing no content type stores the data as
    /// `application/octet-stream`.
    #[instrument(skip(self, data, content_type), target = TRACING_TARGET_OBJECTS, fields(bucket = %self.bucket.name(), object = %self.name))]
    pub async fn upload(
        &self,
        data: impl Into<Bytes>,
        content_type: Option<mime::Mime>,
    ) -> Result<Object> {
        if self.name.is_empty() {
            return Err(Error::Precondition(
                "Cannot upload an object without a name".to_string(),
            ));
        }

        let collection = self.bucket.objects_path()?;
        let data = data.into();
        let size = data.len() as u64;
        let content_type = content_type.unwrap_or(mime::APPLICATION_OCTET_STREAM);

        debug!(
            target: TRACING_TARGET_OBJECTS,
            bucket = %self.bucket.name(),
            object = %self.name,
            size = %size,
            "Uploading object contents"
        );
        let start = std::time::Instant::now();
        let result = self
            .bucket
            .client()
            .upload_media(&collection, &self.name, data, content_type)
            .await;
        let elapsed = start.elapsed();

        match result {
            Ok(record) => {
                info!(
                    target: TRACING_TARGET_OBJECTS,
                    bucket = %self.bucket.name(),
                    object = %self.name,
                    size = %size,
                    elapsed = ?elapsed,
                    "Object uploaded successfully"
                );
                Object::from_record(self.bucket.clone(), &record)
            }
            Err(err) => {
                error!(
                    target: TRACING_TARGET_OBJECTS,
                    bucket = %self.bucket.name(),
                    object = %self.name,
                    error = %err,
                    elapsed = ?elapsed,
                    "Failed to upload object"
                );
                Err(err)
            }
        }
    }

    /// Downloads this object's contents, whole-buffer.
    #[instrument(skip(self), target = TRACING_TARGET_OBJECTS, fields(bucket = %self.bucket.name(), object = %self.name))]
    pub async fn download(&self) -> Result<Bytes> {
        let path = self.path()?;

        debug!(
            target: TRACING_TARGET_OBJECTS,
            bucket = %self.bucket.name(),
            object = %self.name,
            "Downloading object contents"
        );
        let start = std::time::Instant::now();
        let result = self.bucket.client().download_media(&path).await;
        let elapsed = start.elapsed();

        match result {
            Ok(data) => {
                debug!(
                    target: TRACING_TARGET_OBJECTS,
                    bucket = %self.bucket.name(),
                    object = %self.name,
                    size = data.len(),
                    elapsed = ?elapsed,
                    "Object downloaded successfully"
                );
                Ok(data)
            }
            Err(err) => {
                error!(
                    target: TRACING_TARGET_OBJECTS,
                    bucket = %self.bucket.name(),
                    object = %self.name,
                    error = %err,
                    elapsed = ?elapsed,
                    "Failed to download object"
                );
                Err(err)
            }
        }
    }
}

/// An object argument given either as a bare name or as a resolved handle.
#[derive(Debug, Clone)]
pub enum ObjectRef {
    /// An object identified by name only.
    Name(String),
    /// An already-resolved object handle.
    Handle(Object),
}

impl ObjectRef {
    /// Resolves this reference to the object name.
    pub fn into_name(self) -> String {
        match self {
            ObjectRef::Name(name) => name,
            ObjectRef::Handle(object) => object.name,
        }
    }
}

impl From<&str> for ObjectRef {
    fn from(name: &str) -> Self {
        ObjectRef::Name(name.to_string())
    }
}

impl From<String> for ObjectRef {
    fn from(name: String) -> Self {
        ObjectRef::Name(name)
    }
}

impl From<Object> for ObjectRef {
    fn from(object: Object) -> Self {
        ObjectRef::Handle(object)
    }
}

impl From<&Object> for ObjectRef {
    fn from(object: &Object) -> Self {
        ObjectRef::Handle(object.clone())
    }
}
