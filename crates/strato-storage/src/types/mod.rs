//! Domain types for the storage API.
//!
//! Buckets and objects are lightweight handles: a name plus a back-reference
//! to the scope that can issue requests about them (the client for a bucket,
//! the bucket for an object). Handles are constructed either locally, by
//! name, or from the raw records a listing or single-resource fetch returns.

mod bucket;
mod object;

pub use bucket::{Bucket, BucketRef};
pub use object::{Object, ObjectRef};

pub(crate) use bucket::bucket_path;
