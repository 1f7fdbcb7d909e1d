//! High-level storage client implementation.
//!
//! This module provides the main entry point for the storage JSON API,
//! encapsulating connection management, request plumbing, and the
//! bucket-level operations scoped to a whole project.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use tracing::{debug, error, info, instrument};

use super::storage_config::{API_VERSION, StorageConfig};
use super::transport::Transport;
use crate::types::{Bucket, BucketRef, bucket_path};
use crate::{Error, Result, TRACING_TARGET_BUCKETS, TRACING_TARGET_CLIENT};

/// Inner client that holds the HTTP client and configuration.
struct ClientInner {
    http: reqwest::Client,
    config: StorageConfig,
}

/// High-level client for the storage JSON API.
///
/// The client is cheap to clone; every clone shares the same underlying
/// HTTP connection pool and configuration. Domain handles ([`Bucket`],
/// [`Object`](crate::Object)) carry a clone so they can issue further
/// requests on their own.
#[derive(Clone)]
pub struct StorageClient {
    inner: Arc<ClientInner>,
}

impl StorageClient {
    /// Creates a new storage client with the provided configuration.
    ///
    /// This validates the configuration and builds the HTTP client, but
    /// does not test connectivity.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails or the HTTP
    /// client cannot be constructed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use strato_storage::{StorageClient, StorageConfig, StorageCredentials};
    /// use url::Url;
    ///
    /// let endpoint = Url::parse("https://api.strato.dev").unwrap();
    /// let credentials = StorageCredentials::new("api-token");
    /// let config = StorageConfig::new(endpoint, "my-project", credentials).unwrap();
    /// let client = StorageClient::new(config).unwrap();
    /// ```
    #[instrument(skip(config), target = TRACING_TARGET_CLIENT, fields(endpoint = %config.endpoint_masked()))]
    pub fn new(config: StorageConfig) -> Result<Self> {
        config.validate().map_err(|err| {
            error!(target: TRACING_TARGET_CLIENT, error = %err, "Configuration validation failed");
            err
        })?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        info!(
            target: TRACING_TARGET_CLIENT,
            endpoint = %config.endpoint_masked(),
            project = %config.project,
            token = %config.credentials().token_masked(),
            "Storage client initialized"
        );

        Ok(Self {
            inner: Arc::new(ClientInner { http, config }),
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.inner.config
    }

    /// Returns a local handle to a bucket, without issuing a request.
    ///
    /// The handle may name a bucket that does not exist; use
    /// [`get_bucket`](Self::get_bucket) or [`Bucket::exists`] to check.
    pub fn bucket(&self, name: impl Into<String>) -> Bucket {
        Bucket::new(self.clone(), name)
    }

    /// Fetches a bucket by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such bucket exists, or any
    /// transport error.
    #[instrument(skip(self), target = TRACING_TARGET_BUCKETS, fields(bucket = %name))]
    pub async fn get_bucket(&self, name: &str) -> Result<Bucket> {
        let path = bucket_path(name)?;

        debug!(target: TRACING_TARGET_BUCKETS, bucket = %name, "Fetching bucket");
        let record = self
            .request_json(Method::GET, &path, &[], None)
            .await
            .map_err(|err| {
                error!(target: TRACING_TARGET_BUCKETS, bucket = %name, error = %err, "Failed to fetch bucket");
                err
            })?;

        Bucket::from_record(self.clone(), &record)
    }

    /// Fetches a bucket by name, mapping absence to `None`.
    ///
    /// # Errors
    ///
    /// Propagates every error except [`Error::NotFound`].
    pub async fn lookup_bucket(&self, name: &str) -> Result<Option<Bucket>> {
        absent_on_not_found(self.get_bucket(name).await)
    }

    /// Checks whether a bucket exists.
    pub async fn bucket_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lookup_bucket(name).await?.is_some())
    }

    /// Creates a new bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the server rejects the
    /// creation.
    #[instrument(skip(self), target = TRACING_TARGET_BUCKETS, fields(bucket = %name))]
    pub async fn create_bucket(&self, name: &str) -> Result<Bucket> {
        // Derive the path first so an empty name fails before any request.
        bucket_path(name)?;

        debug!(target: TRACING_TARGET_BUCKETS, bucket = %name, "Creating bucket");
        let start = std::time::Instant::now();
        let result = self
            .request_json(
                Method::POST,
                Bucket::COLLECTION_PATH,
                &[],
                Some(json!({ "name": name })),
            )
            .await;
        let elapsed = start.elapsed();

        match result {
            Ok(record) => {
                info!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    elapsed = ?elapsed,
                    "Bucket created successfully"
                );
                Bucket::from_record(self.clone(), &record)
            }
            Err(err) => {
                error!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    error = %err,
                    elapsed = ?elapsed,
                    "Failed to create bucket"
                );
                Err(err)
            }
        }
    }

    /// Deletes a bucket, given either its name or a handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket does not exist, is not empty, or the
    /// deletion fails.
    #[instrument(skip(self, bucket), target = TRACING_TARGET_BUCKETS)]
    pub async fn delete_bucket(&self, bucket: impl Into<BucketRef>) -> Result<()> {
        let name = bucket.into().into_name();
        let path = bucket_path(&name)?;

        debug!(target: TRACING_TARGET_BUCKETS, bucket = %name, "Deleting bucket");
        let start = std::time::Instant::now();
        let result = self.request_raw(Method::DELETE, &path, &[]).await;
        let elapsed = start.elapsed();

        match result {
            Ok(_body) => {
                info!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    elapsed = ?elapsed,
                    "Bucket deleted successfully"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    error = %err,
                    elapsed = ?elapsed,
                    "Failed to delete bucket"
                );
                Err(err)
            }
        }
    }

    /// Returns an iterator over all buckets visible to this client.
    ///
    /// No request is issued until the first item or page is pulled.
    pub fn list_buckets(&self) -> crate::iter::BucketIter {
        crate::iter::BucketIter::for_client(self)
    }

    /// Fetches all buckets into a fully materialized, ordered list.
    pub async fn all_buckets(&self) -> Result<Vec<Bucket>> {
        self.list_buckets().all().await
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        let base = self.inner.config.endpoint.as_str().trim_end_matches('/');
        let url = format!("{base}/storage/{API_VERSION}{path}");
        Url::parse(&url).map_err(|err| Error::Config(format!("Invalid request URL: {err}")))
    }

    fn upload_url(&self, path: &str) -> Result<Url> {
        let base = self.inner.config.endpoint.as_str().trim_end_matches('/');
        let url = format!("{base}/upload/storage/{API_VERSION}{path}");
        Url::parse(&url).map_err(|err| Error::Config(format!("Invalid request URL: {err}")))
    }

    /// Uploads a whole-buffer media payload under a collection path.
    ///
    /// Returns the stored object's record as reported by the server.
    pub(crate) async fn upload_media(
        &self,
        collection_path: &str,
        name: &str,
        data: Bytes,
        content_type: mime::Mime,
    ) -> Result<Value> {
        let url = self.upload_url(collection_path)?;
        let query = [
            ("uploadType".to_string(), "media".to_string()),
            ("name".to_string(), name.to_string()),
        ];

        let response = self
            .execute(
                Method::POST,
                url,
                &query,
                RequestBody::Media {
                    data,
                    content_type: content_type.to_string(),
                },
            )
            .await?;

        require_json(&response)?;
        let payload = response.bytes().await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    /// Downloads a whole-buffer media payload from a resource path.
    pub(crate) async fn download_media(&self, path: &str) -> Result<Bytes> {
        let query = [("alt".to_string(), "media".to_string())];
        self.request_raw(Method::GET, path, &query).await
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        query: &[(String, String)],
        body: RequestBody,
    ) -> Result<reqwest::Response> {
        debug!(
            target: TRACING_TARGET_CLIENT,
            method = %method,
            path = %url.path(),
            "Sending API request"
        );

        let mut request = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .query(&[("project", self.inner.config.project.as_str())])
            .bearer_auth(self.inner.config.credentials().token());

        if !query.is_empty() {
            request = request.query(query);
        }

        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Media { data, content_type } => {
                request.header(CONTENT_TYPE, content_type).body(data)
            }
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("{method} {}", url.path())));
        }

        if !status.is_success() {
            let headers = collect_headers(&response);
            let body = response.text().await.unwrap_or_default();
            error!(
                target: TRACING_TARGET_CLIENT,
                method = %method,
                path = %url.path(),
                status = status.as_u16(),
                "API request failed"
            );
            return Err(Error::Server {
                status: status.as_u16(),
                headers,
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for StorageClient {
    async fn request_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value> {
        let url = self.api_url(path)?;
        let body = match body {
            Some(value) => RequestBody::Json(value),
            None => RequestBody::Empty,
        };

        let response = self.execute(method, url, query, body).await?;
        require_json(&response)?;

        let payload = response.bytes().await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    async fn request_raw(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Bytes> {
        let url = self.api_url(path)?;
        let response = self.execute(method, url, query, RequestBody::Empty).await?;
        Ok(response.bytes().await?)
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("endpoint", &self.inner.config.endpoint_masked())
            .field("project", &self.inner.config.project)
            .field("token", &self.inner.config.credentials().token_masked())
            .finish_non_exhaustive()
    }
}

/// Request payload shapes understood by [`StorageClient::execute`].
enum RequestBody {
    Empty,
    Json(Value),
    Media { data: Bytes, content_type: String },
}

/// Maps a `NotFound` error to `None`, passing everything else through.
///
/// Single-resource lookups use this; listing page fetches never do, so a
/// 404 mid-listing still surfaces to the caller.
pub(crate) fn absent_on_not_found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

fn require_json(response: &reqwest::Response) -> Result<()> {
    let declared = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let content_type: mime::Mime = declared
        .parse()
        .map_err(|_| Error::Malformed(format!("Undeclared or invalid content type '{declared}'")))?;

    if content_type.subtype() == mime::JSON || content_type.suffix() == Some(mime::JSON) {
        Ok(())
    } else {
        Err(Error::Malformed(format!(
            "Expected a JSON response, got '{content_type}'"
        )))
    }
}

fn collect_headers(response: &reqwest::Response) -> std::collections::HashMap<String, String> {
    let mut headers = std::collections::HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(text) = value.to_str() {
            headers.insert(name.to_string(), text.to_string());
        }
    }
    headers
}
