//! Storage client with configuration management and transport plumbing.
//!
//! This module provides the connection layer for the storage JSON API:
//! a cheaply clonable [`StorageClient`] wrapping a configured HTTP client,
//! validated [`StorageConfig`] and [`StorageCredentials`] types, and the
//! [`Transport`] capability consumed by the pagination engine.

mod storage_client;
mod storage_config;
mod storage_credentials;
mod transport;

pub use storage_client::StorageClient;
pub(crate) use storage_client::absent_on_not_found;
pub use storage_config::{API_VERSION, StorageConfig};
pub use storage_credentials::StorageCredentials;
pub use transport::Transport;
