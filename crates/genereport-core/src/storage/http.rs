//! HTTP object store client (S3-style path addressing without request signing).
//!
//! Objects live at `{endpoint}/{bucket}/{key}` and are written with `PUT`,
//! read with `GET` and removed with `DELETE`.

use std::time::Duration;

use tracing::debug;

use super::{validate_key, BlobReader, ObjectStore, StorageError, StorageResult};

pub struct HttpObjectStore {
    endpoint: String,
    bucket: String,
    client: reqwest::blocking::Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, bucket: &str, timeout: Duration) -> StorageResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
            client,
        })
    }

    /// Public URL for a key.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }

    fn checked_url(&self, key: &str) -> StorageResult<String> {
        validate_key(key).map_err(StorageError::InvalidKey)?;
        Ok(self.object_url(key))
    }
}

fn check_status(status: reqwest::StatusCode, key: &str) -> StorageResult<()> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound(key.to_string()));
    }
    if !status.is_success() {
        return Err(StorageError::Status {
            status: status.as_u16(),
            key: key.to_string(),
        });
    }
    Ok(())
}

impl ObjectStore for HttpObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<String> {
        let url = self.checked_url(key)?;
        let response = self.client.put(&url).body(bytes.to_vec()).send()?;
        check_status(response.status(), key)?;
        debug!(key, bytes = bytes.len(), "stored blob over HTTP");
        Ok(url)
    }

    fn get(&self, key: &str) -> StorageResult<BlobReader> {
        let url = self.checked_url(key)?;
        let response = self.client.get(&url).send()?;
        check_status(response.status(), key)?;
        Ok(Box::new(response))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let url = self.checked_url(key)?;
        let response = self.client.delete(&url).send()?;
        check_status(response.status(), key)
    }
}
