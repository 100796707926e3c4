//! Object storage for raw result files and generated report text.
//!
//! Blobs are addressed by opaque keys. Every upload and every report attempt
//! gets a fresh key, so a stored blob is never rewritten.

mod filesystem;
mod http;
mod keys;
mod memory;

pub use filesystem::*;
pub use http::*;
pub use keys::*;
pub use memory::*;

use std::io::Read;

use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Object storage returned HTTP {status} for key {key}")]
    Status { status: u16, key: String },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Object storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A byte stream read from storage.
pub type BlobReader = Box<dyn Read + Send>;

/// Blob store addressed by opaque keys.
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return a locator URL.
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<String>;

    /// Open the blob under `key` for streaming.
    fn get(&self, key: &str) -> StorageResult<BlobReader>;

    /// Remove the blob under `key`.
    fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Read a whole blob into memory.
pub fn read_to_vec(store: &dyn ObjectStore, key: &str) -> StorageResult<Vec<u8>> {
    let mut reader = store.get(key)?;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Hex-encoded SHA-256 of a blob's bytes.
pub fn content_sha256(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}
