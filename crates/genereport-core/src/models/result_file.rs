//! Uploaded raw result artifacts.

use serde::{Deserialize, Serialize};

/// Processing status of a result file.
///
/// Uploads start as `Pending`. Extraction does not advance it yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Processed => "PROCESSED",
            ProcessingStatus::Failed => "FAILED",
        }
    }
}

/// A raw lab artifact stored as a blob and linked to a sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultFile {
    /// UUID
    pub result_file_id: String,
    pub sample_id: String,
    /// Original upload name
    pub file_name: String,
    /// Object storage key (unique)
    pub storage_key: String,
    pub storage_url: String,
    pub file_size_bytes: i64,
    pub content_type: String,
    /// SHA-256 of the stored bytes, hex encoded
    pub content_sha256: String,
    pub processing_status: ProcessingStatus,
    pub uploaded_at: String,
}
