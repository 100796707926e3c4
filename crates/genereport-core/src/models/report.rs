//! Report generation attempts.

use serde::{Deserialize, Serialize};

/// Report lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportStatus {
    /// AI generation in flight
    Generating,
    /// Text stored in object storage (terminal)
    Completed,
    /// Attempt failed (terminal)
    Failed,
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Generating)
    }
}

/// One attempt at producing a clinical report for a sample.
///
/// Every call to generate creates a new row, so the table is the audit
/// history of attempts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    /// UUID
    pub report_id: String,
    pub sample_id: String,
    /// Set once the text is uploaded
    pub storage_key: Option<String>,
    pub storage_url: Option<String>,
    pub file_size_bytes: Option<i64>,
    /// SHA-256 of the stored text, hex encoded
    pub content_sha256: Option<String>,
    /// Attempt start timestamp
    pub generated_at: String,
    pub model_identifier: String,
    pub processing_time_ms: Option<i64>,
    pub status: ReportStatus,
    /// Failure reason for `Failed` attempts
    pub error_message: Option<String>,
}

impl Report {
    /// Start a new attempt in `Generating`.
    pub fn start(sample_id: String, model_identifier: String) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            sample_id,
            storage_key: None,
            storage_url: None,
            file_size_bytes: None,
            content_sha256: None,
            generated_at: chrono::Utc::now().to_rfc3339(),
            model_identifier,
            processing_time_ms: None,
            status: ReportStatus::Generating,
            error_message: None,
        }
    }
}
