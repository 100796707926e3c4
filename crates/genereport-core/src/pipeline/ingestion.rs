//! Result file ingestion: make the raw artifact durable and linkable.

use tracing::{debug, info, warn};

use super::{PipelineError, PipelineResult};
use crate::db::Database;
use crate::models::{ProcessingStatus, ResultFile};
use crate::storage::{content_sha256, result_file_key, ObjectStore};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub struct ResultFileIngestion<'a> {
    db: &'a Database,
    store: &'a dyn ObjectStore,
}

impl<'a> ResultFileIngestion<'a> {
    pub fn new(db: &'a Database, store: &'a dyn ObjectStore) -> Self {
        Self { db, store }
    }

    /// Store the bytes as a blob and record a pending result file for the sample.
    pub fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        content_type: &str,
        sample_id: &str,
    ) -> PipelineResult<ResultFile> {
        if bytes.is_empty() {
            return Err(PipelineError::Validation("uploaded file is empty".into()));
        }
        if !self.db.sample_exists(sample_id)? {
            return Err(PipelineError::NotFound(format!("sample {}", sample_id)));
        }

        let now = chrono::Utc::now();
        let storage_key = result_file_key(sample_id, file_name, now);
        debug!(sample_id, key = %storage_key, "uploading result file");
        let storage_url = self.store.put(&storage_key, bytes)?;

        let file = ResultFile {
            result_file_id: uuid::Uuid::new_v4().to_string(),
            sample_id: sample_id.to_string(),
            file_name: file_name.to_string(),
            storage_key,
            storage_url,
            file_size_bytes: bytes.len() as i64,
            content_type: if content_type.trim().is_empty() {
                DEFAULT_CONTENT_TYPE.to_string()
            } else {
                content_type.to_string()
            },
            content_sha256: content_sha256(bytes),
            processing_status: ProcessingStatus::Pending,
            uploaded_at: now.to_rfc3339(),
        };

        if let Err(e) = self.db.insert_result_file(&file) {
            // Don't leave an unreferenced blob behind
            if let Err(cleanup) = self.store.delete(&file.storage_key) {
                warn!(key = %file.storage_key, error = %cleanup, "failed to remove orphaned upload");
            }
            return Err(e.into());
        }

        info!(
            result_file_id = %file.result_file_id,
            sample_id,
            bytes = file.file_size_bytes,
            "stored result file"
        );
        Ok(file)
    }

    /// Delete a result file: blob first (best effort), then the row and its mutations.
    pub fn delete(&self, result_file_id: &str) -> PipelineResult<()> {
        let file = self
            .db
            .get_result_file(result_file_id)?
            .ok_or_else(|| PipelineError::NotFound(format!("result file {}", result_file_id)))?;

        if let Err(e) = self.store.delete(&file.storage_key) {
            warn!(result_file_id, key = %file.storage_key, error = %e, "could not delete result file blob");
        }
        self.db.delete_result_file(result_file_id)?;
        info!(result_file_id, "deleted result file");
        Ok(())
    }
}
