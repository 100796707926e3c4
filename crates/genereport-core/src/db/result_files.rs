//! Result file database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{ProcessingStatus, ResultFile};

const RESULT_FILE_COLUMNS: &str = r#"
    result_file_id, sample_id, file_name, storage_key, storage_url,
    file_size_bytes, content_type, content_sha256, processing_status, uploaded_at
"#;

impl Database {
    /// Insert a result file row.
    pub fn insert_result_file(&self, file: &ResultFile) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO result_files (
                result_file_id, sample_id, file_name, storage_key, storage_url,
                file_size_bytes, content_type, content_sha256, processing_status, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                file.result_file_id,
                file.sample_id,
                file.file_name,
                file.storage_key,
                file.storage_url,
                file.file_size_bytes,
                file.content_type,
                file.content_sha256,
                status_to_string(&file.processing_status),
                file.uploaded_at,
            ],
        )?;
        Ok(())
    }

    /// Get a result file by ID.
    pub fn get_result_file(&self, result_file_id: &str) -> DbResult<Option<ResultFile>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM result_files WHERE result_file_id = ?",
                    RESULT_FILE_COLUMNS
                ),
                [result_file_id],
                map_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List result files for a sample, newest first.
    pub fn list_result_files_for_sample(&self, sample_id: &str) -> DbResult<Vec<ResultFile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM result_files WHERE sample_id = ? ORDER BY uploaded_at DESC",
            RESULT_FILE_COLUMNS
        ))?;

        let rows = stmt.query_map([sample_id], map_row)?;

        let mut files = Vec::new();
        for row in rows {
            files.push(row?.try_into()?);
        }
        Ok(files)
    }

    /// Delete a result file. Its mutations cascade.
    pub fn delete_result_file(&self, result_file_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM result_files WHERE result_file_id = ?",
            [result_file_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct ResultFileRow {
    result_file_id: String,
    sample_id: String,
    file_name: String,
    storage_key: String,
    storage_url: String,
    file_size_bytes: i64,
    content_type: String,
    content_sha256: String,
    processing_status: String,
    uploaded_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ResultFileRow> {
    Ok(ResultFileRow {
        result_file_id: row.get(0)?,
        sample_id: row.get(1)?,
        file_name: row.get(2)?,
        storage_key: row.get(3)?,
        storage_url: row.get(4)?,
        file_size_bytes: row.get(5)?,
        content_type: row.get(6)?,
        content_sha256: row.get(7)?,
        processing_status: row.get(8)?,
        uploaded_at: row.get(9)?,
    })
}

impl TryFrom<ResultFileRow> for ResultFile {
    type Error = DbError;

    fn try_from(row: ResultFileRow) -> Result<Self, Self::Error> {
        Ok(ResultFile {
            result_file_id: row.result_file_id,
            sample_id: row.sample_id,
            file_name: row.file_name,
            storage_key: row.storage_key,
            storage_url: row.storage_url,
            file_size_bytes: row.file_size_bytes,
            content_type: row.content_type,
            content_sha256: row.content_sha256,
            processing_status: string_to_status(&row.processing_status)?,
            uploaded_at: row.uploaded_at,
        })
    }
}

fn status_to_string(status: &ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::Pending => "pending",
        ProcessingStatus::Processing => "processing",
        ProcessingStatus::Processed => "processed",
        ProcessingStatus::Failed => "failed",
    }
}

fn string_to_status(s: &str) -> Result<ProcessingStatus, DbError> {
    match s {
        "pending" => Ok(ProcessingStatus::Pending),
        "processing" => Ok(ProcessingStatus::Processing),
        "processed" => Ok(ProcessingStatus::Processed),
        "failed" => Ok(ProcessingStatus::Failed),
        _ => Err(DbError::Constraint(format!(
            "Unknown processing status: {}",
            s
        ))),
    }
}
