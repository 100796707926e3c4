//! Report database operations.
//!
//! Status moves only from `generating` to a terminal state. The terminal
//! updates below filter on `status = 'generating'` and return whether a row
//! changed, so a finished attempt is never rewritten.

use rusqlite::{params, OptionalExtension, Row};

use super::{is_unique_violation, Database, DbError, DbResult};
use crate::models::{Report, ReportStatus};

const REPORT_COLUMNS: &str = r#"
    report_id, sample_id, storage_key, storage_url, file_size_bytes, content_sha256,
    generated_at, model_identifier, processing_time_ms, status, error_message
"#;

/// Storage details recorded when an attempt completes.
#[derive(Debug, Clone)]
pub struct CompletedReport<'a> {
    pub storage_key: &'a str,
    pub storage_url: &'a str,
    pub file_size_bytes: i64,
    pub content_sha256: &'a str,
    pub processing_time_ms: i64,
}

impl Database {
    /// Insert a new report attempt.
    ///
    /// Fails with `DbError::Conflict` if the sample already has an attempt in
    /// `generating`.
    pub fn insert_report(&self, report: &Report) -> DbResult<()> {
        let result = self.conn.execute(
            r#"
            INSERT INTO reports (
                report_id, sample_id, storage_key, storage_url, file_size_bytes,
                content_sha256, generated_at, model_identifier, processing_time_ms,
                status, error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                report.report_id,
                report.sample_id,
                report.storage_key,
                report.storage_url,
                report.file_size_bytes,
                report.content_sha256,
                report.generated_at,
                report.model_identifier,
                report.processing_time_ms,
                status_to_string(&report.status),
                report.error_message,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) && report.status == ReportStatus::Generating => {
                Err(DbError::Conflict(format!(
                    "Report generation already in progress for sample {}",
                    report.sample_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Move a `generating` attempt to `completed`.
    pub fn mark_report_completed(
        &self,
        report_id: &str,
        completed: &CompletedReport<'_>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE reports SET
                storage_key = ?2,
                storage_url = ?3,
                file_size_bytes = ?4,
                content_sha256 = ?5,
                processing_time_ms = ?6,
                status = 'completed'
            WHERE report_id = ?1 AND status = 'generating'
            "#,
            params![
                report_id,
                completed.storage_key,
                completed.storage_url,
                completed.file_size_bytes,
                completed.content_sha256,
                completed.processing_time_ms,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Move a `generating` attempt to `failed`.
    pub fn mark_report_failed(
        &self,
        report_id: &str,
        processing_time_ms: i64,
        error_message: &str,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE reports SET
                processing_time_ms = ?2,
                error_message = ?3,
                status = 'failed'
            WHERE report_id = ?1 AND status = 'generating'
            "#,
            params![report_id, processing_time_ms, error_message],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a report by ID.
    pub fn get_report(&self, report_id: &str) -> DbResult<Option<Report>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM reports WHERE report_id = ?", REPORT_COLUMNS),
                [report_id],
                map_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all attempts for a sample, newest first.
    pub fn list_reports_for_sample(&self, sample_id: &str) -> DbResult<Vec<Report>> {
        self.query_reports(
            "WHERE sample_id = ? ORDER BY generated_at DESC, rowid DESC",
            sample_id,
        )
    }

    /// List reports by status, newest first.
    pub fn list_reports_by_status(&self, status: &ReportStatus) -> DbResult<Vec<Report>> {
        self.query_reports(
            "WHERE status = ? ORDER BY generated_at DESC, rowid DESC",
            status_to_string(status),
        )
    }

    /// The in-flight attempt for a sample, if any.
    pub fn find_generating_report(&self, sample_id: &str) -> DbResult<Option<Report>> {
        Ok(self
            .query_reports(
                "WHERE sample_id = ? AND status = 'generating' LIMIT 1",
                sample_id,
            )?
            .into_iter()
            .next())
    }

    /// Most recent completed report for a sample.
    pub fn latest_completed_report(&self, sample_id: &str) -> DbResult<Option<Report>> {
        Ok(self
            .query_reports(
                "WHERE sample_id = ? AND status = 'completed' ORDER BY generated_at DESC, rowid DESC LIMIT 1",
                sample_id,
            )?
            .into_iter()
            .next())
    }

    /// Delete a report row.
    pub fn delete_report(&self, report_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM reports WHERE report_id = ?", [report_id])?;
        Ok(rows_affected > 0)
    }

    fn query_reports(&self, clause: &str, key: &str) -> DbResult<Vec<Report>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM reports {}", REPORT_COLUMNS, clause))?;

        let rows = stmt.query_map([key], map_row)?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(row?.try_into()?);
        }
        Ok(reports)
    }
}

/// Intermediate row struct for database mapping.
struct ReportRow {
    report_id: String,
    sample_id: String,
    storage_key: Option<String>,
    storage_url: Option<String>,
    file_size_bytes: Option<i64>,
    content_sha256: Option<String>,
    generated_at: String,
    model_identifier: String,
    processing_time_ms: Option<i64>,
    status: String,
    error_message: Option<String>,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        report_id: row.get(0)?,
        sample_id: row.get(1)?,
        storage_key: row.get(2)?,
        storage_url: row.get(3)?,
        file_size_bytes: row.get(4)?,
        content_sha256: row.get(5)?,
        generated_at: row.get(6)?,
        model_identifier: row.get(7)?,
        processing_time_ms: row.get(8)?,
        status: row.get(9)?,
        error_message: row.get(10)?,
    })
}

impl TryFrom<ReportRow> for Report {
    type Error = DbError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Report {
            report_id: row.report_id,
            sample_id: row.sample_id,
            storage_key: row.storage_key,
            storage_url: row.storage_url,
            file_size_bytes: row.file_size_bytes,
            content_sha256: row.content_sha256,
            generated_at: row.generated_at,
            model_identifier: row.model_identifier,
            processing_time_ms: row.processing_time_ms,
            status: string_to_status(&row.status)?,
            error_message: row.error_message,
        })
    }
}

pub(crate) fn status_to_string(status: &ReportStatus) -> &'static str {
    match status {
        ReportStatus::Generating => "generating",
        ReportStatus::Completed => "completed",
        ReportStatus::Failed => "failed",
    }
}

pub(crate) fn string_to_status(s: &str) -> Result<ReportStatus, DbError> {
    match s {
        "generating" => Ok(ReportStatus::Generating),
        "completed" => Ok(ReportStatus::Completed),
        "failed" => Ok(ReportStatus::Failed),
        _ => Err(DbError::Constraint(format!("Unknown report status: {}", s))),
    }
}
