//! Sample database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Sample, SampleKind, SampleStatus};

impl Database {
    /// Register a sample.
    pub fn insert_sample(&self, sample: &Sample) -> DbResult<()> {
        let details = serde_json::to_string(&sample.kind)?;
        self.conn.execute(
            r#"
            INSERT INTO samples (
                sample_id, patient_id, kind, details, status,
                collection_date, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                sample.sample_id,
                sample.patient_id,
                sample.kind.as_str(),
                details,
                status_to_string(&sample.status),
                sample.collection_date,
                sample.notes,
                sample.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a sample by ID.
    pub fn get_sample(&self, sample_id: &str) -> DbResult<Option<Sample>> {
        self.conn
            .query_row(
                r#"
                SELECT sample_id, patient_id, kind, details, status,
                       collection_date, notes, created_at
                FROM samples
                WHERE sample_id = ?
                "#,
                [sample_id],
                |row| {
                    Ok(SampleRow {
                        sample_id: row.get(0)?,
                        patient_id: row.get(1)?,
                        kind: row.get(2)?,
                        details: row.get(3)?,
                        status: row.get(4)?,
                        collection_date: row.get(5)?,
                        notes: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Check if a sample exists.
    pub fn sample_exists(&self, sample_id: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM samples WHERE sample_id = ?",
            [sample_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete a sample. Result files, mutations and reports cascade.
    pub fn delete_sample(&self, sample_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM samples WHERE sample_id = ?", [sample_id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct SampleRow {
    sample_id: String,
    patient_id: String,
    kind: String,
    details: String,
    status: String,
    collection_date: String,
    notes: Option<String>,
    created_at: String,
}

impl TryFrom<SampleRow> for Sample {
    type Error = DbError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        let kind: SampleKind = serde_json::from_str(&row.details)?;
        if kind.as_str() != row.kind {
            return Err(DbError::Constraint(format!(
                "Sample {} kind column '{}' disagrees with details '{}'",
                row.sample_id,
                row.kind,
                kind.as_str()
            )));
        }

        Ok(Sample {
            sample_id: row.sample_id,
            patient_id: row.patient_id,
            kind,
            status: string_to_status(&row.status)?,
            collection_date: row.collection_date,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

fn status_to_string(status: &SampleStatus) -> &'static str {
    match status {
        SampleStatus::Registered => "registered",
        SampleStatus::Received => "received",
        SampleStatus::InAnalysis => "in_analysis",
        SampleStatus::Analyzed => "analyzed",
        SampleStatus::Rejected => "rejected",
    }
}

fn string_to_status(s: &str) -> Result<SampleStatus, DbError> {
    match s {
        "registered" => Ok(SampleStatus::Registered),
        "received" => Ok(SampleStatus::Received),
        "in_analysis" => Ok(SampleStatus::InAnalysis),
        "analyzed" => Ok(SampleStatus::Analyzed),
        "rejected" => Ok(SampleStatus::Rejected),
        _ => Err(DbError::Constraint(format!("Unknown sample status: {}", s))),
    }
}
