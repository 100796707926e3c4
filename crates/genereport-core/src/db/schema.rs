//! SQLite schema definition.

/// Complete database schema for genereport.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients (owned by the records system, read for prompt context)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    date_of_birth TEXT,
    sex TEXT,
    ethnicity TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Samples (one table, kind discriminant + JSON details)
-- ============================================================================

CREATE TABLE IF NOT EXISTS samples (
    sample_id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    kind TEXT NOT NULL CHECK (kind IN ('blood', 'dna', 'saliva')),
    details TEXT NOT NULL DEFAULT '{}',          -- JSON SampleKind
    status TEXT NOT NULL DEFAULT 'registered',   -- registered, received, in_analysis, analyzed, rejected
    collection_date TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_samples_patient ON samples(patient_id);

-- ============================================================================
-- Result Files (raw artifacts, bytes live in object storage)
-- ============================================================================

CREATE TABLE IF NOT EXISTS result_files (
    result_file_id TEXT PRIMARY KEY,
    sample_id TEXT NOT NULL REFERENCES samples(sample_id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    storage_key TEXT NOT NULL UNIQUE,
    storage_url TEXT NOT NULL,
    file_size_bytes INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    content_sha256 TEXT NOT NULL,
    processing_status TEXT NOT NULL DEFAULT 'pending',  -- pending, processing, processed, failed
    uploaded_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_result_files_sample ON result_files(sample_id);

-- ============================================================================
-- Mutations (Immutable - inserted in batches by the extractor)
-- ============================================================================

CREATE TABLE IF NOT EXISTS mutations (
    mutation_id TEXT PRIMARY KEY,
    sample_id TEXT NOT NULL REFERENCES samples(sample_id) ON DELETE CASCADE,
    result_file_id TEXT NOT NULL REFERENCES result_files(result_file_id) ON DELETE CASCADE,
    gene TEXT NOT NULL,
    chromosome TEXT NOT NULL,
    mutation_type TEXT NOT NULL,
    relevance TEXT NOT NULL CHECK (relevance IN ('LOW', 'MEDIUM', 'HIGH')),
    comment TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_mutations_sample ON mutations(sample_id);
CREATE INDEX IF NOT EXISTS idx_mutations_result_file ON mutations(result_file_id);

CREATE TRIGGER IF NOT EXISTS mutations_immutable BEFORE UPDATE ON mutations
BEGIN
    SELECT RAISE(ABORT, 'Mutations are immutable');
END;

-- ============================================================================
-- Reports (one row per generation attempt)
-- ============================================================================

CREATE TABLE IF NOT EXISTS reports (
    report_id TEXT PRIMARY KEY,
    sample_id TEXT NOT NULL REFERENCES samples(sample_id) ON DELETE CASCADE,
    storage_key TEXT UNIQUE,
    storage_url TEXT,
    file_size_bytes INTEGER,
    content_sha256 TEXT,
    generated_at TEXT NOT NULL,
    model_identifier TEXT NOT NULL,
    processing_time_ms INTEGER,
    status TEXT NOT NULL CHECK (status IN ('generating', 'completed', 'failed')),
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_reports_sample ON reports(sample_id);
CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status);

-- At most one in-flight attempt per sample
CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_one_generating
    ON reports(sample_id) WHERE status = 'generating';

-- Terminal attempts never change status
CREATE TRIGGER IF NOT EXISTS reports_terminal_status BEFORE UPDATE OF status ON reports
WHEN old.status IN ('completed', 'failed') AND new.status != old.status
BEGIN
    SELECT RAISE(ABORT, 'Report status is terminal');
END;
"#;
