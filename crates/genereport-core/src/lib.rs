//! Genereport Core Library
//!
//! Genetic sample processing and AI report generation for a hospital backend.
//!
//! # Architecture
//!
//! ```text
//! Lab upload ──► ResultFileIngestion ──► blob + result_files row (pending)
//!                                                 │
//!                                        MutationExtractor
//!                                  (parse all lines, then one transaction)
//!                                                 │
//!                                          mutations rows
//!                                                 │
//!                                        ReportOrchestrator
//!                          ┌──────────────────────┼──────────────────────┐
//!                          │                      │                      │
//!                          ▼                      ▼                      ▼
//!                   reports row           prompt → AI backend      report text blob
//!                   GENERATING ──────────► COMPLETED | FAILED
//! ```
//!
//! # Core Principle
//!
//! **Variants are never dropped silently.** Extraction is all-or-nothing and a
//! sample with more variants than a prompt may carry fails instead of being
//! truncated.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Sample, Mutation, ResultFile, Report, etc.)
//! - [`storage`]: Object storage backends and key generation
//! - [`pipeline`]: Ingestion, extraction and report orchestration
//! - [`config`]: TOML configuration

pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod storage;

// Re-export commonly used types
pub use config::{Config, ConfigError, ShortLinePolicy};
pub use db::Database;
pub use models::{
    Mutation, Patient, RelevanceTier, Report, ReportStatus, ResultFile, Sample, SampleKind,
    SampleStatus,
};
pub use pipeline::{
    ErrorKind, MutationExtractor, PipelineError, ReportOrchestrator, ResultFileIngestion,
};
pub use storage::ObjectStore;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use genereport_llm::ReportGenerator;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum GenereportError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<PipelineError> for GenereportError {
    fn from(e: PipelineError) -> Self {
        let message = e.to_string();
        match e.kind() {
            ErrorKind::NotFound => GenereportError::NotFound(message),
            ErrorKind::Misconfigured => GenereportError::Misconfigured(message),
            ErrorKind::Conflict => GenereportError::Conflict(message),
            ErrorKind::Validation => GenereportError::ValidationFailed(message),
            ErrorKind::ExternalService => GenereportError::ExternalService(message),
            ErrorKind::Database => GenereportError::DatabaseError(message),
        }
    }
}

impl From<db::DbError> for GenereportError {
    fn from(e: db::DbError) -> Self {
        PipelineError::from(e).into()
    }
}

impl From<ConfigError> for GenereportError {
    fn from(e: ConfigError) -> Self {
        GenereportError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for GenereportError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        GenereportError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the core described by a TOML config file.
#[uniffi::export]
pub fn open_core(config_path: String) -> Result<Arc<GenereportCore>, GenereportError> {
    let config = Config::load(&config_path)?;
    let db = Database::open(&config.database.path)?;
    let store = config.build_store()?;
    let generator = config.build_generator()?;
    Ok(Arc::new(GenereportCore::new(db, store, generator, &config)))
}

/// In-memory database and blob store with no AI backend (for testing).
#[uniffi::export]
pub fn open_core_in_memory() -> Result<Arc<GenereportCore>, GenereportError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(GenereportCore::new(
        db,
        Box::new(storage::MemoryStore::new()),
        Box::new(genereport_llm::UnconfiguredGenerator),
        &Config::default(),
    )))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe pipeline wrapper for FFI.
///
/// Operations are serialized on the database lock, including the blocking
/// storage and AI calls they make.
#[derive(uniffi::Object)]
pub struct GenereportCore {
    db: Arc<Mutex<Database>>,
    store: Box<dyn ObjectStore>,
    generator: Box<dyn ReportGenerator>,
    max_mutations: usize,
    short_line_policy: ShortLinePolicy,
}

impl GenereportCore {
    /// Assemble a core from already-built parts.
    pub fn new(
        db: Database,
        store: Box<dyn ObjectStore>,
        generator: Box<dyn ReportGenerator>,
        config: &Config,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            store,
            generator,
            max_mutations: config.pipeline.max_mutations_in_prompt,
            short_line_policy: config.pipeline.short_line_policy,
        }
    }

    fn orchestrator<'a>(&'a self, db: &'a Database) -> ReportOrchestrator<'a> {
        ReportOrchestrator::new(db, self.store.as_ref(), self.generator.as_ref())
            .with_max_mutations(self.max_mutations)
    }
}

#[uniffi::export]
impl GenereportCore {
    // =========================================================================
    // Patient / Sample Operations
    // =========================================================================

    /// Register a patient.
    pub fn create_patient(&self, patient: FfiNewPatient) -> Result<FfiPatient, GenereportError> {
        let db = self.db.lock()?;
        let mut record = Patient::new(patient.first_name, patient.last_name);
        record.date_of_birth = patient.date_of_birth;
        record.sex = patient.sex;
        record.ethnicity = patient.ethnicity;
        db.insert_patient(&record)?;
        Ok(record.into())
    }

    pub fn get_patient(&self, patient_id: String) -> Result<Option<FfiPatient>, GenereportError> {
        let db = self.db.lock()?;
        Ok(db.get_patient(&patient_id)?.map(|p| p.into()))
    }

    /// Register a sample for an existing patient.
    pub fn create_sample(
        &self,
        patient_id: String,
        kind: FfiSampleKind,
        collection_date: String,
        notes: Option<String>,
    ) -> Result<FfiSample, GenereportError> {
        let db = self.db.lock()?;
        let mut sample = Sample::new(patient_id, kind.into(), collection_date);
        sample.notes = notes;
        db.insert_sample(&sample)?;
        Ok(sample.into())
    }

    pub fn get_sample(&self, sample_id: String) -> Result<Option<FfiSample>, GenereportError> {
        let db = self.db.lock()?;
        Ok(db.get_sample(&sample_id)?.map(|s| s.into()))
    }

    // =========================================================================
    // Result File Operations
    // =========================================================================

    /// Store a raw result file for a sample.
    pub fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: String,
        content_type: String,
        sample_id: String,
    ) -> Result<FfiResultFile, GenereportError> {
        let db = self.db.lock()?;
        let file = ResultFileIngestion::new(&db, self.store.as_ref()).upload(
            &bytes,
            &file_name,
            &content_type,
            &sample_id,
        )?;
        Ok(file.into())
    }

    pub fn get_result_file(
        &self,
        result_file_id: String,
    ) -> Result<Option<FfiResultFile>, GenereportError> {
        let db = self.db.lock()?;
        Ok(db.get_result_file(&result_file_id)?.map(|f| f.into()))
    }

    /// Newest first.
    pub fn list_result_files_by_sample(
        &self,
        sample_id: String,
    ) -> Result<Vec<FfiResultFile>, GenereportError> {
        let db = self.db.lock()?;
        let files = db.list_result_files_for_sample(&sample_id)?;
        Ok(files.into_iter().map(|f| f.into()).collect())
    }

    /// Delete a result file and the mutations extracted from it.
    pub fn delete_result_file(&self, result_file_id: String) -> Result<(), GenereportError> {
        let db = self.db.lock()?;
        ResultFileIngestion::new(&db, self.store.as_ref()).delete(&result_file_id)?;
        Ok(())
    }

    // =========================================================================
    // Mutation Operations
    // =========================================================================

    /// Parse a stored result file into mutations.
    pub fn extract_mutations(
        &self,
        result_file_id: String,
    ) -> Result<Vec<FfiMutation>, GenereportError> {
        let db = self.db.lock()?;
        let mutations = MutationExtractor::new(&db, self.store.as_ref())
            .with_short_line_policy(self.short_line_policy)
            .extract(&result_file_id)?;
        Ok(mutations.into_iter().map(|m| m.into()).collect())
    }

    pub fn list_mutations_by_sample(
        &self,
        sample_id: String,
    ) -> Result<Vec<FfiMutation>, GenereportError> {
        let db = self.db.lock()?;
        let mutations = db.list_mutations_for_sample(&sample_id)?;
        Ok(mutations.into_iter().map(|m| m.into()).collect())
    }

    // =========================================================================
    // Report Operations
    // =========================================================================

    /// Generate a report from the sample's current mutations.
    pub fn generate_report(
        &self,
        sample_id: String,
        patient_context: Option<String>,
    ) -> Result<FfiReport, GenereportError> {
        let db = self.db.lock()?;
        let report = self
            .orchestrator(&db)
            .generate(&sample_id, patient_context.as_deref())?;
        Ok(report.into())
    }

    pub fn get_report(&self, report_id: String) -> Result<FfiReport, GenereportError> {
        let db = self.db.lock()?;
        Ok(self.orchestrator(&db).get_report(&report_id)?.into())
    }

    pub fn list_reports_by_sample(&self, sample_id: String) -> Result<Vec<FfiReport>, GenereportError> {
        let db = self.db.lock()?;
        let reports = self.orchestrator(&db).list_reports_by_sample(&sample_id)?;
        Ok(reports.into_iter().map(|r| r.into()).collect())
    }

    pub fn list_reports_by_status(
        &self,
        status: FfiReportStatus,
    ) -> Result<Vec<FfiReport>, GenereportError> {
        let db = self.db.lock()?;
        let reports = self.orchestrator(&db).list_reports_by_status(status.into())?;
        Ok(reports.into_iter().map(|r| r.into()).collect())
    }

    pub fn latest_completed_report(
        &self,
        sample_id: String,
    ) -> Result<Option<FfiReport>, GenereportError> {
        let db = self.db.lock()?;
        let report = self.orchestrator(&db).latest_completed_for_sample(&sample_id)?;
        Ok(report.map(|r| r.into()))
    }

    /// Text of a completed report.
    pub fn get_report_content(&self, report_id: String) -> Result<String, GenereportError> {
        let db = self.db.lock()?;
        Ok(self.orchestrator(&db).get_report_content(&report_id)?)
    }

    pub fn delete_report(&self, report_id: String) -> Result<(), GenereportError> {
        let db = self.db.lock()?;
        self.orchestrator(&db).delete_report(&report_id)?;
        Ok(())
    }

    /// Whether report generation can run at all.
    pub fn is_ai_configured(&self) -> bool {
        self.generator.is_configured()
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient registration input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub sex: Option<String>,
    pub ethnicity: Option<String>,
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub sex: Option<String>,
    pub ethnicity: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            patient_id: patient.patient_id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            date_of_birth: patient.date_of_birth,
            sex: patient.sex,
            ethnicity: patient.ethnicity,
        }
    }
}

/// FFI-safe sample kind.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiSampleKind {
    Blood {
        volume_ml: Option<f64>,
        anticoagulant: Option<String>,
    },
    Dna {
        concentration_ng_per_ul: Option<f64>,
        purity_ratio: Option<f64>,
    },
    Saliva {
        collection_kit: Option<String>,
    },
}

impl From<FfiSampleKind> for SampleKind {
    fn from(kind: FfiSampleKind) -> Self {
        match kind {
            FfiSampleKind::Blood {
                volume_ml,
                anticoagulant,
            } => SampleKind::Blood {
                volume_ml,
                anticoagulant,
            },
            FfiSampleKind::Dna {
                concentration_ng_per_ul,
                purity_ratio,
            } => SampleKind::Dna {
                concentration_ng_per_ul,
                purity_ratio,
            },
            FfiSampleKind::Saliva { collection_kit } => SampleKind::Saliva { collection_kit },
        }
    }
}

impl From<SampleKind> for FfiSampleKind {
    fn from(kind: SampleKind) -> Self {
        match kind {
            SampleKind::Blood {
                volume_ml,
                anticoagulant,
            } => FfiSampleKind::Blood {
                volume_ml,
                anticoagulant,
            },
            SampleKind::Dna {
                concentration_ng_per_ul,
                purity_ratio,
            } => FfiSampleKind::Dna {
                concentration_ng_per_ul,
                purity_ratio,
            },
            SampleKind::Saliva { collection_kit } => FfiSampleKind::Saliva { collection_kit },
        }
    }
}

/// FFI-safe sample.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSample {
    pub sample_id: String,
    pub patient_id: String,
    pub kind: FfiSampleKind,
    pub status: String,
    pub collection_date: String,
    pub notes: Option<String>,
}

impl From<Sample> for FfiSample {
    fn from(sample: Sample) -> Self {
        Self {
            sample_id: sample.sample_id,
            patient_id: sample.patient_id,
            kind: sample.kind.into(),
            status: sample.status.label().to_string(),
            collection_date: sample.collection_date,
            notes: sample.notes,
        }
    }
}

/// FFI-safe result file.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiResultFile {
    pub result_file_id: String,
    pub sample_id: String,
    pub file_name: String,
    pub storage_url: String,
    pub file_size_bytes: i64,
    pub content_type: String,
    pub processing_status: String,
    pub uploaded_at: String,
}

impl From<ResultFile> for FfiResultFile {
    fn from(file: ResultFile) -> Self {
        Self {
            result_file_id: file.result_file_id,
            sample_id: file.sample_id,
            file_name: file.file_name,
            storage_url: file.storage_url,
            file_size_bytes: file.file_size_bytes,
            content_type: file.content_type,
            processing_status: file.processing_status.as_str().to_string(),
            uploaded_at: file.uploaded_at,
        }
    }
}

/// FFI-safe mutation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMutation {
    pub mutation_id: String,
    pub sample_id: String,
    pub gene: String,
    pub chromosome: String,
    pub mutation_type: String,
    pub relevance_tier: String,
    pub comment: String,
}

impl From<Mutation> for FfiMutation {
    fn from(m: Mutation) -> Self {
        Self {
            mutation_id: m.mutation_id,
            sample_id: m.sample_id,
            gene: m.gene,
            chromosome: m.chromosome,
            mutation_type: m.mutation_type,
            relevance_tier: m.relevance.as_str().to_string(),
            comment: m.comment,
        }
    }
}

/// FFI-safe report status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiReportStatus {
    Generating,
    Completed,
    Failed,
}

impl From<FfiReportStatus> for ReportStatus {
    fn from(status: FfiReportStatus) -> Self {
        match status {
            FfiReportStatus::Generating => ReportStatus::Generating,
            FfiReportStatus::Completed => ReportStatus::Completed,
            FfiReportStatus::Failed => ReportStatus::Failed,
        }
    }
}

impl From<ReportStatus> for FfiReportStatus {
    fn from(status: ReportStatus) -> Self {
        match status {
            ReportStatus::Generating => FfiReportStatus::Generating,
            ReportStatus::Completed => FfiReportStatus::Completed,
            ReportStatus::Failed => FfiReportStatus::Failed,
        }
    }
}

/// FFI-safe report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReport {
    pub report_id: String,
    pub sample_id: String,
    pub storage_url: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub generated_at: String,
    pub model_identifier: String,
    pub status: FfiReportStatus,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
}

impl From<Report> for FfiReport {
    fn from(report: Report) -> Self {
        Self {
            report_id: report.report_id,
            sample_id: report.sample_id,
            storage_url: report.storage_url,
            file_size_bytes: report.file_size_bytes,
            generated_at: report.generated_at,
            model_identifier: report.model_identifier,
            status: report.status.into(),
            processing_time_ms: report.processing_time_ms,
            error_message: report.error_message,
        }
    }
}
