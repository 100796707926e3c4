//! Report generation state machine.
//!
//! Each call to [`ReportOrchestrator::generate`] is one attempt and one row:
//!
//! ```text
//! (preconditions) → GENERATING ─┬─→ COMPLETED
//!                               └─→ FAILED
//! ```
//!
//! Both end states are terminal. Another attempt means another call.

use std::time::Instant;

use genereport_llm::ReportGenerator;
use tracing::{debug, error, info, warn};

use super::{build_report_prompt, PipelineError, PipelineResult, PromptInput};
use crate::db::{CompletedReport, Database};
use crate::models::{Report, ReportStatus};
use crate::storage::{content_sha256, read_to_vec, report_key, ObjectStore};

pub const DEFAULT_MAX_MUTATIONS: usize = 50;

/// A generated text that made it into object storage.
struct StoredText {
    key: String,
    url: String,
    size: i64,
    sha256: String,
}

pub struct ReportOrchestrator<'a> {
    db: &'a Database,
    store: &'a dyn ObjectStore,
    generator: &'a dyn ReportGenerator,
    max_mutations: usize,
}

impl<'a> ReportOrchestrator<'a> {
    pub fn new(
        db: &'a Database,
        store: &'a dyn ObjectStore,
        generator: &'a dyn ReportGenerator,
    ) -> Self {
        Self {
            db,
            store,
            generator,
            max_mutations: DEFAULT_MAX_MUTATIONS,
        }
    }

    pub fn with_max_mutations(mut self, max_mutations: usize) -> Self {
        self.max_mutations = max_mutations;
        self
    }

    /// Generate a report for a sample.
    ///
    /// Precondition failures create no row. Once the row exists, any failure
    /// marks it FAILED and is returned unchanged.
    pub fn generate(&self, sample_id: &str, patient_context: Option<&str>) -> PipelineResult<Report> {
        let sample = self
            .db
            .get_sample(sample_id)?
            .ok_or_else(|| PipelineError::NotFound(format!("sample {}", sample_id)))?;

        if !self.generator.is_configured() {
            return Err(PipelineError::Misconfigured);
        }

        if let Some(active) = self.db.find_generating_report(sample_id)? {
            return Err(PipelineError::Conflict(format!(
                "report {} is already generating for sample {}",
                active.report_id, sample_id
            )));
        }

        let mutations = self.db.list_mutations_for_sample(sample_id)?;
        if mutations.is_empty() {
            return Err(PipelineError::Validation(format!(
                "sample {} has no mutations to report on",
                sample_id
            )));
        }

        let patient = self.db.get_patient(&sample.patient_id)?;

        // The partial unique index turns a lost race into Conflict here
        let mut report = Report::start(
            sample_id.to_string(),
            self.generator.model_identifier().to_string(),
        );
        self.db.insert_report(&report)?;
        info!(report_id = %report.report_id, sample_id, mutations = mutations.len(), "report generation started");

        let started = Instant::now();
        let input = PromptInput {
            sample: &sample,
            patient: patient.as_ref(),
            patient_context,
            mutations: &mutations,
            today: chrono::Utc::now().date_naive(),
        };

        let outcome = self
            .run_attempt(&report.report_id, &input)
            .and_then(|stored| self.finish(&mut report, stored, elapsed_ms(started)));

        match outcome {
            Ok(()) => {
                info!(
                    report_id = %report.report_id,
                    elapsed_ms = report.processing_time_ms,
                    bytes = report.file_size_bytes,
                    "report completed"
                );
                Ok(report)
            }
            Err(e) => {
                let elapsed = elapsed_ms(started);
                error!(report_id = %report.report_id, sample_id, error = %e, "report generation failed");
                if let Err(mark) = self.db.mark_report_failed(&report.report_id, elapsed, &e.to_string()) {
                    error!(report_id = %report.report_id, error = %mark, "could not record failed report");
                }
                Err(e)
            }
        }
    }

    /// Prompt, generate and upload.
    fn run_attempt(&self, report_id: &str, input: &PromptInput<'_>) -> PipelineResult<StoredText> {
        let prompt = build_report_prompt(input, self.max_mutations)?;
        debug!(report_id, prompt_chars = prompt.len(), "sending prompt");
        let text = self.generator.generate_text(&prompt)?;
        let bytes = text.as_bytes();
        let key = report_key(report_id, chrono::Utc::now());
        debug!(report_id, key = %key, "uploading report text");
        let url = self.store.put(&key, bytes)?;
        Ok(StoredText {
            key,
            url,
            size: bytes.len() as i64,
            sha256: content_sha256(bytes),
        })
    }

    /// Record completion. A blob the row cannot point at is removed again.
    fn finish(&self, report: &mut Report, stored: StoredText, elapsed: i64) -> PipelineResult<()> {
        if let Err(e) = self.record_completion(&report.report_id, &stored, elapsed) {
            if let Err(cleanup) = self.store.delete(&stored.key) {
                warn!(report_id = %report.report_id, key = %stored.key, error = %cleanup, "failed to remove orphaned report blob");
            }
            return Err(e);
        }
        report.storage_key = Some(stored.key);
        report.storage_url = Some(stored.url);
        report.file_size_bytes = Some(stored.size);
        report.content_sha256 = Some(stored.sha256);
        report.processing_time_ms = Some(elapsed);
        report.status = ReportStatus::Completed;
        Ok(())
    }

    fn record_completion(&self, report_id: &str, stored: &StoredText, elapsed: i64) -> PipelineResult<()> {
        let completed = CompletedReport {
            storage_key: &stored.key,
            storage_url: &stored.url,
            file_size_bytes: stored.size,
            content_sha256: &stored.sha256,
            processing_time_ms: elapsed,
        };
        if !self.db.mark_report_completed(report_id, &completed)? {
            return Err(PipelineError::Conflict(format!(
                "report {} left the generating state",
                report_id
            )));
        }
        Ok(())
    }

    /// Delete a report. The blob goes first on a best-effort basis; the row is
    /// removed whether or not that worked.
    pub fn delete_report(&self, report_id: &str) -> PipelineResult<()> {
        let report = self
            .db
            .get_report(report_id)?
            .ok_or_else(|| PipelineError::NotFound(format!("report {}", report_id)))?;

        if let Some(key) = report.storage_key.as_deref() {
            if let Err(e) = self.store.delete(key) {
                warn!(report_id, key, error = %e, "could not delete report blob");
            }
        }
        self.db.delete_report(report_id)?;
        info!(report_id, "deleted report");
        Ok(())
    }

    pub fn get_report(&self, report_id: &str) -> PipelineResult<Report> {
        self.db
            .get_report(report_id)?
            .ok_or_else(|| PipelineError::NotFound(format!("report {}", report_id)))
    }

    /// Newest first.
    pub fn list_reports_by_sample(&self, sample_id: &str) -> PipelineResult<Vec<Report>> {
        Ok(self.db.list_reports_for_sample(sample_id)?)
    }

    pub fn list_reports_by_status(&self, status: ReportStatus) -> PipelineResult<Vec<Report>> {
        Ok(self.db.list_reports_by_status(&status)?)
    }

    pub fn latest_completed_for_sample(&self, sample_id: &str) -> PipelineResult<Option<Report>> {
        Ok(self.db.latest_completed_report(sample_id)?)
    }

    /// Fetch the generated text of a completed report.
    pub fn get_report_content(&self, report_id: &str) -> PipelineResult<String> {
        let report = self.get_report(report_id)?;
        let key = match (report.status, report.storage_key.as_deref()) {
            (ReportStatus::Completed, Some(key)) => key,
            (status, _) => {
                return Err(PipelineError::Validation(format!(
                    "report {} has no content (status {:?})",
                    report_id, status
                )))
            }
        };
        let bytes = read_to_vec(self.store, key)?;
        String::from_utf8(bytes).map_err(|_| {
            PipelineError::Validation(format!("report {} content is not valid UTF-8", report_id))
        })
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mutation, MutationRecord, Patient, RelevanceTier, Sample, SampleKind};
    use crate::pipeline::{ErrorKind, MutationExtractor, ResultFileIngestion};
    use crate::storage::MemoryStore;
    use genereport_llm::{MockGenerator, MockResponse};

    const VARIANTS: &str = "gene,chromosome,type,relevance,comment\n\
        BRCA1,17,SNV,HIGH,Pathogenic variant\n\
        TP53,17,DELETION,MEDIUM,Tumor suppressor variant\n";

    fn setup() -> (Database, MemoryStore, String) {
        let db = Database::open_in_memory().unwrap();
        let mut patient = Patient::new("Ada".into(), "Byron".into());
        patient.sex = Some("F".into());
        db.insert_patient(&patient).unwrap();
        let sample = Sample::new(
            patient.patient_id,
            SampleKind::Dna {
                concentration_ng_per_ul: Some(52.5),
                purity_ratio: Some(1.8),
            },
            "2024-01-15".into(),
        );
        db.insert_sample(&sample).unwrap();
        (db, MemoryStore::new(), sample.sample_id)
    }

    fn with_mutations() -> (Database, MemoryStore, String) {
        let (db, store, sample_id) = setup();
        let file = ResultFileIngestion::new(&db, &store)
            .upload(VARIANTS.as_bytes(), "variants.csv", "text/csv", &sample_id)
            .unwrap();
        MutationExtractor::new(&db, &store)
            .extract(&file.result_file_id)
            .unwrap();
        (db, store, sample_id)
    }

    #[test]
    fn test_generate_completes() {
        let (db, store, sample_id) = with_mutations();
        let generator = MockGenerator::with_text("REPORT TEXT");
        let orchestrator = ReportOrchestrator::new(&db, &store, &generator);

        let report = orchestrator.generate(&sample_id, Some("Smoker")).unwrap();

        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.file_size_bytes, Some(11));
        assert_eq!(report.model_identifier, "mock-model");
        assert!(report.processing_time_ms.unwrap() >= 0);
        let url = report.storage_url.clone().unwrap();
        assert!(!url.is_empty());

        let stored = db.get_report(&report.report_id).unwrap().unwrap();
        assert_eq!(stored, report);
        assert_eq!(
            orchestrator.get_report_content(&report.report_id).unwrap(),
            "REPORT TEXT"
        );

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("BRCA1"));
        assert!(prompts[0].contains("TP53"));
        assert!(prompts[0].contains("Smoker"));
        assert!(prompts[0].contains("Sex: F"));
    }

    #[test]
    fn test_no_mutations_creates_no_row() {
        let (db, store, sample_id) = setup();
        let generator = MockGenerator::with_text("x");
        let err = ReportOrchestrator::new(&db, &store, &generator)
            .generate(&sample_id, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(db.list_reports_for_sample(&sample_id).unwrap().is_empty());
        assert!(generator.prompts().is_empty());
    }

    #[test]
    fn test_missing_sample() {
        let (db, store, _) = setup();
        let generator = MockGenerator::with_text("x");
        let err = ReportOrchestrator::new(&db, &store, &generator)
            .generate("missing", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_unconfigured_backend() {
        let (db, store, sample_id) = with_mutations();
        let generator = MockGenerator::with_text("x").unconfigured();
        let err = ReportOrchestrator::new(&db, &store, &generator)
            .generate(&sample_id, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Misconfigured);
        assert!(db.list_reports_for_sample(&sample_id).unwrap().is_empty());
    }

    #[test]
    fn test_ai_failure_marks_failed_and_propagates() {
        let (db, store, sample_id) = with_mutations();
        let generator = MockGenerator::failing("model overloaded");
        let err = ReportOrchestrator::new(&db, &store, &generator)
            .generate(&sample_id, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);

        let reports = db.list_reports_for_sample(&sample_id).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, ReportStatus::Failed);
        assert!(reports[0].processing_time_ms.is_some());
        assert!(reports[0].error_message.as_deref().unwrap().contains("model overloaded"));
        assert!(reports[0].storage_key.is_none());
        assert_eq!(store.len(), 1); // only the result file
    }

    /// Fails the in-flight row from another connection, then answers normally.
    struct RowFlippingGenerator {
        conn: std::sync::Mutex<rusqlite::Connection>,
    }

    impl ReportGenerator for RowFlippingGenerator {
        fn generate_text(&self, _prompt: &str) -> genereport_llm::GenerationResult<String> {
            if let Ok(conn) = self.conn.lock() {
                conn.execute(
                    "UPDATE reports SET status = 'failed' WHERE status = 'generating'",
                    [],
                )
                .unwrap();
            }
            Ok("REPORT TEXT".to_string())
        }

        fn is_configured(&self) -> bool {
            true
        }

        fn model_identifier(&self) -> &str {
            "flipping-model"
        }
    }

    #[test]
    fn test_lost_completion_removes_uploaded_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genereport.db");
        let db = Database::open(&path).unwrap();
        let store = MemoryStore::new();

        let patient = Patient::new("Ada".into(), "Byron".into());
        db.insert_patient(&patient).unwrap();
        let sample = Sample::new(
            patient.patient_id,
            SampleKind::Saliva { collection_kit: None },
            "2024-01-15".into(),
        );
        db.insert_sample(&sample).unwrap();
        let file = ResultFileIngestion::new(&db, &store)
            .upload(VARIANTS.as_bytes(), "variants.csv", "text/csv", &sample.sample_id)
            .unwrap();
        MutationExtractor::new(&db, &store)
            .extract(&file.result_file_id)
            .unwrap();
        let blobs_before = store.len();

        let generator = RowFlippingGenerator {
            conn: std::sync::Mutex::new(rusqlite::Connection::open(&path).unwrap()),
        };
        let err = ReportOrchestrator::new(&db, &store, &generator)
            .generate(&sample.sample_id, None)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.len(), blobs_before);
        let reports = db.list_reports_for_sample(&sample.sample_id).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, ReportStatus::Failed);
        assert!(reports[0].storage_key.is_none());
    }

    #[test]
    fn test_upload_failure_marks_failed() {
        let (db, store, sample_id) = with_mutations();
        store.fail_puts(true);
        let generator = MockGenerator::with_text("REPORT TEXT");
        let err = ReportOrchestrator::new(&db, &store, &generator)
            .generate(&sample_id, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        let reports = db.list_reports_by_status(&ReportStatus::Failed).unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_mutation_limit_marks_failed() {
        let (db, store, sample_id) = with_mutations();
        let generator = MockGenerator::with_text("x");
        let err = ReportOrchestrator::new(&db, &store, &generator)
            .with_max_mutations(1)
            .generate(&sample_id, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(generator.prompts().is_empty());

        let reports = db.list_reports_for_sample(&sample_id).unwrap();
        assert_eq!(reports[0].status, ReportStatus::Failed);
        assert!(reports[0].error_message.as_deref().unwrap().contains("at most 1"));
    }

    #[test]
    fn test_generating_row_blocks_new_attempt() {
        let (db, store, sample_id) = with_mutations();
        db.insert_report(&Report::start(sample_id.clone(), "other".into()))
            .unwrap();

        let generator = MockGenerator::with_text("x");
        let err = ReportOrchestrator::new(&db, &store, &generator)
            .generate(&sample_id, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(db.list_reports_for_sample(&sample_id).unwrap().len(), 1);
    }

    #[test]
    fn test_each_attempt_is_a_new_row() {
        let (db, store, sample_id) = with_mutations();
        let generator = MockGenerator::with_text("second");
        generator.push(MockResponse::Fail("first".into()));
        let orchestrator = ReportOrchestrator::new(&db, &store, &generator);

        assert!(orchestrator.generate(&sample_id, None).is_err());
        let ok = orchestrator.generate(&sample_id, None).unwrap();

        assert_eq!(orchestrator.list_reports_by_sample(&sample_id).unwrap().len(), 2);
        let latest = orchestrator.latest_completed_for_sample(&sample_id).unwrap().unwrap();
        assert_eq!(latest.report_id, ok.report_id);
    }

    #[test]
    fn test_delete_survives_blob_failure() {
        let (db, store, sample_id) = with_mutations();
        let generator = MockGenerator::with_text("REPORT TEXT");
        let orchestrator = ReportOrchestrator::new(&db, &store, &generator);
        let report = orchestrator.generate(&sample_id, None).unwrap();

        store.fail_deletes(true);
        orchestrator.delete_report(&report.report_id).unwrap();
        assert!(db.get_report(&report.report_id).unwrap().is_none());
    }

    #[test]
    fn test_delete_failed_report_without_blob() {
        let (db, store, sample_id) = with_mutations();
        let generator = MockGenerator::failing("boom");
        let orchestrator = ReportOrchestrator::new(&db, &store, &generator);
        assert!(orchestrator.generate(&sample_id, None).is_err());

        let failed = &orchestrator.list_reports_by_status(ReportStatus::Failed).unwrap()[0];
        orchestrator.delete_report(&failed.report_id).unwrap();
        assert_eq!(
            orchestrator.delete_report(&failed.report_id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_content_of_failed_report_is_rejected() {
        let (db, store, sample_id) = with_mutations();
        let generator = MockGenerator::failing("boom");
        let orchestrator = ReportOrchestrator::new(&db, &store, &generator);
        assert!(orchestrator.generate(&sample_id, None).is_err());

        let failed = &orchestrator.list_reports_by_status(ReportStatus::Failed).unwrap()[0];
        assert_eq!(
            orchestrator.get_report_content(&failed.report_id).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_prompt_keeps_extraction_order() {
        let (db, store, sample_id) = setup();
        let file = ResultFileIngestion::new(&db, &store)
            .upload(b"h\nZZZ1,1,SNV,LOW,\nAAA1,2,SNV,HIGH,\n", "v.csv", "text/csv", &sample_id)
            .unwrap();
        let extra = Mutation::from_record(
            MutationRecord {
                gene: "MMM1".into(),
                chromosome: "3".into(),
                mutation_type: "SNV".into(),
                relevance: RelevanceTier::Medium,
                comment: String::new(),
            },
            &sample_id,
            &file.result_file_id,
        );
        MutationExtractor::new(&db, &store)
            .extract(&file.result_file_id)
            .unwrap();
        db.insert_mutations(&[extra]).unwrap();

        let generator = MockGenerator::with_text("x");
        ReportOrchestrator::new(&db, &store, &generator)
            .generate(&sample_id, None)
            .unwrap();

        let prompt = &generator.prompts()[0];
        let z = prompt.find("ZZZ1").unwrap();
        let a = prompt.find("AAA1").unwrap();
        let m = prompt.find("MMM1").unwrap();
        assert!(z < a && a < m);
    }
}
