//! End-to-end pipeline tests: upload → extract → generate → delete.

use genereport_core::config::Config;
use genereport_core::db::Database;
use genereport_core::models::{Patient, RelevanceTier, ReportStatus, Sample, SampleKind};
use genereport_core::pipeline::{ErrorKind, MutationExtractor, ReportOrchestrator, ResultFileIngestion};
use genereport_core::storage::{FilesystemStore, MemoryStore};
use genereport_core::{FfiNewPatient, FfiReportStatus, FfiSampleKind, GenereportCore, GenereportError};
use genereport_llm::MockGenerator;

const VARIANTS: &str = "gene,chromosome,type,relevance,comment\n\
    BRCA1,17,SNV,HIGH,Pathogenic variant\n\
    TP53,17,DELETION,MEDIUM,Tumor suppressor variant\n";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn register_sample(db: &Database) -> String {
    let mut patient = Patient::new("Grace".to_string(), "Hopper".to_string());
    patient.date_of_birth = Some("1970-12-09".to_string());
    db.insert_patient(&patient).unwrap();

    let mut sample = Sample::new(
        patient.patient_id,
        SampleKind::Blood {
            volume_ml: Some(4.5),
            anticoagulant: Some("EDTA".to_string()),
        },
        "2024-01-15".to_string(),
    );
    sample.notes = Some("Fasting draw".to_string());
    db.insert_sample(&sample).unwrap();
    sample.sample_id
}

#[test]
fn test_full_pipeline_on_filesystem_store() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("app.db")).unwrap();
    let store = FilesystemStore::new(dir.path().join("blobs")).unwrap();
    let generator = MockGenerator::with_text("REPORT TEXT");
    let sample_id = register_sample(&db);

    let file = ResultFileIngestion::new(&db, &store)
        .upload(VARIANTS.as_bytes(), "variants.csv", "text/csv", &sample_id)
        .unwrap();
    assert!(file.storage_url.starts_with("file://"));

    let mutations = MutationExtractor::new(&db, &store)
        .extract(&file.result_file_id)
        .unwrap();
    assert_eq!(mutations.len(), 2);
    assert_eq!(mutations[0].gene, "BRCA1");
    assert_eq!(mutations[0].relevance, RelevanceTier::High);
    assert_eq!(mutations[1].gene, "TP53");
    assert_eq!(mutations[1].relevance, RelevanceTier::Medium);

    let orchestrator = ReportOrchestrator::new(&db, &store, &generator);
    let report = orchestrator.generate(&sample_id, None).unwrap();
    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.file_size_bytes, Some("REPORT TEXT".len() as i64));
    assert!(report.storage_url.is_some());

    let key = report.storage_key.clone().unwrap();
    let on_disk = std::fs::read_to_string(store.root().join(&key)).unwrap();
    assert_eq!(on_disk, "REPORT TEXT");

    orchestrator.delete_report(&report.report_id).unwrap();
    assert!(!store.root().join(&key).exists());
    assert!(orchestrator.list_reports_by_sample(&sample_id).unwrap().is_empty());
}

#[test]
fn test_reextraction_accumulates_and_delete_cascades() {
    init_tracing();
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::new();
    let sample_id = register_sample(&db);

    let ingestion = ResultFileIngestion::new(&db, &store);
    let first = ingestion
        .upload(VARIANTS.as_bytes(), "a.csv", "text/csv", &sample_id)
        .unwrap();
    let second = ingestion
        .upload(b"h\nEGFR,7,SNV,LOW,Benign\n", "b.csv", "text/csv", &sample_id)
        .unwrap();

    let extractor = MutationExtractor::new(&db, &store);
    extractor.extract(&first.result_file_id).unwrap();
    extractor.extract(&second.result_file_id).unwrap();
    assert_eq!(db.count_mutations_for_sample(&sample_id).unwrap(), 3);

    ingestion.delete(&first.result_file_id).unwrap();
    let left = db.list_mutations_for_sample(&sample_id).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].gene, "EGFR");
    assert!(!store.contains(&first.storage_key));
}

#[test]
fn test_failed_attempt_then_retry_keeps_history() {
    init_tracing();
    let db = Database::open_in_memory().unwrap();
    let store = MemoryStore::new();
    let sample_id = register_sample(&db);
    let file = ResultFileIngestion::new(&db, &store)
        .upload(VARIANTS.as_bytes(), "a.csv", "text/csv", &sample_id)
        .unwrap();
    MutationExtractor::new(&db, &store)
        .extract(&file.result_file_id)
        .unwrap();

    let failing = MockGenerator::failing("upstream timeout");
    let err = ReportOrchestrator::new(&db, &store, &failing)
        .generate(&sample_id, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalService);

    let working = MockGenerator::with_text("second try");
    let orchestrator = ReportOrchestrator::new(&db, &store, &working);
    let report = orchestrator.generate(&sample_id, Some("Follow-up")).unwrap();

    let all = orchestrator.list_reports_by_sample(&sample_id).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(orchestrator.list_reports_by_status(ReportStatus::Failed).unwrap().len(), 1);
    assert_eq!(
        orchestrator
            .latest_completed_for_sample(&sample_id)
            .unwrap()
            .unwrap()
            .report_id,
        report.report_id
    );
    assert_eq!(orchestrator.get_report_content(&report.report_id).unwrap(), "second try");
}

#[test]
fn test_core_object_with_mock_backend() {
    init_tracing();
    let core = GenereportCore::new(
        Database::open_in_memory().unwrap(),
        Box::new(MemoryStore::new()),
        Box::new(MockGenerator::with_text("REPORT TEXT")),
        &Config::default(),
    );

    let patient = core
        .create_patient(FfiNewPatient {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            date_of_birth: None,
            sex: Some("F".to_string()),
            ethnicity: None,
        })
        .unwrap();
    let sample = core
        .create_sample(
            patient.patient_id,
            FfiSampleKind::Saliva { collection_kit: None },
            "2024-02-01".to_string(),
            None,
        )
        .unwrap();

    let err = core.generate_report(sample.sample_id.clone(), None).unwrap_err();
    assert!(matches!(err, GenereportError::ValidationFailed(_)));

    let file = core
        .upload(
            VARIANTS.as_bytes().to_vec(),
            "variants.csv".to_string(),
            "text/csv".to_string(),
            sample.sample_id.clone(),
        )
        .unwrap();
    core.extract_mutations(file.result_file_id).unwrap();

    let report = core.generate_report(sample.sample_id.clone(), None).unwrap();
    assert_eq!(report.status, FfiReportStatus::Completed);
    assert_eq!(report.file_size_bytes, Some(11));
    assert_eq!(core.get_report_content(report.report_id.clone()).unwrap(), "REPORT TEXT");

    core.delete_report(report.report_id.clone()).unwrap();
    assert!(matches!(
        core.get_report(report.report_id),
        Err(GenereportError::NotFound(_))
    ));
}

#[test]
fn test_config_file_drives_core() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("genereport.toml");
    let config = format!(
        "[database]\npath = \"{}\"\n\n[storage]\nbackend = \"filesystem\"\nroot = \"{}\"\n",
        dir.path().join("app.db").display(),
        dir.path().join("blobs").display()
    );
    std::fs::write(&config_path, config).unwrap();

    let core = genereport_core::open_core(config_path.display().to_string()).unwrap();
    assert!(!core.is_ai_configured());
    assert!(dir.path().join("app.db").exists());
}
