//! Integration tests driving a [`Session`] end to end against a scripted
//! in-process backend.
//!
//! Nothing here opens a socket: `FakeBackend` implements the same trait as
//! the HTTP client and records every call, so each flow can pin down
//! exactly which endpoints it hits and how often. Live-backend coverage
//! lives in `tests/e2e.rs`.

use async_trait::async_trait;
use pdftrans::{
    ArtifactKind, ArtifactRef, BackendApi, CancellationToken, Cell, ClientConfig, JobHandle,
    JobStatus, PathValidation, PdfSource, PollOutcome, ResultSet, Session, StatusResponse,
    TableOutcome, TranslateError, TranslationProgressCallback, UploadedPdf,
};
use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Scripted backend ─────────────────────────────────────────────────────────

/// In-process stand-in for the translation backend.
///
/// Status queries are answered from a script (an exhausted script keeps
/// answering "pending"); artifact bodies come from a path→bytes map; every
/// endpoint bumps a counter so tests can assert on traffic, not just on
/// results.
#[derive(Default)]
struct FakeBackend {
    statuses: Mutex<VecDeque<Result<StatusResponse, TranslateError>>>,
    listing: ResultSet,
    bodies: HashMap<String, Vec<u8>>,
    pdfs: Vec<UploadedPdf>,
    path_verdict: Option<PathValidation>,
    archive: Vec<u8>,

    uploads: AtomicUsize,
    validations: AtomicUsize,
    status_queries: AtomicUsize,
    listings: AtomicUsize,
    started: Mutex<Vec<(String, String)>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeBackend {
    fn with_statuses(statuses: &[JobStatus]) -> Self {
        Self {
            statuses: Mutex::new(
                statuses
                    .iter()
                    .map(|s| {
                        Ok(StatusResponse {
                            status: *s,
                            message: None,
                        })
                    })
                    .collect(),
            ),
            ..Self::default()
        }
    }

    fn with_script(script: Vec<Result<StatusResponse, TranslateError>>) -> Self {
        Self {
            statuses: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    fn listing(mut self, listing: ResultSet) -> Self {
        self.listing = listing;
        self
    }

    fn body(mut self, path: &str, bytes: &[u8]) -> Self {
        self.bodies.insert(path.to_string(), bytes.to_vec());
        self
    }

    fn rejecting_paths(mut self, message: &str) -> Self {
        self.path_verdict = Some(PathValidation {
            valid: false,
            filename: None,
            message: Some(message.to_string()),
        });
        self
    }

    fn started(&self) -> Vec<(String, String)> {
        self.started.lock().unwrap().clone()
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn upload_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedPdf, TranslateError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(UploadedPdf {
            path: format!("pdf_store/{filename}"),
            filename: filename.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }

    async fn validate_path(&self, _path: &str) -> Result<PathValidation, TranslateError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        Ok(self.path_verdict.clone().unwrap_or(PathValidation {
            valid: true,
            filename: None,
            message: None,
        }))
    }

    async fn start_translation(
        &self,
        file_path: &str,
        target_language: &str,
    ) -> Result<(), TranslateError> {
        self.started
            .lock()
            .unwrap()
            .push((file_path.to_string(), target_language.to_string()));
        Ok(())
    }

    async fn job_status(&self, _job_id: &str) -> Result<StatusResponse, TranslateError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        self.statuses.lock().unwrap().pop_front().unwrap_or(Ok(
            StatusResponse {
                status: JobStatus::Pending,
                message: None,
            },
        ))
    }

    async fn list_pdfs(&self) -> Result<Vec<UploadedPdf>, TranslateError> {
        Ok(self.pdfs.clone())
    }

    async fn list_results(&self) -> Result<ResultSet, TranslateError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.clone())
    }

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, TranslateError> {
        self.fetched.lock().unwrap().push(path.to_string());
        self.bodies
            .get(path)
            .cloned()
            .ok_or_else(|| TranslateError::Network {
                context: format!("fetching {path}"),
                message: "no body scripted for this path".to_string(),
            })
    }

    async fn download_archive(&self, _job_id: &str) -> Result<Vec<u8>, TranslateError> {
        Ok(self.archive.clone())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Defaults, but polling in milliseconds so the tests finish promptly.
fn fast_config() -> ClientConfig {
    let mut config = ClientConfig::builder().build().unwrap();
    config.poll_interval = Duration::from_millis(10);
    config
}

fn session_over(backend: Arc<FakeBackend>) -> Session {
    Session::with_backend(backend, fast_config())
}

fn reference(path: &str) -> ArtifactRef {
    ArtifactRef {
        path: path.to_string(),
        filename: path.rsplit('/').next().unwrap_or(path).to_string(),
        size_bytes: 0,
    }
}

/// A decodable XLSX: one sheet "Summary" with a header row and one data row.
fn results_xlsx() -> Vec<u8> {
    let parts: [(&str, &str); 2] = [
        (
            "xl/workbook.xml",
            r#"<workbook><sheets><sheet name="Summary" sheetId="1"/></sheets></workbook>"#,
        ),
        (
            "xl/worksheets/sheet1.xml",
            concat!(
                r#"<worksheet><sheetData>"#,
                r#"<row r="1"><c r="A1" t="inlineStr"><is><t>Item</t></is></c>"#,
                r#"<c r="B1" t="inlineStr"><is><t>Total</t></is></c></row>"#,
                r#"<row r="2"><c r="A2" t="inlineStr"><is><t>Widget</t></is></c>"#,
                r#"<c r="B2"><v>42</v></c></row>"#,
                r#"</sheetData></worksheet>"#,
            ),
        ),
    ];
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, xml) in parts {
        writer
            .start_file(
                name,
                zip::write::FileOptions::default()
                    .compression_method(zip::CompressionMethod::Deflated),
            )
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

// ── The full arc ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn translate_walks_the_whole_arc_with_no_redundant_traffic() {
    let backend = Arc::new(
        FakeBackend::with_statuses(&[
            JobStatus::Processing,
            JobStatus::Processing,
            JobStatus::Completed,
        ])
        .listing(ResultSet {
            text: Some(reference("result/translated_report.txt")),
            table: Some(reference("result/report_table.xlsx")),
            ..ResultSet::default()
        })
        .body("result/translated_report.txt", "translated body".as_bytes())
        .body("result/report_table.xlsx", &results_xlsx()),
    );
    let session = session_over(backend.clone());

    let source = session.use_local_path(r"C:\docs\report.pdf").await.unwrap();
    assert_eq!(source.filename(), "report.pdf");
    assert_eq!(backend.validations.load(Ordering::SeqCst), 1);

    let outcome = session
        .translate("en", &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.handle.id, "report.pdf");
    assert_eq!(outcome.stats.poll_attempts, 3);
    assert_eq!(outcome.stats.artifacts_loaded, 2);
    assert_eq!(outcome.stats.artifacts_failed, 0);

    // Exactly one submission, with the validated path and requested language.
    assert_eq!(
        backend.started(),
        vec![(r"C:\docs\report.pdf".to_string(), "en".to_string())]
    );
    // Three status queries for three scripted statuses, one listing, and
    // each listed artifact fetched exactly once.
    assert_eq!(backend.status_queries.load(Ordering::SeqCst), 3);
    assert_eq!(backend.listings.load(Ordering::SeqCst), 1);
    assert_eq!(
        backend.fetched(),
        vec![
            "result/translated_report.txt".to_string(),
            "result/report_table.xlsx".to_string(),
        ]
    );

    let results = outcome.results.expect("completed jobs carry results");
    assert_eq!(results.text.as_deref(), Some("translated body"));
    assert!(results.formulas.is_none());
    let workbook = results
        .table
        .as_ref()
        .and_then(TableOutcome::workbook)
        .expect("table artifact should decode");
    assert_eq!(workbook.sheet_names(), vec!["Summary"]);
    assert_eq!(
        workbook.first_sheet().unwrap().cell(1, 1),
        Some(&Cell::Number(42.0))
    );

    // The session is ready for the next job.
    assert!(!session.is_processing());
}

#[tokio::test]
async fn upload_then_translate_submits_the_stored_backend_path() {
    let backend = Arc::new(FakeBackend::with_statuses(&[JobStatus::Completed]));
    let session = session_over(backend.clone());

    let uploaded = session
        .upload("report.pdf", b"%PDF-1.7 tiny".to_vec())
        .await
        .unwrap();
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(uploaded.path, "pdf_store/report.pdf");
    assert!(matches!(
        session.selection(),
        Some(PdfSource::Uploaded { .. })
    ));

    let outcome = session
        .translate("zh", &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.is_completed());
    // The job runs against the stored copy, not the client-side filename.
    assert_eq!(
        backend.started(),
        vec![("pdf_store/report.pdf".to_string(), "zh".to_string())]
    );
    // Empty listing: completion with nothing to load is still a completion.
    assert_eq!(outcome.stats.artifacts_loaded, 0);
    assert!(outcome.results.expect("results present").is_empty());
}

#[tokio::test]
async fn backend_rejected_path_surfaces_its_message() {
    let backend =
        Arc::new(FakeBackend::default().rejecting_paths("file not found on the backend host"));
    let session = session_over(backend.clone());

    let err = session
        .use_local_path(r"C:\docs\missing.pdf")
        .await
        .unwrap_err();

    match err {
        TranslateError::InvalidPath { path, reason } => {
            assert_eq!(path, r"C:\docs\missing.pdf");
            assert!(reason.contains("not found"));
        }
        other => panic!("expected InvalidPath, got {other:?}"),
    }
    assert_eq!(backend.validations.load(Ordering::SeqCst), 1);
    assert!(session.selection().is_none(), "rejected paths must not stick");
}

// ── Terminal states short of success ─────────────────────────────────────────

#[tokio::test]
async fn failed_job_skips_result_loading_entirely() {
    let backend = Arc::new(FakeBackend::with_script(vec![
        Ok(StatusResponse {
            status: JobStatus::Processing,
            message: None,
        }),
        Ok(StatusResponse {
            status: JobStatus::Failed,
            message: Some("conversion crashed on page 3".to_string()),
        }),
    ]));
    let session = session_over(backend.clone());
    session.use_local_path(r"C:\docs\report.pdf").await.unwrap();

    let outcome = session
        .translate("en", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome.outcome,
        PollOutcome::Failed {
            message: Some("conversion crashed on page 3".to_string())
        }
    );
    assert!(outcome.results.is_none());
    assert_eq!(backend.listings.load(Ordering::SeqCst), 0);
    assert!(backend.fetched().is_empty());
    assert!(!session.is_processing());
}

#[tokio::test]
async fn exhausted_poll_budget_leaves_the_session_usable() {
    // Empty script: the backend answers "pending" forever.
    let backend = Arc::new(FakeBackend::with_statuses(&[]));
    let mut config = fast_config();
    config.max_poll_attempts = 3;
    let session = Session::with_backend(backend.clone(), config);
    session.use_local_path(r"C:\docs\report.pdf").await.unwrap();

    let err = session
        .translate("en", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::PollExhausted { attempts: 3, .. }));
    assert_eq!(backend.status_queries.load(Ordering::SeqCst), 3);
    assert!(!session.is_processing());

    // The selection survives and a new submission is accepted.
    let handle = session.submit("en").await.unwrap();
    assert_eq!(handle.id, "report.pdf");
    assert_eq!(backend.started().len(), 2);
}

#[tokio::test]
async fn status_transport_error_halts_the_watch_and_releases_the_flag() {
    let backend = Arc::new(FakeBackend::with_script(vec![
        Ok(StatusResponse {
            status: JobStatus::Processing,
            message: None,
        }),
        Err(TranslateError::Network {
            context: "querying job status".to_string(),
            message: "connection refused".to_string(),
        }),
    ]));
    let session = session_over(backend.clone());
    session.use_local_path(r"C:\docs\report.pdf").await.unwrap();

    let err = session
        .translate("en", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TranslateError::Network { .. }));
    assert_eq!(backend.status_queries.load(Ordering::SeqCst), 2);
    assert!(!session.is_processing());
}

#[tokio::test]
async fn cancellation_mid_watch_reports_cancelled_and_loads_nothing() {
    let backend = Arc::new(FakeBackend::with_statuses(&[]));
    let mut config = fast_config();
    config.poll_interval = Duration::from_millis(20);
    let session = Session::with_backend(backend.clone(), config);
    session.use_local_path(r"C:\docs\report.pdf").await.unwrap();

    let cancel = CancellationToken::new();
    let (outcome, ()) = tokio::join!(session.translate("en", &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });
    let outcome = outcome.unwrap();

    assert_eq!(outcome.outcome, PollOutcome::Cancelled);
    assert!(outcome.results.is_none());
    assert_eq!(backend.listings.load(Ordering::SeqCst), 0);
    assert!(!session.is_processing());
}

// ── Partial results ──────────────────────────────────────────────────────────

#[tokio::test]
async fn one_broken_artifact_does_not_hide_the_others() {
    let listing = ResultSet {
        text: Some(reference("result/translated_report.txt")),
        // No body scripted: the fetch fails.
        formulas: Some(reference("result/formulas.txt")),
        // Body present but not an XLSX archive.
        table: Some(reference("result/report_table.xlsx")),
        images: vec![
            reference("result/images/page_1.png"),
            reference("result/images/page_2.png"),
        ],
    };
    let backend = Arc::new(
        FakeBackend::with_statuses(&[JobStatus::Completed])
            .listing(listing)
            .body("result/translated_report.txt", "translated body".as_bytes())
            .body("result/report_table.xlsx", b"not a workbook"),
    );
    let session = session_over(backend.clone());
    session.use_local_path(r"C:\docs\report.pdf").await.unwrap();

    let outcome = session
        .translate("en", &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.stats.artifacts_loaded, 3);
    assert_eq!(outcome.stats.artifacts_failed, 1);

    let results = outcome.results.expect("results present");
    assert_eq!(results.text.as_deref(), Some("translated body"));
    assert!(results.formulas.is_none());
    assert_eq!(results.errors.len(), 1);
    assert_eq!(results.errors[0].kind(), ArtifactKind::Formulas);

    // The corrupt table keeps its reference so callers can still point at
    // the raw file.
    match results.table.as_ref().expect("table outcome present") {
        TableOutcome::Undecodable { reference, reason } => {
            assert_eq!(reference.filename, "report_table.xlsx");
            assert!(!reason.is_empty());
        }
        TableOutcome::Decoded(_) => panic!("garbage bytes must not decode"),
    }

    // Images are addressed, never fetched.
    assert_eq!(results.images.len(), 2);
    assert_eq!(
        results.images[0].url,
        "http://127.0.0.1:1234/result/images/page_1.png"
    );
    let fetched = backend.fetched();
    assert!(fetched.iter().all(|path| !path.contains("images")));
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingCallback {
    submitted: Mutex<Vec<String>>,
    polls: Mutex<Vec<(u32, JobStatus)>>,
    terminals: Mutex<Vec<String>>,
    loaded: Mutex<Vec<(ArtifactKind, usize)>>,
    failed: Mutex<Vec<ArtifactKind>>,
}

impl TranslationProgressCallback for RecordingCallback {
    fn on_submitted(&self, handle: &JobHandle) {
        self.submitted.lock().unwrap().push(handle.id.clone());
    }
    fn on_poll(&self, attempt: u32, status: JobStatus) {
        self.polls.lock().unwrap().push((attempt, status));
    }
    fn on_terminal(&self, outcome: &PollOutcome) {
        self.terminals.lock().unwrap().push(outcome.label().to_string());
    }
    fn on_artifact_loaded(&self, kind: ArtifactKind, amount: usize) {
        self.loaded.lock().unwrap().push((kind, amount));
    }
    fn on_artifact_failed(&self, kind: ArtifactKind, _error: String) {
        self.failed.lock().unwrap().push(kind);
    }
}

#[tokio::test]
async fn progress_events_cover_submission_polling_and_loading() {
    let backend = Arc::new(
        FakeBackend::with_statuses(&[JobStatus::Processing, JobStatus::Completed]).listing(
            ResultSet {
                text: Some(reference("result/translated_report.txt")),
                ..ResultSet::default()
            },
        )
        .body("result/translated_report.txt", "translated body".as_bytes()),
    );
    let recorder = Arc::new(RecordingCallback::default());
    let mut config = ClientConfig::builder()
        .progress_callback(recorder.clone() as Arc<dyn TranslationProgressCallback>)
        .build()
        .unwrap();
    config.poll_interval = Duration::from_millis(10);
    let session = Session::with_backend(backend, config);
    session.use_local_path(r"C:\docs\report.pdf").await.unwrap();

    session
        .translate("en", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        recorder.submitted.lock().unwrap().as_slice(),
        &["report.pdf".to_string()]
    );
    assert_eq!(
        recorder.polls.lock().unwrap().as_slice(),
        &[(1, JobStatus::Processing), (2, JobStatus::Completed)]
    );
    assert_eq!(
        recorder.terminals.lock().unwrap().as_slice(),
        &["completed".to_string()]
    );
    assert_eq!(
        recorder.loaded.lock().unwrap().as_slice(),
        &[(ArtifactKind::Text, "translated body".len())]
    );
    assert!(recorder.failed.lock().unwrap().is_empty());
}

// ── Standalone queries ───────────────────────────────────────────────────────

#[tokio::test]
async fn list_pdfs_and_archive_pass_straight_through() {
    let mut backend = FakeBackend::default();
    backend.pdfs = vec![
        UploadedPdf {
            path: "pdf_store/a.pdf".to_string(),
            filename: "a.pdf".to_string(),
            size_bytes: 1024,
        },
        UploadedPdf {
            path: "pdf_store/b.pdf".to_string(),
            filename: "b.pdf".to_string(),
            size_bytes: 2048,
        },
    ];
    backend.archive = b"PK\x03\x04 pretend archive".to_vec();
    let session = session_over(Arc::new(backend));

    let pdfs = session.list_pdfs().await.unwrap();
    assert_eq!(pdfs.len(), 2);
    assert_eq!(pdfs[1].filename, "b.pdf");

    let archive = session.download_archive("a.pdf").await.unwrap();
    assert!(archive.starts_with(b"PK"));
}

#[tokio::test]
async fn load_results_works_without_a_preceding_translation() {
    let backend = Arc::new(
        FakeBackend::default()
            .listing(ResultSet {
                text: Some(reference("result/translated_report.txt")),
                ..ResultSet::default()
            })
            .body("result/translated_report.txt", "left over from last run".as_bytes()),
    );
    let session = session_over(backend.clone());

    let results = session.load_results().await.unwrap();

    assert_eq!(results.text.as_deref(), Some("left over from last run"));
    assert_eq!(backend.listings.load(Ordering::SeqCst), 1);
    assert!(!session.is_processing());
}
