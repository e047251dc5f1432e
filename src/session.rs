//! The client session: source selection, submission, polling and result
//! loading behind one stateful handle.
//!
//! A [`Session`] mirrors how the backend thinks about work: **one job at a
//! time**. The `processing` flag flips on at submission and off when the
//! job reaches a terminal state, is cancelled, or polling fails — whoever
//! observes the exit clears it. A second `submit` while the flag is up is
//! rejected locally with [`TranslateError::AlreadyProcessing`], before any
//! network traffic.
//!
//! [`Session::translate`] is the whole arc in one call: submit, poll to a
//! terminal state, then (only on completion) list and load every result
//! artifact exactly once. Callers that want the steps individually get
//! them as [`Session::submit`], [`Session::poll`] and
//! [`Session::load_results`] with the same flag discipline.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::backend::{BackendApi, HttpBackend, StatusResponse, UploadedPdf};
use crate::config::ClientConfig;
use crate::error::TranslateError;
use crate::job::{JobHandle, JobReference, PdfSource};
use crate::paths::{filename_from_path, validate_windows_pdf_path};
use crate::poller::{poll_job, PollOutcome, PollReport, PollSettings};
use crate::results::{self, LoadedResults, ResultSet};

/// A connection to one translation backend plus the local state the
/// backend's single-job model requires.
pub struct Session {
    backend: Arc<dyn BackendApi>,
    config: ClientConfig,
    selection: Mutex<Option<PdfSource>>,
    processing: AtomicBool,
}

impl Session {
    /// Connect over HTTP using the configured base URL and timeouts.
    pub fn connect(config: ClientConfig) -> Result<Self, TranslateError> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// Run against any [`BackendApi`] implementation. This is also the
    /// seam tests use.
    pub fn with_backend(backend: Arc<dyn BackendApi>, config: ClientConfig) -> Self {
        Self {
            backend,
            config,
            selection: Mutex::new(None),
            processing: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a job submitted through this session is still in flight.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    // ── Source selection ────────────────────────────────────────────────

    pub fn selection(&self) -> Option<PdfSource> {
        self.selection_lock().clone()
    }

    pub fn clear_selection(&self) {
        *self.selection_lock() = None;
    }

    /// Select a PDF that already lives on the backend, e.g. one picked
    /// from [`Session::list_pdfs`].
    pub fn select_uploaded(&self, uploaded: UploadedPdf) {
        let source = PdfSource::Uploaded {
            path: uploaded.path,
            filename: uploaded.filename,
            size_bytes: uploaded.size_bytes,
        };
        *self.selection_lock() = Some(source);
    }

    /// Upload PDF bytes and select the stored copy. The filename must end
    /// in `.pdf` and the bytes must start with the `%PDF` magic; both are
    /// checked before any network traffic.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedPdf, TranslateError> {
        let has_pdf_extension = std::path::Path::new(filename)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !has_pdf_extension {
            return Err(TranslateError::NotAPdf {
                filename: filename.to_string(),
                reason: "only .pdf files are accepted".to_string(),
            });
        }
        if !bytes.starts_with(b"%PDF") {
            return Err(TranslateError::NotAPdf {
                filename: filename.to_string(),
                reason: "missing %PDF header".to_string(),
            });
        }

        let uploaded = self.backend.upload_pdf(filename, bytes).await?;
        info!(
            filename = %uploaded.filename,
            size = uploaded.size_bytes,
            "PDF uploaded and selected"
        );
        *self.selection_lock() = Some(PdfSource::Uploaded {
            path: uploaded.path.clone(),
            filename: uploaded.filename.clone(),
            size_bytes: uploaded.size_bytes,
        });
        Ok(uploaded)
    }

    /// Select a PDF by its path on the backend host. The path is checked
    /// syntactically first (it must be an absolute Windows `.pdf` path),
    /// then confirmed by the backend.
    pub async fn use_local_path(&self, path: &str) -> Result<PdfSource, TranslateError> {
        validate_windows_pdf_path(path)?;
        let validation = self.backend.validate_path(path).await?;
        if !validation.valid {
            return Err(TranslateError::InvalidPath {
                path: path.to_string(),
                reason: validation
                    .message
                    .unwrap_or_else(|| "the backend rejected this path".to_string()),
            });
        }
        let filename = validation
            .filename
            .unwrap_or_else(|| filename_from_path(path).to_string());
        let source = PdfSource::LocalPath {
            path: path.to_string(),
            filename,
        };
        *self.selection_lock() = Some(source.clone());
        Ok(source)
    }

    // ── Job lifecycle ───────────────────────────────────────────────────

    /// Start translating the selected PDF. Flips the processing flag; on
    /// any failure past that point the flag is released again.
    pub async fn submit(&self, target_language: &str) -> Result<JobHandle, TranslateError> {
        if self.processing.swap(true, Ordering::SeqCst) {
            return Err(TranslateError::AlreadyProcessing);
        }
        match self.submit_inner(target_language).await {
            Ok(handle) => Ok(handle),
            Err(error) => {
                self.processing.store(false, Ordering::SeqCst);
                Err(error)
            }
        }
    }

    async fn submit_inner(&self, target_language: &str) -> Result<JobHandle, TranslateError> {
        let source = self.selection().ok_or(TranslateError::MissingSource)?;
        if !self.config.offers_language(target_language) {
            return Err(TranslateError::UnsupportedLanguage {
                language: target_language.to_string(),
                offered: self.config.offered_languages_display(),
            });
        }
        self.backend
            .start_translation(source.path(), target_language)
            .await?;
        let handle = JobHandle::new(JobReference::new(source, target_language));
        info!(job_id = %handle.id, language = target_language, "translation started");
        Ok(handle)
    }

    /// Poll a job to its terminal state. Releases the processing flag on
    /// every exit — terminal, cancelled or error — so a failed watch never
    /// wedges the session.
    pub async fn poll(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<PollReport, TranslateError> {
        let settings = PollSettings::from_config(&self.config);
        let report = poll_job(
            self.backend.as_ref(),
            job_id,
            &settings,
            cancel,
            self.config.progress_callback.as_ref(),
        )
        .await;
        self.processing.store(false, Ordering::SeqCst);
        report
    }

    /// Submit, poll to a terminal state and, on completion, load every
    /// result artifact exactly once.
    pub async fn translate(
        &self,
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<TranslationOutcome, TranslateError> {
        let started = Instant::now();

        let handle = self.submit(target_language).await?;
        if let Some(progress) = &self.config.progress_callback {
            progress.on_submitted(&handle);
        }

        let report = self.poll(&handle.id, cancel).await?;
        if let Some(progress) = &self.config.progress_callback {
            progress.on_terminal(&report.outcome);
        }

        let results = if report.outcome.is_completed() {
            let listing = self.backend.list_results().await?;
            Some(
                results::load_all(
                    self.backend.as_ref(),
                    &self.config.base_url,
                    &listing,
                    self.config.progress_callback.as_ref(),
                )
                .await,
            )
        } else {
            None
        };

        let stats = TranslationStats {
            poll_attempts: report.attempts,
            total_duration_ms: started.elapsed().as_millis() as u64,
            artifacts_loaded: results.as_ref().map_or(0, LoadedResults::loaded_count),
            artifacts_failed: results.as_ref().map_or(0, |r| r.errors.len()),
        };
        info!(
            outcome = report.outcome.label(),
            attempts = stats.poll_attempts,
            duration_ms = stats.total_duration_ms,
            "translation finished"
        );

        Ok(TranslationOutcome {
            handle,
            outcome: report.outcome,
            results,
            stats,
        })
    }

    // ── Backend passthroughs ────────────────────────────────────────────

    pub async fn job_status(&self, job_id: &str) -> Result<StatusResponse, TranslateError> {
        self.backend.job_status(job_id).await
    }

    pub async fn list_pdfs(&self) -> Result<Vec<UploadedPdf>, TranslateError> {
        self.backend.list_pdfs().await
    }

    /// The current result listing, without loading anything.
    pub async fn fetch_results(&self) -> Result<ResultSet, TranslateError> {
        self.backend.list_results().await
    }

    /// List and load whatever results the backend currently has.
    pub async fn load_results(&self) -> Result<LoadedResults, TranslateError> {
        let listing = self.fetch_results().await?;
        Ok(results::load_all(
            self.backend.as_ref(),
            &self.config.base_url,
            &listing,
            self.config.progress_callback.as_ref(),
        )
        .await)
    }

    pub async fn download_archive(&self, job_id: &str) -> Result<Vec<u8>, TranslateError> {
        self.backend.download_archive(job_id).await
    }

    fn selection_lock(&self) -> MutexGuard<'_, Option<PdfSource>> {
        // A panic elsewhere must not wedge selection state.
        self.selection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .field("processing", &self.is_processing())
            .field("selection", &self.selection())
            .finish()
    }
}

/// What one [`Session::translate`] call produced.
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub handle: JobHandle,
    pub outcome: PollOutcome,
    /// Loaded artifacts; `None` unless the job completed.
    pub results: Option<LoadedResults>,
    pub stats: TranslationStats,
}

impl TranslationOutcome {
    pub fn is_completed(&self) -> bool {
        self.outcome.is_completed()
    }
}

/// Counters for one translation run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TranslationStats {
    pub poll_attempts: u32,
    pub total_duration_ms: u64,
    pub artifacts_loaded: usize,
    pub artifacts_failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PathValidation;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Accepts `start_translation`, refuses to be asked anything else.
    #[derive(Default)]
    struct StubBackend {
        started: AtomicUsize,
    }

    #[async_trait]
    impl BackendApi for StubBackend {
        async fn upload_pdf(
            &self,
            _filename: &str,
            _bytes: Vec<u8>,
        ) -> Result<UploadedPdf, TranslateError> {
            unreachable!("backend must not be reached")
        }

        async fn validate_path(&self, _path: &str) -> Result<PathValidation, TranslateError> {
            unreachable!("backend must not be reached")
        }

        async fn start_translation(
            &self,
            _file_path: &str,
            _target_language: &str,
        ) -> Result<(), TranslateError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn job_status(&self, _job_id: &str) -> Result<StatusResponse, TranslateError> {
            unreachable!("backend must not be reached")
        }

        async fn list_pdfs(&self) -> Result<Vec<UploadedPdf>, TranslateError> {
            unreachable!("backend must not be reached")
        }

        async fn list_results(&self) -> Result<ResultSet, TranslateError> {
            unreachable!("backend must not be reached")
        }

        async fn fetch_bytes(&self, _path: &str) -> Result<Vec<u8>, TranslateError> {
            unreachable!("backend must not be reached")
        }

        async fn download_archive(&self, _job_id: &str) -> Result<Vec<u8>, TranslateError> {
            unreachable!("backend must not be reached")
        }
    }

    fn session() -> Session {
        let config = ClientConfig::builder().build().unwrap();
        Session::with_backend(Arc::new(StubBackend::default()), config)
    }

    fn sample_upload() -> UploadedPdf {
        UploadedPdf {
            path: "uploads/report.pdf".to_string(),
            filename: "report.pdf".to_string(),
            size_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn upload_rejects_wrong_extension_before_any_network() {
        let session = session();
        let err = session
            .upload("notes.txt", b"%PDF-1.7 ...".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::NotAPdf { .. }));
        assert!(session.selection().is_none());
    }

    #[tokio::test]
    async fn upload_rejects_bytes_without_pdf_magic() {
        let session = session();
        let err = session
            .upload("report.pdf", b"<html>not a pdf</html>".to_vec())
            .await
            .unwrap_err();
        match err {
            TranslateError::NotAPdf { filename, reason } => {
                assert_eq!(filename, "report.pdf");
                assert!(reason.contains("%PDF"));
            }
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_windows_path_never_reaches_the_backend() {
        let session = session();
        let err = session.use_local_path("docs/report.pdf").await.unwrap_err();
        assert!(matches!(err, TranslateError::InvalidPath { .. }));
    }

    #[test]
    fn selection_can_be_set_and_cleared() {
        let session = session();
        assert!(session.selection().is_none());
        session.select_uploaded(sample_upload());
        assert_eq!(session.selection().unwrap().filename(), "report.pdf");
        session.clear_selection();
        assert!(session.selection().is_none());
    }

    #[tokio::test]
    async fn submit_without_a_selection_is_rejected_and_releases_the_flag() {
        let session = session();
        let err = session.submit("en").await.unwrap_err();
        assert!(matches!(err, TranslateError::MissingSource));
        assert!(!session.is_processing());
    }

    #[tokio::test]
    async fn submit_with_unknown_language_is_rejected_locally() {
        let session = session();
        session.select_uploaded(sample_upload());
        let err = session.submit("tlh").await.unwrap_err();
        match err {
            TranslateError::UnsupportedLanguage { language, offered } => {
                assert_eq!(language, "tlh");
                assert!(offered.contains("zh"));
            }
            other => panic!("expected UnsupportedLanguage, got {other:?}"),
        }
        assert!(!session.is_processing());
    }

    #[tokio::test]
    async fn second_submit_while_processing_is_rejected() {
        let config = ClientConfig::builder().build().unwrap();
        let backend = Arc::new(StubBackend::default());
        let session = Session::with_backend(backend.clone(), config);
        session.select_uploaded(sample_upload());

        let handle = session.submit("en").await.unwrap();
        assert_eq!(handle.id, "report.pdf");
        assert!(session.is_processing());

        let err = session.submit("en").await.unwrap_err();
        assert!(matches!(err, TranslateError::AlreadyProcessing));
        assert_eq!(backend.started.load(Ordering::SeqCst), 1);
        // The rejected call must not have released the running job's flag.
        assert!(session.is_processing());
    }

    #[tokio::test]
    async fn pre_cancelled_translate_reports_cancelled_without_polling() {
        let session = session();
        session.select_uploaded(sample_upload());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = session.translate("en", &cancel).await.unwrap();
        assert!(matches!(outcome.outcome, PollOutcome::Cancelled));
        assert!(outcome.results.is_none());
        assert_eq!(outcome.stats.poll_attempts, 0);
        assert!(!session.is_processing());
    }
}
