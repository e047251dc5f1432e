//! # pdftrans
//!
//! Client for a PDF-translation backend: submit documents, follow the job
//! to completion, and decode what comes back.
//!
//! ## Why this crate?
//!
//! The translation backend speaks a small HTTP API built around one rule:
//! one job at a time. Driving it by hand means juggling uploads, a
//! busy flag, a polling loop, and four differently-shaped result
//! artifacts (plain text, extracted formulas, an XLSX table, page
//! images). This crate owns that choreography — submission is
//! single-flight, polling is cancellable, result loading is per-artifact
//! fault-isolated, and the XLSX table arrives as a typed workbook instead
//! of raw bytes.
//!
//! ## Flow Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Select   upload bytes, or register a path on the backend host
//!  ├─ 2. Submit   start the job (one in flight per session)
//!  ├─ 3. Poll     immediate first check, then fixed-interval status polls
//!  ├─ 4. Load     list artifacts; fetch text/formulas/table, address images
//!  └─ 5. Render   decode the XLSX table into grids / HTML
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdftrans::{CancellationToken, ClientConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://127.0.0.1:1234")
//!         .build()?;
//!     let session = Session::connect(config)?;
//!
//!     session.use_local_path(r"C:\docs\report.pdf").await?;
//!     let outcome = session.translate("en", &CancellationToken::new()).await?;
//!
//!     if let Some(text) = outcome.results.as_ref().and_then(|r| r.text.as_deref()) {
//!         println!("{text}");
//!     }
//!     eprintln!(
//!         "finished {} after {} status checks",
//!         outcome.outcome.label(),
//!         outcome.stats.poll_attempts
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdftrans` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdftrans = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod job;
pub mod paths;
pub mod poller;
pub mod progress;
pub mod results;
pub mod session;
pub mod workbook;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{BackendApi, HttpBackend, PathValidation, StatusResponse, UploadedPdf};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ArtifactError, TranslateError};
pub use job::{JobHandle, JobReference, JobStatus, PdfSource};
pub use paths::validate_windows_pdf_path;
pub use poller::{poll_job, PollOutcome, PollReport, PollSettings};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use results::{
    load_all, load_one, ArtifactKind, ArtifactRef, ImageArtifact, LoadedArtifact, LoadedResults,
    ResultSet, TableOutcome,
};
pub use session::{Session, TranslationOutcome, TranslationStats};
pub use workbook::{
    decode, materialize, Cell, CellAlign, DecodeError, GridCell, Sheet, SheetGrid, UsedRange,
    Workbook,
};

// The cancellation type callers hand to `translate`/`poll`; re-exported so
// downstream code does not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
