//! Error types for the pdftrans library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TranslateError`] — **Fatal**: the operation that raised it did not
//!   finish (submitting while busy, a rejected path, an unreachable backend,
//!   an exhausted poll budget). Returned as `Err(TranslateError)` from the
//!   session-level operations.
//!
//! * [`ArtifactError`] — **Non-fatal**: one result artifact failed to fetch
//!   or read, but the others are fine. Collected in
//!   [`crate::results::LoadedResults`] so callers see partial success rather
//!   than losing every artifact to one bad download.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! artifact failure, log and continue, or report all failures at the end.

use thiserror::Error;

use crate::results::ArtifactKind;

/// All fatal errors returned by the pdftrans library.
///
/// Artifact-level failures use [`ArtifactError`] and are stored in
/// [`crate::results::LoadedResults`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Submission errors ─────────────────────────────────────────────────
    /// A job submitted through this session has not reached a terminal
    /// state yet.
    #[error("A translation job is already running.\nWait for it to finish (or cancel it) before submitting another.")]
    AlreadyProcessing,

    /// `submit` was called with no PDF selected.
    #[error("No source PDF selected.\nUpload a file or register a server-local path first.")]
    MissingSource,

    /// The requested target language is not in the configured offered set.
    #[error("Unsupported target language '{language}'\nOffered languages: {offered}")]
    UnsupportedLanguage { language: String, offered: String },

    /// A server-local path failed validation, either syntactically on the
    /// client or when the backend checked it.
    #[error("Invalid PDF path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The file offered for upload is not a PDF. Caught client-side, before
    /// any bytes move.
    #[error("File is not a valid PDF: '{filename}'\n{reason}")]
    NotAPdf { filename: String, reason: String },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The request never produced an HTTP response (connection refused,
    /// DNS failure, timeout).
    #[error("Network error while {context}: {message}\nCheck the backend is reachable at the configured base URL.")]
    Network { context: String, message: String },

    /// The backend answered with a non-success HTTP status.
    #[error("Backend rejected the request (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    // ── Polling errors ────────────────────────────────────────────────────
    /// The poll budget ran out before the job reached a terminal state.
    /// The job's true fate is unknown — it may still finish on the backend.
    #[error("Job still not finished after {attempts} status checks ({interval_secs}s apart).\nThe backend may still be working; query the status again later or raise --max-attempts.")]
    PollExhausted { attempts: u32, interval_secs: u64 },

    // ── Workbook errors ───────────────────────────────────────────────────
    /// A sheet name that does not exist in the decoded workbook.
    #[error("No sheet named '{name}' in workbook.\nAvailable sheets: {available}")]
    UnknownSheet { name: String, available: String },

    // ── Configuration errors ──────────────────────────────────────────────
    /// Invalid [`ClientConfig`](crate::config::ClientConfig) parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal, per-artifact error.
///
/// Result loading treats every artifact kind independently; a failure here
/// is recorded and the remaining kinds still load.
#[derive(Debug, Clone, Error)]
pub enum ArtifactError {
    /// The artifact body could not be fetched (transport failure or
    /// non-success HTTP status).
    #[error("Failed to fetch {kind} artifact: {message}")]
    Fetch { kind: ArtifactKind, message: String },

    /// A text-kind artifact arrived but its bytes are not valid UTF-8.
    #[error("The {kind} artifact at '{path}' is not valid UTF-8 text")]
    NotText { kind: ArtifactKind, path: String },
}

impl ArtifactError {
    /// Which artifact kind this error belongs to.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactError::Fetch { kind, .. } => *kind,
            ArtifactError::NotText { kind, .. } => *kind,
        }
    }
}
