//! Job model: how a source PDF was designated, and the handle a submitted
//! job is tracked by.
//!
//! The backend keys running jobs by the source **filename** — that is the
//! id the status endpoint is queried with. Everything else here exists so
//! that a submission is reproducible after the fact: a [`JobReference`]
//! freezes the source and target language at submit time and never changes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the source PDF was designated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfSource {
    /// Bytes were uploaded; `path` is the server-assigned storage path.
    Uploaded {
        path: String,
        filename: String,
        size_bytes: u64,
    },
    /// A backend-visible Windows path, validated syntactically here and
    /// then by the backend.
    LocalPath { path: String, filename: String },
}

impl PdfSource {
    /// The backend-side path submitted as the job's `file_path`.
    pub fn path(&self) -> &str {
        match self {
            PdfSource::Uploaded { path, .. } => path,
            PdfSource::LocalPath { path, .. } => path,
        }
    }

    /// The source file name. Doubles as the job id.
    pub fn filename(&self) -> &str {
        match self {
            PdfSource::Uploaded { filename, .. } => filename,
            PdfSource::LocalPath { filename, .. } => filename,
        }
    }
}

/// What was submitted: source plus target language, frozen at submit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReference {
    pub source: PdfSource,
    pub target_language: String,
}

impl JobReference {
    pub fn new(source: PdfSource, target_language: impl Into<String>) -> Self {
        Self {
            source,
            target_language: target_language.into(),
        }
    }
}

/// Handle for a submitted job. `id` is what `/result-status/{id}` is keyed
/// by — the source filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
    pub reference: JobReference,
}

impl JobHandle {
    pub fn new(reference: JobReference) -> Self {
        Self {
            id: reference.source.filename().to_string(),
            reference,
        }
    }
}

/// Wire status of a translation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal statuses end the poll loop.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}
