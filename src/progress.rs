//! Progress-callback trait for translation lifecycle events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to receive
//! real-time events as a job is submitted, polled, and its artifacts loaded.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a status bar, or
//! a log — without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` so a single callback
//! can be shared across spawned tasks.
//!
//! # Example
//!
//! ```rust
//! use pdftrans::{ClientConfig, JobStatus, TranslationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     polls: Arc<AtomicUsize>,
//! }
//!
//! impl TranslationProgressCallback for CountingCallback {
//!     fn on_poll(&self, attempt: u32, status: JobStatus) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("attempt {attempt}: {status}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     polls: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(counter as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

use crate::job::{JobHandle, JobStatus};
use crate::poller::PollOutcome;
use crate::results::ArtifactKind;

/// Observer for translation lifecycle events.
///
/// All methods have default no-op bodies, so implementors override only the
/// events they care about. Callbacks run inline on the session's task: keep
/// them cheap and non-blocking.
pub trait TranslationProgressCallback: Send + Sync {
    /// The job was accepted by the backend and polling is about to start.
    fn on_submitted(&self, handle: &JobHandle) {
        let _ = handle;
    }

    /// One status query finished. `attempt` starts at 1.
    fn on_poll(&self, attempt: u32, status: JobStatus) {
        let _ = (attempt, status);
    }

    /// The poll loop ended: job completed, job failed, or cancelled.
    fn on_terminal(&self, outcome: &PollOutcome) {
        let _ = outcome;
    }

    /// One result artifact was loaded. `amount` is the body length in bytes
    /// for fetched kinds, and the image count for [`ArtifactKind::Images`]
    /// (image bytes are never fetched).
    fn on_artifact_loaded(&self, kind: ArtifactKind, amount: usize) {
        let _ = (kind, amount);
    }

    /// One result artifact failed to load; the others continue.
    ///
    /// Takes `error: String` (not `&str`) so that `Arc<dyn …>` callbacks
    /// stay `Send` when moved into spawned tasks.
    fn on_artifact_failed(&self, kind: ArtifactKind, error: String) {
        let _ = (kind, error);
    }
}

/// A callback that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Shared, type-erased callback handle as stored in the config.
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;
