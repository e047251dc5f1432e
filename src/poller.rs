//! Status poller: drive a submitted job to a terminal state.
//!
//! The loop is deliberately dumb — one status query per attempt, a fixed
//! wait between attempts, and three ways out:
//!
//! 1. a terminal status (`completed` / `failed`),
//! 2. cancellation, observed at every suspension point,
//! 3. an exhausted attempt budget, which is an **error**
//!    ([`TranslateError::PollExhausted`]) rather than an outcome, because
//!    the job's true fate is unknown at that point.
//!
//! A transport or decode error from the status query halts polling
//! immediately; status queries are never retried. The backend answering at
//! all is the health signal — if it stops answering, waiting longer rarely
//! helps and hiding the error always hurts.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::BackendApi;
use crate::config::ClientConfig;
use crate::error::TranslateError;
use crate::job::JobStatus;
use crate::progress::ProgressCallback;

/// How the poll loop paces itself. Derived from [`ClientConfig`] in normal
/// use; constructible directly when a caller wants custom pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait between consecutive status queries.
    pub interval: Duration,
    /// Total query budget, including the immediate first query.
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_attempts: config.max_poll_attempts,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollOutcome {
    /// The job finished and results should exist.
    Completed { message: Option<String> },
    /// The backend reported the job failed. Terminal; carries the backend's
    /// message when it sent one.
    Failed { message: Option<String> },
    /// The caller's [`CancellationToken`] fired before a terminal status.
    Cancelled,
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed { .. })
    }

    /// Short lowercase label for summaries and logs.
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Completed { .. } => "completed",
            PollOutcome::Failed { .. } => "failed",
            PollOutcome::Cancelled => "cancelled",
        }
    }
}

/// Outcome plus how many status queries it took to get there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Queries actually performed. Zero when cancellation preempted the
    /// first query.
    pub attempts: u32,
}

/// Poll `/result-status/{job_id}` until terminal, cancelled, or out of
/// budget.
///
/// The first query fires immediately; each later attempt waits
/// `settings.interval` first. Cancellation is observed during every wait
/// and again right before every query, so a token cancelled between a
/// response and the next wait never triggers another request.
pub async fn poll_job(
    backend: &dyn BackendApi,
    job_id: &str,
    settings: &PollSettings,
    cancel: &CancellationToken,
    progress: Option<&ProgressCallback>,
) -> Result<PollReport, TranslateError> {
    for attempt in 1..=settings.max_attempts {
        if attempt > 1 {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(job_id, attempt = attempt - 1, "polling cancelled while waiting");
                    return Ok(PollReport {
                        outcome: PollOutcome::Cancelled,
                        attempts: attempt - 1,
                    });
                }
                _ = tokio::time::sleep(settings.interval) => {}
            }
        }
        if cancel.is_cancelled() {
            info!(job_id, "polling cancelled before first query");
            return Ok(PollReport {
                outcome: PollOutcome::Cancelled,
                attempts: attempt - 1,
            });
        }

        // Any error here halts the loop; the caller decides what to do next.
        let response = backend.job_status(job_id).await?;
        debug!(job_id, attempt, status = %response.status, "status query answered");
        if let Some(cb) = progress {
            cb.on_poll(attempt, response.status);
        }

        match response.status {
            JobStatus::Completed => {
                info!(job_id, attempt, "job completed");
                return Ok(PollReport {
                    outcome: PollOutcome::Completed {
                        message: response.message,
                    },
                    attempts: attempt,
                });
            }
            JobStatus::Failed => {
                warn!(job_id, attempt, message = ?response.message, "job failed");
                return Ok(PollReport {
                    outcome: PollOutcome::Failed {
                        message: response.message,
                    },
                    attempts: attempt,
                });
            }
            JobStatus::Pending | JobStatus::Processing => {}
        }
    }

    Err(TranslateError::PollExhausted {
        attempts: settings.max_attempts,
        interval_secs: settings.interval.as_secs(),
    })
}
