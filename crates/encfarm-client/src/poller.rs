//! Progress poller: the per-job monitoring state machine.
//!
//! ```text
//!              ┌────────────── sleep(wait_policy) ◄─────────────┐
//!              ▼                                                 │
//!   start ──→ Polling ──fetch──→ render if progress changed ──→ queued/running
//!                                         │
//!                                         ├──→ success  ──→ Terminal(Success)
//!                                         ├──→ failed   ──→ Terminal(Failed)
//!                                         └──→ canceled ──→ Terminal(Canceled)
//! ```
//!
//! A session owns its `last_progress` / start time; sessions share nothing,
//! so several can run side by side. A fetch error ends the session
//! immediately: there is no retry on individual fetches. The shutdown future
//! passed to [`MonitorSession::run`] is raced against every suspension point
//! (the fetch and the sleep), so an interrupt unwinds within one tick.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::format::{format_elapsed, progress_bar};
use crate::job::{Job, JobId, JobStatus};
use crate::report::render_report;
use crate::source::JobSource;
use crate::wait::{FixedInterval, WaitPolicy};

/// One rendered progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressLine {
    /// Completion percentage.
    pub progress: u8,
    /// Status at the time of the update.
    pub status: JobStatus,
    /// Time since the session started.
    pub elapsed: Duration,
}

impl fmt::Display for ProgressLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}% | status: {} | elapsed: {}",
            progress_bar(self.progress),
            self.progress,
            self.status,
            format_elapsed(self.elapsed)
        )
    }
}

/// Terminal states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// The job finished successfully.
    Success,
    /// The job failed.
    Failed,
    /// The job was canceled.
    Canceled,
}

/// State of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Still fetching.
    Polling,
    /// No further transitions.
    Terminal(TerminalState),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// The job succeeded; carries the final snapshot.
    Succeeded(Job),
    /// The job failed; carries the final snapshot.
    Failed(Job),
    /// The job was canceled; carries the final snapshot.
    Canceled(Job),
    /// The user interrupted monitoring before a terminal state.
    Interrupted,
}

impl SessionOutcome {
    /// Whether the caller should signal a non-zero exit.
    pub fn is_failure(&self) -> bool {
        matches!(self, SessionOutcome::Failed(_))
    }

    /// Final snapshot, if the job reached a terminal state.
    pub fn job(&self) -> Option<&Job> {
        match self {
            SessionOutcome::Succeeded(job)
            | SessionOutcome::Failed(job)
            | SessionOutcome::Canceled(job) => Some(job),
            SessionOutcome::Interrupted => None,
        }
    }
}

/// Output side of a monitoring session.
///
/// The console implementation lives in the CLI; tests record calls.
pub trait MonitorDisplay: Send {
    /// Replace the current progress line.
    fn progress(&mut self, line: &ProgressLine);

    /// The job succeeded.
    fn succeeded(&mut self, job: &Job);

    /// The job failed. `reason` is never empty.
    fn failed(&mut self, job: &Job, reason: &str);

    /// The job was canceled.
    fn canceled(&mut self, job: &Job);

    /// Final report text for a terminal snapshot.
    fn report(&mut self, report: &str);

    /// Monitoring was interrupted by the user.
    fn interrupted(&mut self);

    /// The session is about to end with an error.
    fn aborted(&mut self, _error: &ClientError) {}
}

/// Monitors one job until it reaches a terminal state.
#[derive(Debug)]
pub struct MonitorSession<'a, S: JobSource + ?Sized> {
    source: &'a S,
    job_id: JobId,
    wait_policy: Box<dyn WaitPolicy>,
    max_wait: Option<Duration>,
    state: SessionState,
    /// `None` until the first snapshot, so the first one always renders.
    last_progress: Option<u8>,
    start_time: Option<Instant>,
    attempt: u32,
}

impl<'a, S: JobSource + ?Sized> MonitorSession<'a, S> {
    /// Create a session polling every second with no deadline.
    pub fn new(source: &'a S, job_id: impl Into<JobId>) -> Self {
        Self {
            source,
            job_id: job_id.into(),
            wait_policy: Box::new(FixedInterval::default()),
            max_wait: None,
            state: SessionState::Polling,
            last_progress: None,
            start_time: None,
            attempt: 0,
        }
    }

    /// Use a different delay policy between ticks.
    pub fn with_wait_policy(mut self, policy: Box<dyn WaitPolicy>) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Give up with [`ClientError::Timeout`] after `max_wait`.
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// The job being monitored.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Poll until a terminal state, an error, or `shutdown` resolves.
    pub async fn run<D, F>(&mut self, display: &mut D, shutdown: F) -> ClientResult<SessionOutcome>
    where
        D: MonitorDisplay + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let start = Instant::now();
        self.start_time = Some(start);
        self.last_progress = None;
        self.attempt = 0;
        self.state = SessionState::Polling;
        info!(job_id = %self.job_id, "monitoring job");

        loop {
            let fetched = tokio::select! {
                biased;
                () = &mut shutdown => return Ok(self.interrupt(display)),
                fetched = self.source.fetch(&self.job_id) => fetched,
            };

            let job = match fetched {
                Ok(job) => job,
                Err(e) => {
                    warn!(job_id = %self.job_id, "fetch failed: {e}");
                    display.aborted(&e);
                    return Err(e);
                }
            };

            if let Some(outcome) = self.observe(job, start.elapsed(), display) {
                return Ok(outcome);
            }

            if let Some(max_wait) = self.max_wait {
                if start.elapsed() >= max_wait {
                    let err = ClientError::Timeout(self.job_id.to_string());
                    warn!(job_id = %self.job_id, "giving up after {:?}", max_wait);
                    display.aborted(&err);
                    return Err(err);
                }
            }

            let delay = self.wait_policy.next_delay(self.attempt);
            self.attempt = self.attempt.saturating_add(1);
            debug!(job_id = %self.job_id, "next poll in {:?}", delay);

            tokio::select! {
                biased;
                () = &mut shutdown => return Ok(self.interrupt(display)),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Apply one snapshot: render on change, then dispatch on status.
    fn observe<D>(&mut self, job: Job, elapsed: Duration, display: &mut D) -> Option<SessionOutcome>
    where
        D: MonitorDisplay + ?Sized,
    {
        if self.last_progress != Some(job.progress) {
            self.last_progress = Some(job.progress);
            display.progress(&ProgressLine {
                progress: job.progress,
                status: job.status,
                elapsed,
            });
        }

        let terminal = match job.status {
            JobStatus::Queued | JobStatus::Running => return None,
            JobStatus::Success => {
                display.succeeded(&job);
                TerminalState::Success
            }
            JobStatus::Failed => {
                display.failed(&job, job.failure_reason());
                TerminalState::Failed
            }
            JobStatus::Canceled => {
                display.canceled(&job);
                TerminalState::Canceled
            }
        };

        self.state = SessionState::Terminal(terminal);
        info!(job_id = %self.job_id, status = %job.status, "job reached terminal state");
        display.report(&render_report(&job));

        Some(match terminal {
            TerminalState::Success => SessionOutcome::Succeeded(job),
            TerminalState::Failed => SessionOutcome::Failed(job),
            TerminalState::Canceled => SessionOutcome::Canceled(job),
        })
    }

    fn interrupt<D>(&mut self, display: &mut D) -> SessionOutcome
    where
        D: MonitorDisplay + ?Sized,
    {
        info!(job_id = %self.job_id, "monitoring interrupted");
        display.interrupted();
        SessionOutcome::Interrupted
    }
}
