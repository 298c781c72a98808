//! The job source seam between the poller and the network.
//!
//! ```text
//!   MonitorSession ──→ JobSource::fetch() ──→ GET /jobs/{id}
//!   list command   ──→ JobSource::list()  ──→ GET /jobs?status=
//! ```
//!
//! [`FarmClient`](crate::api::FarmClient) is the production implementation.
//! Tests drive the poller with scripted sources instead.
//!
//! Implementations perform exactly one request per call and never retry;
//! retry policy (if any) belongs to the caller.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::job::{Job, JobId, JobStatus};

/// Read access to job snapshots.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Fetch a fresh snapshot of one job.
    async fn fetch(&self, job_id: &JobId) -> ClientResult<Job>;

    /// List jobs, optionally filtered by status, in server order.
    async fn list(&self, status: Option<JobStatus>) -> ClientResult<Vec<Job>>;
}
