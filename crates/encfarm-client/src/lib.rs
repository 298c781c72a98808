//! Encoding-farm client
//!
//! This crate talks to an encoding-farm HTTP API: it submits video-encoding
//! jobs, polls them until they finish, and renders human-readable reports.
//!
//! # Overview
//!
//! - [`FarmClient`] wraps the REST API (`/jobs`, `/jobs/{id}`, cancel, retry)
//! - [`JobSource`] is the read seam the poller depends on
//! - [`MonitorSession`] is the per-job polling state machine
//! - [`render_report`] / [`render_job_table`] turn snapshots into text
//! - [`ClientConfig`] layers a YAML file and `ENCFARM_*` environment variables
//!
//! # Job lifecycle
//!
//! | Status | Terminal | Session outcome |
//! |--------|----------|-----------------|
//! | `queued` | no | keep polling |
//! | `running` | no | keep polling |
//! | `success` | yes | [`SessionOutcome::Succeeded`] |
//! | `failed` | yes | [`SessionOutcome::Failed`] |
//! | `canceled` | yes | [`SessionOutcome::Canceled`] |
//!
//! # Example: Monitoring a Job
//!
//! ```ignore
//! use encfarm_client::{FarmClient, MonitorSession, MonitorDisplay};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = FarmClient::new("http://localhost:3000/api")?;
//!     let mut display = MyDisplay::default();
//!
//!     let outcome = MonitorSession::new(&client, "4f7c1c9e")
//!         .run(&mut display, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     if outcome.is_failure() {
//!         std::process::exit(1);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod job;
pub mod poller;
pub mod report;
pub mod source;
pub mod wait;

pub use api::{DEFAULT_BASE_URL, FarmClient};
pub use config::{BackoffConfig, ClientConfig, ConfigError, PollingConfig, ServerConfig};
pub use error::{ClientError, ClientResult};
pub use job::{Job, JobId, JobMetrics, JobParams, JobStatus, JobSubmission, QualityMode};
pub use poller::{MonitorDisplay, MonitorSession, ProgressLine, SessionOutcome, SessionState};
pub use report::{render_job_table, render_report};
pub use source::JobSource;
pub use wait::{ExponentialBackoff, FixedInterval, WaitPolicy};
