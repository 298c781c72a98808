//! Monitor command implementation.
//!
//! Poll one job until it reaches a terminal state, then print its report.

use std::process::ExitCode;

use anyhow::Result;

use super::common::{connect, monitor_job};
use encfarm_client::ClientConfig;

/// Execute the monitor command.
pub async fn execute(config: &ClientConfig, job_id: &str) -> Result<ExitCode> {
    let client = connect(config)?;
    monitor_job(&client, config, job_id).await
}
