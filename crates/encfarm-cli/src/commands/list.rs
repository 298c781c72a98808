//! List command implementation.

use anyhow::Result;
use console::style;

use encfarm_client::{ClientConfig, JobStatus, render_job_table};

use super::common::connect;

/// Execute the list command.
pub async fn execute(config: &ClientConfig, status: Option<JobStatus>) -> Result<()> {
    let client = connect(config)?;

    let jobs = client
        .list_jobs(status)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list jobs: {e}"))?;

    if !jobs.is_empty() {
        match status {
            Some(status) => println!(
                "{} {} job(s) with status {}:\n",
                style("→").cyan().bold(),
                jobs.len(),
                style(status).bold()
            ),
            None => println!("{} {} job(s):\n", style("→").cyan().bold(), jobs.len()),
        }
    }

    print!("{}", render_job_table(&jobs));
    Ok(())
}
