//! Retry command implementation.
//!
//! Re-queue a failed or canceled job, optionally monitoring it afterwards.

use std::process::ExitCode;

use anyhow::Result;
use console::style;

use encfarm_client::{ClientConfig, JobId};

use super::common::{connect, monitor_job, print_job_summary};

/// Execute the retry command.
pub async fn execute(config: &ClientConfig, job_id: &str, wait: bool) -> Result<ExitCode> {
    let client = connect(config)?;

    println!(
        "{} Retrying job {}",
        style("→").cyan().bold(),
        style(job_id).dim()
    );

    let job = client
        .retry_job(&JobId::new(job_id))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to retry job: {e}"))?;

    println!("{} Job re-queued", style("✓").green().bold());
    print_job_summary(&job);

    if wait {
        println!();
        return monitor_job(&client, config, job.id.as_str()).await;
    }

    println!(
        "\nUse '{}' to follow progress",
        style(format!("encfarm {}", job.id)).cyan()
    );
    Ok(ExitCode::SUCCESS)
}
