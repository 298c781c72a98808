//! Cancel command implementation.

use anyhow::Result;
use console::style;

use encfarm_client::{ClientConfig, JobId};

use super::common::{connect, print_job_summary};

/// Execute the cancel command.
pub async fn execute(config: &ClientConfig, job_id: &str) -> Result<()> {
    let client = connect(config)?;

    println!(
        "{} Cancelling job {}",
        style("→").cyan().bold(),
        style(job_id).dim()
    );

    let job = client
        .cancel_job(&JobId::new(job_id))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to cancel job: {e}"))?;

    println!("{} Cancel requested", style("✓").green().bold());
    print_job_summary(&job);
    Ok(())
}
