//! Shared helpers for CLI commands.

use std::future::Future;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use console::{Term, style};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use encfarm_client::{
    ClientConfig, ClientError, FarmClient, Job, JobStatus, MonitorDisplay, MonitorSession,
    ProgressLine, SessionOutcome,
};

use crate::cli::{ConfigOverrides, EXIT_FAILURE, EXIT_SUCCESS};

/// Resolve configuration: file, then `ENCFARM_*` environment, then flags.
pub fn load_config(overrides: &ConfigOverrides) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(overrides.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(server) = &overrides.server {
        config.server.base_url.clone_from(server);
    }
    if let Some(interval) = overrides.interval {
        config.polling.interval_seconds = interval;
    }
    if let Some(max_wait) = overrides.max_wait {
        config.polling.max_wait_seconds = Some(max_wait);
    }
    if overrides.backoff {
        config.polling.backoff.enabled = true;
    }

    config.validate().context("Invalid configuration")?;
    debug!("Using server {}", config.server.base_url);
    Ok(config)
}

/// Build an API client for the configured server.
pub fn connect(config: &ClientConfig) -> Result<FarmClient> {
    FarmClient::from_config(&config.server)
        .map_err(|e| anyhow::anyhow!("Failed to create API client: {e}"))
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Monitor a job to completion and map the outcome to an exit code.
pub async fn monitor_job(
    client: &FarmClient,
    config: &ClientConfig,
    job_id: &str,
) -> Result<ExitCode> {
    println!(
        "{} Monitoring job {}",
        style("→").cyan().bold(),
        style(job_id).dim()
    );

    let mut display = ConsoleDisplay::new();
    let outcome = MonitorSession::new(client, job_id)
        .with_wait_policy(config.wait_policy())
        .with_max_wait(config.max_wait())
        .run(&mut display, shutdown_signal())
        .await
        .map_err(|e| match e {
            ClientError::Timeout(_) => anyhow::anyhow!(
                "{e}. Use 'encfarm monitor {job_id}' to keep watching."
            ),
            other => anyhow::Error::new(other),
        })?;

    Ok(exit_code(&outcome))
}

/// Failed jobs exit non-zero; every other outcome, including an interrupt, is 0.
pub fn exit_status(outcome: &SessionOutcome) -> u8 {
    if outcome.is_failure() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

pub fn exit_code(outcome: &SessionOutcome) -> ExitCode {
    ExitCode::from(exit_status(outcome))
}

/// Drive `work` to completion unless `shutdown` resolves first.
pub async fn interruptible<F, S>(work: F, shutdown: S) -> Option<F::Output>
where
    F: Future,
    S: Future<Output = ()>,
{
    tokio::select! {
        biased;
        output = work => Some(output),
        () = shutdown => None,
    }
}

/// Print a one-line job summary after a mutating request.
pub fn print_job_summary(job: &Job) {
    println!("  ID:       {}", style(&job.id).cyan());
    println!("  Status:   {}", styled_status(job));
    println!("  Progress: {}%", job.progress);
}

fn styled_status(job: &Job) -> console::StyledObject<&'static str> {
    let name = job.status.as_str();
    match job.status {
        JobStatus::Success => style(name).green().bold(),
        JobStatus::Failed => style(name).red().bold(),
        JobStatus::Canceled => style(name).yellow().bold(),
        JobStatus::Queued | JobStatus::Running => style(name).cyan().bold(),
    }
}

/// Terminal rendering of a monitoring session.
///
/// On a terminal the progress line is an indicatif bar with a bare `{msg}`
/// template, rewritten in place on every change. Anywhere else (pipes,
/// files) each change is written as its own line.
pub struct ConsoleDisplay<W: Write + Send = io::Stdout> {
    out: W,
    live: Option<ProgressBar>,
}

impl ConsoleDisplay<io::Stdout> {
    pub fn new() -> Self {
        let live = Term::stdout().is_term().then(|| {
            let line = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
            let template = ProgressStyle::with_template("{msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            line.set_style(template);
            line
        });
        Self {
            live,
            ..Self::plain(io::stdout())
        }
    }
}

impl Default for ConsoleDisplay<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> ConsoleDisplay<W> {
    /// Line-per-update output to `out`.
    pub fn plain(out: W) -> Self {
        Self { out, live: None }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn settle(&self) {
        if let Some(line) = &self.live {
            if !line.is_finished() {
                line.finish();
            }
        }
    }

    fn abandon(&self) {
        if let Some(line) = &self.live {
            line.abandon();
        }
    }

    fn emit(&mut self, text: std::fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(text).and_then(|()| self.out.flush()) {
            debug!("Failed to write output: {e}");
        }
    }
}

impl<W: Write + Send> MonitorDisplay for ConsoleDisplay<W> {
    fn progress(&mut self, line: &ProgressLine) {
        match &self.live {
            Some(bar) => bar.set_message(line.to_string()),
            None => self.emit(format_args!("{line}\n")),
        }
    }

    fn succeeded(&mut self, _job: &Job) {
        self.settle();
        self.emit(format_args!(
            "\n{} Encoding completed successfully\n",
            style("✓").green().bold()
        ));
    }

    fn failed(&mut self, _job: &Job, reason: &str) {
        self.settle();
        self.emit(format_args!(
            "\n{} Encoding failed: {}\n",
            style("✗").red().bold(),
            reason
        ));
    }

    fn canceled(&mut self, _job: &Job) {
        self.settle();
        self.emit(format_args!("\n{} Job was canceled\n", style("⊘").yellow().bold()));
    }

    fn report(&mut self, report: &str) {
        self.emit(format_args!("\n{report}\n"));
    }

    fn interrupted(&mut self) {
        self.abandon();
        self.emit(format_args!(
            "\n{} Monitoring interrupted; the job keeps running on the farm\n",
            style("!").yellow().bold()
        ));
    }

    fn aborted(&mut self, _error: &ClientError) {
        self.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use encfarm_client::{ClientResult, FixedInterval, JobId, JobSource};
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    fn snapshot(status: &str, progress: u8) -> Job {
        serde_json::from_value(serde_json::json!({
            "id": "job-7",
            "input_path": "/media/in.mp4",
            "output_path": "/media/out.mp4",
            "codec": "h264",
            "impl": "x264",
            "params": {},
            "status": status,
            "progress": progress,
            "metrics": null,
            "error_msg": null,
            "created_at": null,
            "updated_at": null
        }))
        .unwrap()
    }

    struct Replay(Mutex<VecDeque<Job>>);

    #[async_trait]
    impl JobSource for Replay {
        async fn fetch(&self, _job_id: &JobId) -> ClientResult<Job> {
            Ok(self.0.lock().unwrap().pop_front().expect("script exhausted"))
        }

        async fn list(&self, _status: Option<JobStatus>) -> ClientResult<Vec<Job>> {
            Ok(Vec::new())
        }
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_flags_override_file() {
        let file = write_config(
            "server:\n  base_url: http://farm.local/api\npolling:\n  interval_seconds: 5.0\n",
        );
        let overrides = ConfigOverrides {
            server: Some("http://other.local/api".into()),
            config: Some(file.path().to_path_buf()),
            interval: Some(0.5),
            max_wait: Some(600),
            backoff: true,
        };

        let config = load_config(&overrides).unwrap();
        assert_eq!(config.server.base_url, "http://other.local/api");
        assert!((config.polling.interval_seconds - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.polling.max_wait_seconds, Some(600));
        assert!(config.polling.backoff.enabled);
    }

    #[test]
    fn test_invalid_flag_rejected() {
        let file = write_config("server:\n  base_url: http://farm.local/api\n");
        let overrides = ConfigOverrides {
            config: Some(file.path().to_path_buf()),
            interval: Some(0.0),
            ..ConfigOverrides::default()
        };
        let err = load_config(&overrides).unwrap_err();
        assert!(format!("{err:#}").contains("interval_seconds"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let overrides = ConfigOverrides {
            config: Some("/nonexistent/encfarm.yaml".into()),
            ..ConfigOverrides::default()
        };
        assert!(load_config(&overrides).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_display_writes_one_line_per_change() {
        let source = Replay(Mutex::new(VecDeque::from(vec![
            snapshot("queued", 0),
            snapshot("running", 10),
            snapshot("running", 10),
            snapshot("running", 55),
            snapshot("success", 55),
        ])));
        let mut display = ConsoleDisplay::plain(Vec::new());

        let outcome = MonitorSession::new(&source, "job-7")
            .with_wait_policy(Box::new(FixedInterval::new(Duration::from_secs(1))))
            .run(&mut display, std::future::pending())
            .await
            .unwrap();
        assert!(matches!(outcome, SessionOutcome::Succeeded(_)));

        let text = String::from_utf8(display.into_inner()).unwrap();
        let progress: Vec<&str> = text.lines().filter(|l| l.contains("% | status:")).collect();
        assert_eq!(progress.len(), 3);
        assert!(progress[0].contains("0% | status: queued"));
        assert!(progress[2].contains("55% | status: running"));
        assert!(text.contains("Encoding completed successfully"));
        assert!(text.contains("ID:        job-7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_display_reports_interrupt() {
        let source = Replay(Mutex::new(VecDeque::from(vec![snapshot("running", 20)])));
        let mut display = ConsoleDisplay::plain(Vec::new());

        let outcome = MonitorSession::new(&source, "job-7")
            .with_wait_policy(Box::new(FixedInterval::new(Duration::from_secs(5))))
            .run(&mut display, tokio::time::sleep(Duration::from_secs(2)))
            .await
            .unwrap();
        assert!(matches!(outcome, SessionOutcome::Interrupted));

        let text = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(text.lines().filter(|l| l.contains("% | status:")).count(), 1);
        assert!(text.contains("Monitoring interrupted"));
    }

    #[test]
    fn test_exit_status_by_outcome() {
        assert_eq!(exit_status(&SessionOutcome::Succeeded(snapshot("success", 100))), EXIT_SUCCESS);
        assert_eq!(exit_status(&SessionOutcome::Failed(snapshot("failed", 40))), EXIT_FAILURE);
        assert_eq!(exit_status(&SessionOutcome::Canceled(snapshot("canceled", 40))), EXIT_SUCCESS);
        assert_eq!(exit_status(&SessionOutcome::Interrupted), EXIT_SUCCESS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interruptible_stops_pending_work() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            7
        };
        let result = interruptible(slow, tokio::time::sleep(Duration::from_secs(1))).await;
        assert_eq!(result, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interruptible_returns_finished_work() {
        let quick = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            7
        };
        let result = interruptible(quick, std::future::pending()).await;
        assert_eq!(result, Some(7));
    }
}
