//! Command-line surface.
//!
//! Kept free of I/O so the integration tests can include it directly and
//! exercise parsing with `try_parse_from`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use encfarm_client::JobStatus;

/// Process exit status for success, cancellation, usage and interrupts.
pub const EXIT_SUCCESS: u8 = 0;

/// Process exit status for transport, decode and validation errors and for
/// failed jobs.
pub const EXIT_FAILURE: u8 = 1;

/// encfarm - submit and monitor video-encoding jobs on an encoding farm
#[derive(Debug, Parser)]
#[command(name = "encfarm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Job ID to monitor
    pub job_id: Option<String>,

    /// List jobs, optionally filtered by status
    #[arg(long, value_name = "STATUS", num_args = 0..=1, conflicts_with = "job_id")]
    pub list: Option<Option<JobStatus>>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags layered over the config file and environment.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// API base URL (e.g. http://localhost:3000/api)
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Config file (defaults to ~/.encfarm/config.yaml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between status polls
    #[arg(long, global = true, value_name = "SECS")]
    pub interval: Option<f64>,

    /// Give up monitoring after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub max_wait: Option<u64>,

    /// Back off exponentially between polls
    #[arg(long, global = true)]
    pub backoff: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Monitor a job until it finishes
    Monitor {
        /// Job ID
        job_id: String,
    },

    /// List jobs
    List {
        /// Only show jobs with this status (queued, running, success, failed, canceled)
        #[arg(short, long)]
        status: Option<JobStatus>,
    },

    /// Submit a new encoding job
    Submit(SubmitArgs),

    /// Cancel a queued or running job
    Cancel {
        /// Job ID
        job_id: String,
    },

    /// Re-queue a failed or canceled job
    Retry {
        /// Job ID
        job_id: String,

        /// Monitor the job after re-queueing it
        #[arg(short, long)]
        wait: bool,
    },

    /// Show version information
    Version,
}

#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    /// Source media file (path on the farm)
    #[arg(short, long)]
    pub input: String,

    /// Destination file (path on the farm)
    #[arg(short, long)]
    pub output: String,

    /// Codec family (h264, hevc, av1, vp9)
    #[arg(short, long)]
    pub codec: String,

    /// Encoder implementation (x264, x265, svt-av1, ...)
    #[arg(long = "impl", value_name = "IMPL")]
    pub encoder: String,

    /// Constant rate factor (default mode, 23 if neither is given)
    #[arg(long, conflicts_with = "bitrate_kbps")]
    pub crf: Option<u32>,

    /// Target bitrate in kbps
    #[arg(long, value_name = "KBPS")]
    pub bitrate_kbps: Option<u32>,

    /// Output scale (e.g. source, 1920x1080, 1280x720)
    #[arg(long, default_value = "source")]
    pub scale: String,

    /// Lower VMAF bound; enables VMAF scoring
    #[arg(long, requires = "vmaf_max")]
    pub vmaf_min: Option<f64>,

    /// Upper VMAF bound; enables VMAF scoring
    #[arg(long, requires = "vmaf_min")]
    pub vmaf_max: Option<f64>,

    /// Monitor the job after submitting it
    #[arg(short, long)]
    pub wait: bool,
}

/// What the parsed arguments ask for.
#[derive(Debug)]
pub enum Invocation {
    /// No arguments: print usage.
    Usage,
    /// Run a command.
    Command(Commands),
}

impl Cli {
    /// Resolve the legacy positional forms (`<job-id>`, `--list [status]`)
    /// into the equivalent subcommand.
    pub fn invocation(&mut self) -> Invocation {
        if let Some(command) = self.command.take() {
            return Invocation::Command(command);
        }
        if let Some(status) = self.list.take() {
            return Invocation::Command(Commands::List { status });
        }
        match self.job_id.take() {
            Some(job_id) => Invocation::Command(Commands::Monitor { job_id }),
            None => Invocation::Usage,
        }
    }
}

/// Exit status for a clap parse result that did not produce a [`Cli`].
///
/// `--help` and `--version` are successes; anything clap prints to stderr
/// is a validation failure.
pub fn parse_error_status(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}
