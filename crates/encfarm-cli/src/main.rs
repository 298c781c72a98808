//! encfarm Command-Line Interface
//!
//! Submit video-encoding jobs to an encoding farm and follow them to
//! completion.
//!
//! ```text
//! encfarm <job-id>             monitor one job
//! encfarm --list [status]      list jobs
//! encfarm submit -i in.mp4 -o out.mp4 -c av1 --impl svt-av1 --crf 30 --wait
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use console::style;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, Invocation, parse_error_status};
use commands::{cancel, common, list, monitor, retry, submit, version};

#[tokio::main]
async fn main() -> ExitCode {
    let mut cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_error_status(&e));
        }
    };

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let command = match cli.invocation() {
        Invocation::Command(command) => command,
        Invocation::Usage => {
            let _ = Cli::command().print_help();
            return ExitCode::SUCCESS;
        }
    };

    // Execute command; Ctrl-C anywhere outside a monitor session lands here
    let Some(result) = common::interruptible(run(&cli, command), common::shutdown_signal()).await
    else {
        eprintln!("\n{} Interrupted", style("!").yellow().bold());
        return ExitCode::SUCCESS;
    };

    // Handle errors
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, command: Commands) -> anyhow::Result<ExitCode> {
    if let Commands::Version = command {
        version::execute();
        return Ok(ExitCode::SUCCESS);
    }

    let config = common::load_config(&cli.overrides)?;

    match command {
        Commands::Monitor { job_id } => monitor::execute(&config, &job_id).await,

        Commands::List { status } => list::execute(&config, status)
            .await
            .map(|()| ExitCode::SUCCESS),

        Commands::Submit(args) => submit::execute(&config, &args).await,

        Commands::Cancel { job_id } => cancel::execute(&config, &job_id)
            .await
            .map(|()| ExitCode::SUCCESS),

        Commands::Retry { job_id, wait } => retry::execute(&config, &job_id, wait).await,

        Commands::Version => Ok(ExitCode::SUCCESS),
    }
}
