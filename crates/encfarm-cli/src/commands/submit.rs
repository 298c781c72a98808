//! Submit command implementation.
//!
//! Creates an encoding job on the farm and optionally monitors it.

use std::process::ExitCode;

use anyhow::Result;
use console::style;

use encfarm_client::{ClientConfig, JobParams, JobSubmission};

use super::common::{connect, monitor_job, print_job_summary};
use crate::cli::SubmitArgs;

/// Execute the submit command.
pub async fn execute(config: &ClientConfig, args: &SubmitArgs) -> Result<ExitCode> {
    let submission = build_submission(args)?;
    let client = connect(config)?;

    println!(
        "{} Submitting {} as {} ({})",
        style("→").cyan().bold(),
        style(&submission.input_path).green(),
        style(&submission.codec).yellow(),
        style(&submission.encoder).magenta()
    );

    let job = client
        .create_job(&submission)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to submit job: {e}"))?;

    println!("{} Job submitted", style("✓").green().bold());
    print_job_summary(&job);

    if args.wait {
        println!();
        return monitor_job(&client, config, job.id.as_str()).await;
    }

    println!(
        "\nUse '{}' to follow progress",
        style(format!("encfarm {}", job.id)).cyan()
    );
    Ok(ExitCode::SUCCESS)
}

/// Turn command-line arguments into a validated submission.
pub fn build_submission(args: &SubmitArgs) -> Result<JobSubmission> {
    let params = match (args.bitrate_kbps, args.crf) {
        (Some(kbps), _) => JobParams::bitrate(kbps),
        (None, Some(crf)) => JobParams::crf(crf),
        (None, None) => JobParams::default(),
    }
    .with_scale(&args.scale);

    let params = match (args.vmaf_min, args.vmaf_max) {
        (Some(min), Some(max)) => params.with_vmaf_bounds(min, max),
        _ => params,
    };

    JobSubmission::new(&args.input, &args.output, &args.codec, &args.encoder)
        .with_params(params)
        .validated()
        .map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encfarm_client::QualityMode;

    fn args() -> SubmitArgs {
        SubmitArgs {
            input: "/media/in.mp4".into(),
            output: "/media/out.mp4".into(),
            codec: "hevc".into(),
            encoder: "x265".into(),
            crf: None,
            bitrate_kbps: None,
            scale: "source".into(),
            vmaf_min: None,
            vmaf_max: None,
            wait: false,
        }
    }

    #[test]
    fn test_default_is_crf_23() {
        let submission = build_submission(&args()).unwrap();
        assert_eq!(submission.params.quality_mode, QualityMode::Crf);
        assert_eq!(submission.params.crf, Some(23));
        assert!(!submission.params.enable_vmaf);
    }

    #[test]
    fn test_bitrate_mode() {
        let submission = build_submission(&SubmitArgs {
            bitrate_kbps: Some(4500),
            scale: "1280x720".into(),
            ..args()
        })
        .unwrap();
        assert_eq!(submission.params.quality_mode, QualityMode::Bitrate);
        assert_eq!(submission.params.bitrate_kbps, Some(4500));
        assert_eq!(submission.params.crf, None);
        assert_eq!(submission.params.scale, "1280x720");
    }

    #[test]
    fn test_vmaf_bounds_enable_vmaf() {
        let submission = build_submission(&SubmitArgs {
            vmaf_min: Some(90.0),
            vmaf_max: Some(95.0),
            ..args()
        })
        .unwrap();
        assert!(submission.params.enable_vmaf);
    }

    #[test]
    fn test_rejects_bad_input() {
        let err = build_submission(&SubmitArgs {
            vmaf_min: Some(99.0),
            vmaf_max: Some(80.0),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("VMAF"));

        let err = build_submission(&SubmitArgs {
            codec: " ".into(),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("codec"));

        assert!(
            build_submission(&SubmitArgs {
                bitrate_kbps: Some(0),
                ..args()
            })
            .is_err()
        );
    }
}
