//! Plain-text reports for job snapshots.
//!
//! Rendering is pure: the functions here build a `String` and never touch
//! the terminal, so the CLI decides where (and how styled) the text goes.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::format::{NOT_AVAILABLE, format_bitrate, format_duration, format_score, format_size};
use crate::job::{Job, JobMetrics};

const RULE_WIDTH: usize = 50;
const TABLE_WIDTH: usize = 80;

/// Render the full report for a terminal job snapshot.
///
/// Sections: job information, encode parameters, and (only when the job
/// carries metrics) encode metrics with the derived speed factor.
pub fn render_report(job: &Job) -> String {
    let mut out = String::new();

    section(&mut out, "Job");
    let _ = writeln!(out, "ID:        {}", job.id);
    let _ = writeln!(out, "Status:    {}", job.status);
    let _ = writeln!(out, "Progress:  {}%", job.progress);
    let _ = writeln!(out, "Encoder:   {} ({})", job.codec, job.encoder);
    let _ = writeln!(out, "Input:     {}", job.input_path);
    let _ = writeln!(out, "Output:    {}", job.output_path);
    let _ = writeln!(out, "Created:   {}", format_timestamp(job.created_at));
    if job.was_updated() {
        let _ = writeln!(out, "Updated:   {}", format_timestamp(job.updated_at));
    }
    if let Some(msg) = job.error_msg.as_deref() {
        let _ = writeln!(out, "Error:     {msg}");
    }

    out.push('\n');
    section(&mut out, "Parameters");
    let params = serde_json::Value::Object(job.params.clone());
    match serde_json::to_string_pretty(&params) {
        Ok(json) => {
            let _ = writeln!(out, "{json}");
        }
        Err(_) => {
            let _ = writeln!(out, "{params}");
        }
    }

    if let Some(metrics) = &job.metrics {
        out.push('\n');
        render_metrics(&mut out, metrics);
    }

    out
}

fn render_metrics(out: &mut String, metrics: &JobMetrics) {
    section(out, "Metrics");
    let _ = writeln!(out, "Duration:       {}", format_duration(metrics.duration));
    let _ = writeln!(out, "Bitrate:        {}", format_bitrate(metrics.bitrate));
    let _ = writeln!(out, "VMAF score:     {}", format_score(metrics.vmaf_score));
    if let (Some(min), Some(max)) = (metrics.vmaf_min, metrics.vmaf_max) {
        let _ = writeln!(out, "VMAF range:     {min:.2} .. {max:.2}");
    }
    if let Some(err) = metrics.vmaf_error.as_deref() {
        let _ = writeln!(out, "VMAF error:     {err}");
    }
    let _ = writeln!(out, "File size:      {}", format_size(metrics.file_size));
    let _ = writeln!(out, "Encoding time:  {}", format_duration(metrics.encoding_time));
    if let Some(speed) = metrics.speed_factor() {
        let _ = writeln!(out, "Speed:          {speed:.2}x realtime");
    }
}

/// Render a job listing in server order.
pub fn render_job_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "No jobs found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36} | {:<10} | {:<8} | {:<10} | CREATED",
        "ID", "STATUS", "PROGRESS", "CODEC"
    );
    let _ = writeln!(out, "{}", "-".repeat(TABLE_WIDTH));

    for job in jobs {
        let id: String = job.id.as_str().chars().take(36).collect();
        let created = job.created_at.map_or_else(
            || NOT_AVAILABLE.to_string(),
            |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        );
        let _ = writeln!(
            out,
            "{:<36} | {:<10} | {:<8} | {:<10} | {}",
            id,
            job.status.as_str(),
            format!("{}%", job.progress),
            job.codec,
            created
        );
    }

    let _ = writeln!(out, "\nTotal: {} job(s)", jobs.len());
    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, JobStatus};

    fn job(status: JobStatus) -> Job {
        let mut params = serde_json::Map::new();
        params.insert("qualityMode".into(), "bitrate".into());
        params.insert("bitrateKbps".into(), 2000.into());
        params.insert("scale".into(), "1080p".into());
        Job {
            id: JobId::new("job-1"),
            status,
            progress: 100,
            codec: "hevc".into(),
            encoder: "x265".into(),
            input_path: "/media/sample.mp4".into(),
            output_path: "/media/out-job-1.mp4".into(),
            params,
            metrics: None,
            error_msg: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_report_without_metrics() {
        let report = render_report(&job(JobStatus::Canceled));
        assert!(report.contains("ID:        job-1"));
        assert!(report.contains("Status:    canceled"));
        assert!(report.contains("hevc (x265)"));
        assert!(!report.contains("Metrics"));
        assert!(!report.contains("Updated"));
    }

    #[test]
    fn test_report_params_keep_order() {
        let report = render_report(&job(JobStatus::Success));
        let mode = report.find("qualityMode").unwrap();
        let bitrate = report.find("bitrateKbps").unwrap();
        let scale = report.find("\"scale\"").unwrap();
        assert!(mode < bitrate && bitrate < scale);
    }

    #[test]
    fn test_report_with_metrics() {
        let mut j = job(JobStatus::Success);
        j.metrics = Some(JobMetrics {
            duration: Some(3661.0),
            bitrate: Some(2_000_000.0),
            vmaf_score: Some(93.456),
            file_size: Some(1536),
            encoding_time: Some(1830.5),
            ..Default::default()
        });
        let report = render_report(&j);
        assert!(report.contains("Duration:       1h 1m 1s"));
        assert!(report.contains("Bitrate:        2.00 Mbps"));
        assert!(report.contains("VMAF score:     93.46"));
        assert!(report.contains("File size:      1.50 KB"));
        assert!(report.contains("Encoding time:  30m 30s"));
        assert!(report.contains("Speed:          2.00x realtime"));
    }

    #[test]
    fn test_report_vmaf_range_is_ascii() {
        let mut j = job(JobStatus::Success);
        j.metrics = Some(JobMetrics {
            vmaf_score: Some(94.0),
            vmaf_min: Some(88.1),
            vmaf_max: Some(99.25),
            ..Default::default()
        });
        let report = render_report(&j);
        assert!(report.contains("VMAF range:     88.10 .. 99.25"));
        let range = report.lines().find(|l| l.starts_with("VMAF range")).unwrap();
        assert!(range.is_ascii());
    }

    #[test]
    fn test_report_omits_speed_without_encoding_time() {
        let mut j = job(JobStatus::Success);
        j.metrics = Some(JobMetrics {
            duration: Some(60.0),
            ..Default::default()
        });
        let report = render_report(&j);
        assert!(report.contains("VMAF score:     N/A"));
        assert!(!report.contains("Speed:"));
    }

    #[test]
    fn test_report_shows_error() {
        let mut j = job(JobStatus::Failed);
        j.error_msg = Some("ffmpeg exited with code 1".into());
        assert!(render_report(&j).contains("Error:     ffmpeg exited with code 1"));
    }

    #[test]
    fn test_table() {
        assert_eq!(render_job_table(&[]), "No jobs found.\n");

        let jobs = vec![job(JobStatus::Running), job(JobStatus::Queued)];
        let table = render_job_table(&jobs);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("running"));
        assert!(lines[3].contains("queued"));
        assert!(table.contains("Total: 2 job(s)"));
    }
}
