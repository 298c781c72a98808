//! Job snapshot types.
//!
//! The job state machine, as observed from the client:
//!
//! ```text
//!   POST /jobs ──→ queued ──→ running ──→ success
//!                    │           │
//!                    │           ├──→ failed(error_msg)
//!                    │           │
//!                    └───────────┴──→ canceled
//! ```
//!
//! **Invariants:**
//! - `metrics` is only populated once a job reaches `success`.
//! - `error_msg` is only populated for `failed` jobs.
//! - Neither is relied upon: both decode as `Option` and every consumer
//!   handles their absence.
//!
//! Snapshots are decoded once at the API boundary and never mutated by the
//! client. A `retry` request moves a `failed`/`canceled` job back to `queued`
//! on the server side; the client simply sees a fresh snapshot.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ClientError, ClientResult};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a job. Unknown wire values fail to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker.
    Queued,
    /// Encoding in progress.
    Running,
    /// Finished; metrics are available.
    Success,
    /// Encoding failed.
    Failed,
    /// Canceled by a user.
    Canceled,
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Success,
        JobStatus::Failed,
        JobStatus::Canceled,
    ];

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Check if the job is still pending (queued or running).
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    /// Check if the job completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Success)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| {
                ClientError::Decode(format!(
                    "unknown job status '{s}' (expected one of: queued, running, success, failed, canceled)"
                ))
            })
    }
}

/// Metrics reported for a successfully encoded job.
///
/// Field names follow the farm's camelCase convention. The server's own
/// `sizeBytes` / `encodeDurationSec` spellings are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetrics {
    /// Source duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Output bitrate in bits per second.
    #[serde(default)]
    pub bitrate: Option<f64>,
    /// Mean VMAF score.
    #[serde(default)]
    pub vmaf_score: Option<f64>,
    /// Lowest per-frame VMAF score.
    #[serde(default)]
    pub vmaf_min: Option<f64>,
    /// Highest per-frame VMAF score.
    #[serde(default)]
    pub vmaf_max: Option<f64>,
    /// Why VMAF could not be computed.
    #[serde(default)]
    pub vmaf_error: Option<String>,
    /// Output file size in bytes.
    #[serde(default, alias = "sizeBytes")]
    pub file_size: Option<u64>,
    /// Wall-clock encoding time in seconds.
    #[serde(default, alias = "encodeDurationSec")]
    pub encoding_time: Option<f64>,
    /// Encoding time divided by media duration, as computed server-side.
    #[serde(default)]
    pub encode_efficiency: Option<f64>,
    /// Anything else the server attached.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JobMetrics {
    /// Real-time multiplier (`duration / encoding_time`).
    ///
    /// `None` if either operand is missing or zero.
    pub fn speed_factor(&self) -> Option<f64> {
        let duration = self.duration.filter(|d| *d > 0.0)?;
        let encoding_time = self.encoding_time.filter(|t| *t > 0.0)?;
        Some(duration / encoding_time)
    }
}

/// A read-only snapshot of a job as returned by `GET /jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// The job identifier.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// Completion percentage, `0..=100`.
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
    /// Codec family (`h264`, `hevc`, `av1`, `vp9`).
    #[serde(default)]
    pub codec: String,
    /// Encoder implementation (`x264`, `svt-av1`, `hevc_nvenc`, ...).
    #[serde(default, rename = "impl")]
    pub encoder: String,
    /// Source media path.
    #[serde(default)]
    pub input_path: String,
    /// Destination path chosen by the server.
    #[serde(default)]
    pub output_path: String,
    /// Encode parameters, in server order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Metrics, present once the job succeeded.
    #[serde(default)]
    pub metrics: Option<JobMetrics>,
    /// Failure reason, present when the job failed.
    #[serde(default)]
    pub error_msg: Option<String>,
    /// Time the job was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Time of the last server-side update.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Failure message, falling back to a placeholder.
    pub fn failure_reason(&self) -> &str {
        self.error_msg
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(UNKNOWN_ERROR)
    }

    /// Whether the snapshot was updated after creation.
    pub fn was_updated(&self) -> bool {
        match (self.created_at, self.updated_at) {
            (Some(created), Some(updated)) => updated != created,
            (None, Some(_)) => true,
            _ => false,
        }
    }
}

/// Placeholder shown for a failed job without an error message.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Accept any JSON number (the server stores progress as a real), floor it
/// and clamp to `0..=100`. `null` decodes as zero.
fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(match raw {
        Some(p) if p.is_finite() => p.floor().clamp(0.0, 100.0) as u8,
        _ => 0,
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Rate-control mode of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    /// Constant rate factor.
    #[default]
    Crf,
    /// Target bitrate in kbps.
    Bitrate,
}

/// Parameters attached to a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParams {
    /// Rate-control mode.
    pub quality_mode: QualityMode,
    /// CRF value (CRF mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u32>,
    /// Target bitrate (bitrate mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    /// Output scale (`source`, `1080p`, `720p`, ...).
    pub scale: String,
    /// Compute VMAF after encoding.
    pub enable_vmaf: bool,
    /// Lower VMAF bound for tuning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmaf_min: Option<f64>,
    /// Upper VMAF bound for tuning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmaf_max: Option<f64>,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            quality_mode: QualityMode::Crf,
            crf: Some(23),
            bitrate_kbps: None,
            scale: "source".into(),
            enable_vmaf: false,
            vmaf_min: None,
            vmaf_max: None,
        }
    }
}

impl JobParams {
    /// CRF-mode parameters.
    pub fn crf(crf: u32) -> Self {
        Self {
            crf: Some(crf),
            ..Default::default()
        }
    }

    /// Bitrate-mode parameters.
    pub fn bitrate(kbps: u32) -> Self {
        Self {
            quality_mode: QualityMode::Bitrate,
            crf: None,
            bitrate_kbps: Some(kbps),
            ..Default::default()
        }
    }

    /// Set the output scale.
    pub fn with_scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = scale.into();
        self
    }

    /// Set VMAF tuning bounds; enables VMAF.
    pub fn with_vmaf_bounds(mut self, min: f64, max: f64) -> Self {
        self.vmaf_min = Some(min);
        self.vmaf_max = Some(max);
        self.enable_vmaf = true;
        self
    }

    /// Check the parameters and normalise them the way the farm does.
    pub fn normalized(mut self) -> ClientResult<Self> {
        if self.scale.trim().is_empty() {
            self.scale = "source".into();
        }

        match self.quality_mode {
            QualityMode::Bitrate => {
                match self.bitrate_kbps {
                    Some(kbps) if kbps > 0 => {}
                    _ => {
                        return Err(ClientError::InvalidSubmission(
                            "bitrate mode requires a positive bitrate (kbps)".into(),
                        ));
                    }
                }
                self.crf = None;
            }
            QualityMode::Crf => {
                match self.crf {
                    Some(crf) if crf > 0 => {}
                    _ => {
                        return Err(ClientError::InvalidSubmission(
                            "CRF mode requires a CRF value".into(),
                        ));
                    }
                }
                self.bitrate_kbps = None;
            }
        }

        match (self.vmaf_min, self.vmaf_max) {
            (Some(min), Some(max)) => {
                if !(min.is_finite() && max.is_finite() && min >= 0.0 && max <= 100.0 && min <= max)
                {
                    return Err(ClientError::InvalidSubmission(format!(
                        "VMAF bounds must satisfy 0 <= min <= max <= 100 (got {min}..{max})"
                    )));
                }
                self.enable_vmaf = true;
            }
            (None, None) => {}
            _ => {
                return Err(ClientError::InvalidSubmission(
                    "VMAF bounds need both a minimum and a maximum".into(),
                ));
            }
        }

        Ok(self)
    }
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    /// Source media path.
    pub input_path: String,
    /// Requested output path; the server appends the job id.
    pub output_path: String,
    /// Codec family.
    pub codec: String,
    /// Encoder implementation.
    #[serde(rename = "impl")]
    pub encoder: String,
    /// Encode parameters.
    pub params: JobParams,
}

impl JobSubmission {
    /// Create a submission with default CRF parameters.
    pub fn new(
        input_path: impl Into<String>,
        output_path: impl Into<String>,
        codec: impl Into<String>,
        encoder: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            codec: codec.into(),
            encoder: encoder.into(),
            params: JobParams::default(),
        }
    }

    /// Replace the parameters.
    pub fn with_params(mut self, params: JobParams) -> Self {
        self.params = params;
        self
    }

    /// Validate required fields and normalise parameters.
    pub fn validated(mut self) -> ClientResult<Self> {
        let required = [
            ("input path", &self.input_path),
            ("output path", &self.output_path),
            ("codec", &self.codec),
            ("impl", &self.encoder),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ClientError::InvalidSubmission(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        self.params = self.params.normalized()?;
        Ok(self)
    }
}
