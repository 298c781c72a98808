//! Encoding-farm REST API client.
//!
//! ## Endpoints
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `POST` | `/jobs` | [`JobSubmission`] | created [`Job`] |
//! | `GET` | `/jobs/{id}` | | [`Job`] |
//! | `GET` | `/jobs?status={status}` | | `{"items": [Job]}` |
//! | `POST` | `/jobs/{id}/cancel` | | [`Job`] |
//! | `POST` | `/jobs/{id}/retry` | | [`Job`] |
//!
//! Non-2xx responses carry `{"error": "..."}`. When the body has any other
//! shape the error falls back to the HTTP reason phrase.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::ServerConfig;
use crate::error::{ClientError, ClientResult};
use crate::job::{Job, JobId, JobStatus, JobSubmission};
use crate::source::JobSource;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// User agent sent with every request.
const USER_AGENT: &str = concat!("encfarm/", env!("CARGO_PKG_VERSION"));

/// Encoding-farm API client.
#[derive(Debug, Clone)]
pub struct FarmClient {
    /// HTTP client.
    client: Client,
    /// API base URL, e.g. `http://localhost:3000/api`.
    base_url: Url,
}

impl FarmClient {
    /// Create a client with default timeouts.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::from_config(&ServerConfig {
            base_url: base_url.to_string(),
            ..ServerConfig::default()
        })
    }

    /// Create a client from server configuration.
    pub fn from_config(config: &ServerConfig) -> ClientResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the full URL for a path below the base.
    fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Configuration(format!("base URL cannot have paths: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Get one job.
    #[instrument(skip(self))]
    pub async fn get_job(&self, job_id: &JobId) -> ClientResult<Job> {
        let id = non_empty(job_id)?;
        let url = self.url(&["jobs", id])?;
        debug!("Getting job from {}", url);

        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// List jobs, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> ClientResult<Vec<Job>> {
        let url = self.url(&["jobs"])?;
        debug!("Listing jobs from {}", url);

        let mut request = self.client.get(url);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }

        let response = request.send().await?;
        let page: JobListResponse = self.handle_response(response).await?;
        Ok(page.items)
    }

    /// Submit a new job.
    #[instrument(skip(self, submission), fields(input = %submission.input_path))]
    pub async fn create_job(&self, submission: &JobSubmission) -> ClientResult<Job> {
        let url = self.url(&["jobs"])?;
        debug!("Creating job at {}", url);

        let response = self.client.post(url).json(submission).send().await?;
        self.handle_response(response).await
    }

    /// Cancel a queued or running job.
    #[instrument(skip(self))]
    pub async fn cancel_job(&self, job_id: &JobId) -> ClientResult<Job> {
        let id = non_empty(job_id)?;
        let url = self.url(&["jobs", id, "cancel"])?;
        debug!("Cancelling job at {}", url);

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Re-queue a failed or canceled job.
    #[instrument(skip(self))]
    pub async fn retry_job(&self, job_id: &JobId) -> ClientResult<Job> {
        let id = non_empty(job_id)?;
        let url = self.url(&["jobs", id, "retry"])?;
        debug!("Retrying job at {}", url);

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Handle HTTP response, decoding JSON or returning an error.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            decode_body(&body)
        } else {
            debug!("Request failed with {}: {}", status, body);
            Err(error_from_response(status, &body))
        }
    }
}

#[async_trait]
impl JobSource for FarmClient {
    async fn fetch(&self, job_id: &JobId) -> ClientResult<Job> {
        self.get_job(job_id).await
    }

    async fn list(&self, status: Option<JobStatus>) -> ClientResult<Vec<Job>> {
        self.list_jobs(status).await
    }
}

/// `GET /jobs` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JobListResponse {
    /// Jobs in server order.
    #[serde(default)]
    pub items: Vec<Job>,
}

/// Error envelope returned by the farm.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Server-provided message.
    pub error: String,
}

/// Decode a success body, reporting shape mismatches as decode errors.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> ClientResult<T> {
    serde_json::from_str(body).map_err(|e| ClientError::Decode(format!("{e}")))
}

/// Map a non-success response to an error.
///
/// Prefers the server's `{"error": ...}` message; otherwise uses the HTTP
/// reason phrase so the user still sees something meaningful.
pub fn error_from_response(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|e| e.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    match status {
        StatusCode::NOT_FOUND => ClientError::JobNotFound(message),
        _ => ClientError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Configuration("server URL is empty".into()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| ClientError::Configuration(format!("invalid server URL '{trimmed}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Configuration(format!(
            "server URL cannot have paths: {trimmed}"
        )));
    }
    Ok(url)
}

fn non_empty(job_id: &JobId) -> ClientResult<&str> {
    let id = job_id.as_str().trim();
    if id.is_empty() {
        Err(ClientError::InvalidJobId)
    } else {
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = FarmClient::new("http://localhost:3000/api/").unwrap();
        let url = client.url(&["jobs", "abc"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/jobs/abc");

        let client = FarmClient::new("http://farm.local/api").unwrap();
        let url = client.url(&["jobs", "abc", "cancel"]).unwrap();
        assert_eq!(url.as_str(), "http://farm.local/api/jobs/abc/cancel");
    }

    #[test]
    fn test_url_escapes_ids() {
        let client = FarmClient::new(DEFAULT_BASE_URL).unwrap();
        let url = client.url(&["jobs", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/jobs/a%2Fb");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            FarmClient::new(""),
            Err(ClientError::Configuration(_))
        ));
        assert!(matches!(
            FarmClient::new("not a url"),
            Err(ClientError::Configuration(_))
        ));
        assert!(matches!(
            FarmClient::new("mailto:farm@example.com"),
            Err(ClientError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_job_id_rejected_before_request() {
        let client = FarmClient::new(DEFAULT_BASE_URL).unwrap();
        let err = client.get_job(&JobId::new("  ")).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidJobId));
    }

    #[test]
    fn test_error_envelope_extracted() {
        let err = error_from_response(StatusCode::BAD_REQUEST, r#"{"error": "missing parameters"}"#);
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "missing parameters");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_maps_to_job_not_found() {
        let err = error_from_response(StatusCode::NOT_FOUND, r#"{"error": "job does not exist"}"#);
        assert!(matches!(err, ClientError::JobNotFound(m) if m == "job does not exist"));
    }

    #[test]
    fn test_non_envelope_body_degrades() {
        let err = error_from_response(StatusCode::BAD_GATEWAY, "<html>nginx</html>");
        assert!(matches!(
            err,
            ClientError::Api { status: 502, ref message } if message == "Bad Gateway"
        ));

        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn test_decode_list_envelope() {
        let body = r#"{"items": [
            {"id": "b", "status": "running", "progress": 10},
            {"id": "a", "status": "queued", "progress": 0}
        ]}"#;
        let page: JobListResponse = decode_body(body).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_decode_failure_is_decode_error() {
        let err = decode_body::<Job>(r#"{"id": "a", "status": "paused"}"#).unwrap_err();
        assert!(err.is_decode());
        let err = decode_body::<Job>("not json").unwrap_err();
        assert!(err.is_decode());
    }
}
