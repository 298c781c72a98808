//! Error types for the encoding-farm client.

use thiserror::Error;

/// Errors that can occur while talking to the encoding farm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network failure, timeout or connection refusal.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Job identifier was empty.
    #[error("Invalid job ID: identifier must not be empty")]
    InvalidJobId,

    /// Submission rejected before it reached the server.
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Gave up waiting for a job.
    #[error("Timeout waiting for job {0}")]
    Timeout(String),
}

impl ClientError {
    /// Whether this error came from the network layer rather than the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// Whether the response could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode(_))
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ClientError::Api {
            status: 400,
            message: "missing required parameters".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("missing required parameters"));
    }

    #[test]
    fn test_decode_classification() {
        let err = crate::api::decode_body::<u32>("nope").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(err.is_decode());
        assert!(!ClientError::InvalidJobId.is_decode());
        assert!(!ClientError::Timeout("j1".into()).is_transport());
    }

    #[test]
    fn test_timeout_display() {
        let err = ClientError::Timeout("job-42".into());
        assert_eq!(err.to_string(), "Timeout waiting for job job-42");
    }
}
