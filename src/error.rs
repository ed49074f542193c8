// Error types shared by every part of the client.

use std::path::PathBuf;
use thiserror::Error;

/// Extensions accepted by the upload endpoint, listed in error messages.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".vcf", ".vcf.gz", ".pdf", ".txt"];

#[derive(Error, Debug)]
pub enum VgError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Unsupported file type: {extension}. Supported types: {}", SUPPORTED_EXTENSIONS.join(", "))]
    UnsupportedFileType { path: PathBuf, extension: String },

    #[error("Token file is empty: {}", .0.display())]
    EmptyToken(PathBuf),

    #[error("Token file not found: {}", .0.display())]
    TokenFileMissing(PathBuf),

    #[error("Request timed out: {0}")]
    NetworkTimeout(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Client error (HTTP {status}): {message}")]
    ClientError { status: u16, message: String },

    #[error("Unexpected response status (HTTP {status}): {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid task configuration: {}", .0.join("; "))]
    InvalidTaskConfig(Vec<String>),

    #[error("Invalid samplesheet: {}", .0.join("; "))]
    InvalidSamplesheet(Vec<String>),

    #[error("Invalid submission id: {0:?}")]
    InvalidSubmissionId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl VgError {
    /// Maps a non-success HTTP status and its body to an error kind.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = error_message(body);
        match status {
            408 | 429 | 500..=599 => VgError::ServerError { status, message },
            400..=499 => VgError::ClientError { status, message },
            _ => VgError::UnexpectedStatus { status, message },
        }
    }

    /// True for failures where a later attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VgError::NetworkTimeout(_) | VgError::NetworkError(_) | VgError::ServerError { .. }
        )
    }
}

impl From<reqwest::Error> for VgError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VgError::NetworkTimeout(e.to_string())
        } else if e.is_decode() {
            VgError::MalformedResponse(e.to_string())
        } else {
            VgError::NetworkError(e.to_string())
        }
    }
}

/// Extracts the server's `message` field from an error body, falling back to
/// the raw text when the body is not JSON.
pub fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { message: Some(m) }) => m,
        Ok(ErrorBody { message: None }) => "Unknown error".to_string(),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

pub type Result<T> = std::result::Result<T, VgError>;
