// Transport used by the uploader. One call to `send` is one HTTP attempt; the
// retry loop lives in the orchestrator.

use super::progress::{ProgressReader, ProgressSink};
use super::timeout::TimeoutBudget;
use super::UploadRequest;
use crate::error::VgError;
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of a single upload attempt.
#[derive(Debug)]
pub enum UploadAttemptResult {
    Success { remote_path: String },
    RetryableFailure(VgError),
    TerminalFailure(VgError),
}

impl UploadAttemptResult {
    fn from_error(e: VgError) -> Self {
        if e.is_retryable() {
            UploadAttemptResult::RetryableFailure(e)
        } else {
            UploadAttemptResult::TerminalFailure(e)
        }
    }
}

/// Everything a transport needs for one attempt.
pub struct AttemptContext<'a> {
    pub request: &'a UploadRequest,
    pub file_size: u64,
    pub budget: TimeoutBudget,
    /// 1-based attempt number.
    pub attempt: u32,
    pub progress: Arc<dyn ProgressSink>,
}

pub trait UploadTransport {
    fn send(&self, ctx: &AttemptContext<'_>) -> UploadAttemptResult;
}

#[derive(Deserialize)]
struct UploadResponse {
    upload_path: Option<String>,
}

/// Multipart upload over reqwest's blocking client.
pub struct HttpTransport {
    client: Client,
    connect_timeout: Duration,
    upload_url: String,
}

impl HttpTransport {
    /// `client` must have been built with `connect_timeout`; attempts whose
    /// budget asks for a different connect timeout get their own client.
    pub fn new(client: Client, connect_timeout: Duration, base_url: &str) -> Self {
        HttpTransport {
            client,
            connect_timeout,
            upload_url: format!("{}/upload", base_url.trim_end_matches('/')),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    fn client_for(&self, budget: &TimeoutBudget) -> Result<Client, VgError> {
        if budget.connect == self.connect_timeout {
            return Ok(self.client.clone());
        }
        Client::builder()
            .connect_timeout(budget.connect)
            .build()
            .map_err(|e| VgError::NetworkError(format!("failed to build HTTP client: {e}")))
    }
}

impl UploadTransport for HttpTransport {
    fn send(&self, ctx: &AttemptContext<'_>) -> UploadAttemptResult {
        let request = ctx.request;
        let client = match self.client_for(&ctx.budget) {
            Ok(c) => c,
            Err(e) => return UploadAttemptResult::TerminalFailure(e),
        };

        // The handle moves into the request body and is dropped with it
        // before this function returns.
        let file = match File::open(&request.path) {
            Ok(f) => f,
            Err(e) => return UploadAttemptResult::TerminalFailure(VgError::Io(e)),
        };
        let file_name = request
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        ctx.progress.start(ctx.file_size);
        let reader = ProgressReader::new(file, Arc::clone(&ctx.progress));
        let part = match multipart::Part::reader_with_length(reader, ctx.file_size)
            .file_name(file_name)
            .mime_str("application/octet-stream")
        {
            Ok(p) => p,
            Err(e) => return UploadAttemptResult::TerminalFailure(VgError::NetworkError(e.to_string())),
        };
        let mut form = multipart::Form::new().part("file", part);
        if let Some(prefix) = &request.prefix {
            form = form.text("prefix", prefix.clone());
        }

        debug!(url = %self.upload_url, attempt = ctx.attempt, "sending upload request");
        let res = client
            .post(&self.upload_url)
            .bearer_auth(&request.token)
            .timeout(ctx.budget.total)
            .multipart(form)
            .send();

        let res = match res {
            Ok(r) => r,
            Err(e) => return classify_transport_error(&e),
        };
        let status = res.status().as_u16();
        let body = match res.text() {
            Ok(b) => b,
            Err(e) => return classify_transport_error(&e),
        };
        classify_response(status, &body)
    }
}

/// Decide whether a reqwest failure is worth another attempt.
pub fn classify_transport_error(e: &reqwest::Error) -> UploadAttemptResult {
    if e.is_timeout() {
        UploadAttemptResult::RetryableFailure(VgError::NetworkTimeout(e.to_string()))
    } else if e.is_connect() || e.is_request() || e.is_body() {
        UploadAttemptResult::RetryableFailure(VgError::NetworkError(e.to_string()))
    } else if e.is_decode() {
        UploadAttemptResult::TerminalFailure(VgError::MalformedResponse(e.to_string()))
    } else {
        UploadAttemptResult::TerminalFailure(VgError::NetworkError(e.to_string()))
    }
}

/// Classify a complete response. Only 200 counts as success; a 200 whose
/// body lacks `upload_path` is terminal because the server already accepted
/// the file.
pub fn classify_response(status: u16, body: &str) -> UploadAttemptResult {
    if status != 200 {
        return UploadAttemptResult::from_error(VgError::from_status(status, body));
    }
    match serde_json::from_str::<UploadResponse>(body) {
        Ok(UploadResponse {
            upload_path: Some(remote_path),
        }) => UploadAttemptResult::Success { remote_path },
        Ok(_) => UploadAttemptResult::TerminalFailure(VgError::MalformedResponse(
            "response has no upload_path".to_string(),
        )),
        Err(e) => UploadAttemptResult::TerminalFailure(VgError::MalformedResponse(format!(
            "upload response is not JSON: {e}"
        ))),
    }
}
