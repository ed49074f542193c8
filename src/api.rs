// API client module: a small blocking HTTP client for the Virtual Geneticist
// service. It owns the reqwest client, the base URL and the bearer token, and
// hands out an `Uploader` wired to the same client for file uploads.

use crate::config::ClientConfig;
use crate::diagnose::{self, Diagnosis};
use crate::error::{Result, VgError};
use crate::status::{check_submission_id, StatusReport, StatusSource};
use crate::task::{TaskConfig, TaskCreated};
use crate::upload::{HttpTransport, TimeoutBudget, UploadConfig, UploadRequest, Uploader};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for the small JSON endpoints (task creation and status).
const API_TIMEOUT: Duration = Duration::from_secs(60);

/// Simple API client that holds a reqwest blocking client, the base URL of
/// the service and an optional bearer token for authenticated calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .connect_timeout(TimeoutBudget::DEFAULT.connect)
            .build()
            .map_err(|e| VgError::NetworkError(format!("Failed to build HTTP client: {e}")))?;
        Ok(ApiClient {
            client,
            base_url,
            token: None,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store a bearer token for subsequent authenticated requests.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.set_token(token);
        self
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| VgError::Config("no API token set; provide a token file with --token".into()))
    }

    /// Helper to build the Authorization header map when a token is set.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(t) = &self.token {
            let val = HeaderValue::from_str(&format!("Bearer {t}"))
                .map_err(|_| VgError::Config("token contains characters not allowed in a header".into()))?;
            headers.insert(AUTHORIZATION, val);
        }
        Ok(headers)
    }

    /// Build an upload request carrying this client's token. Fails when no
    /// token is set.
    pub fn upload_request(&self, path: impl Into<PathBuf>, prefix: Option<String>) -> Result<UploadRequest> {
        Ok(UploadRequest::new(path, self.token()?, prefix))
    }

    /// Upload transport sharing this client's connection pool.
    pub fn transport(&self) -> HttpTransport {
        HttpTransport::new(self.client.clone(), TimeoutBudget::DEFAULT.connect, &self.base_url)
    }

    pub fn uploader(&self, config: UploadConfig) -> Uploader<HttpTransport> {
        Uploader::new(self.transport(), config)
    }

    /// Check that the API host resolves, accepts TCP connections and answers
    /// HTTP requests.
    pub fn diagnose(&self) -> Diagnosis {
        diagnose::run(&self.client, &self.base_url, TimeoutBudget::DEFAULT.connect, API_TIMEOUT)
    }

    /// Validate and submit an analysis task; returns the submission id.
    pub fn create_task(&self, task: &TaskConfig) -> Result<TaskCreated> {
        task.validate()?;
        let url = format!("{}/createtask", &self.base_url);
        debug!(title = %task.title, mode = %task.vcf_mode, assembly = %task.assembly, "creating task");
        let res = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .timeout(API_TIMEOUT)
            .json(task)
            .send()?;

        match parse_json::<TaskCreated>(res) {
            Err(VgError::ClientError { status, message }) => {
                if message.contains("already been submitted") {
                    warn!(
                        title = %task.title,
                        "task was already submitted; the API rejects duplicate submissions, use a different title"
                    );
                }
                Err(VgError::ClientError { status, message })
            }
            other => other,
        }
    }

    /// Fetch the current status of a submission.
    pub fn get_status(&self, submission_id: &str) -> Result<StatusReport> {
        check_submission_id(submission_id)?;
        let url = format!("{}/getstatus", &self.base_url);
        let res = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .timeout(API_TIMEOUT)
            .query(&[("submission_id", submission_id.trim())])
            .send()?;
        parse_json(res)
    }
}

impl StatusSource for ApiClient {
    fn get_status(&self, submission_id: &str) -> Result<StatusReport> {
        ApiClient::get_status(self, submission_id)
    }
}

/// Submits tasks; implemented by `ApiClient` and faked in batch tests.
pub trait TaskSubmitter {
    fn submit(&self, task: &TaskConfig) -> Result<TaskCreated>;
}

impl TaskSubmitter for ApiClient {
    fn submit(&self, task: &TaskConfig) -> Result<TaskCreated> {
        self.create_task(task)
    }
}

/// Turn a response into `T`, or into the error matching its status.
fn parse_json<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status().as_u16();
    let body = res.text()?;
    if status != 200 {
        return Err(VgError::from_status(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| VgError::MalformedResponse(format!("{e}: {}", truncate(&body, 200))))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
