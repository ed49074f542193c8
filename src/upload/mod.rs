// Resilient file upload.
//
// `Uploader` validates a file, picks a timeout budget from its size and
// drives an `UploadTransport` through a bounded retry loop with
// exponential backoff. Validation problems are returned as `Err` before any
// network attempt; transport failures come back as `UploadOutcome::Failed`
// so a batch caller can move on to the next file.

pub mod progress;
pub mod retry;
pub mod timeout;
pub mod transport;
pub mod validate;

pub use progress::{IndicatifProgress, NoProgress, ProgressReader, ProgressSink};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use timeout::{TimeoutBudget, TimeoutPolicy};
pub use transport::{AttemptContext, HttpTransport, UploadAttemptResult, UploadTransport};
pub use validate::validate_file;

use crate::error::{Result, VgError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// A file to upload with the credentials to upload it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub token: String,
    pub prefix: Option<String>,
}

impl UploadRequest {
    pub fn new(path: impl Into<PathBuf>, token: impl Into<String>, prefix: Option<String>) -> Self {
        UploadRequest {
            path: path.into(),
            token: token.into(),
            prefix: prefix.filter(|p| !p.trim().is_empty()),
        }
    }
}

#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded { remote_path: String, attempts_made: u32 },
    Failed { last_reason: VgError, attempts_made: u32 },
}

impl UploadOutcome {
    pub fn remote_path(&self) -> Option<&str> {
        match self {
            UploadOutcome::Uploaded { remote_path, .. } => Some(remote_path),
            UploadOutcome::Failed { .. } => None,
        }
    }

    pub fn attempts_made(&self) -> u32 {
        match self {
            UploadOutcome::Uploaded { attempts_made, .. } | UploadOutcome::Failed { attempts_made, .. } => {
                *attempts_made
            }
        }
    }
}

/// Retry and timeout settings shared by every upload an [`Uploader`] makes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadConfig {
    pub retry: RetryPolicy,
    pub timeouts: TimeoutPolicy,
}

pub struct Uploader<T, S = ThreadSleeper> {
    transport: T,
    config: UploadConfig,
    sleeper: S,
}

impl<T: UploadTransport> Uploader<T> {
    pub fn new(transport: T, config: UploadConfig) -> Self {
        Uploader {
            transport,
            config,
            sleeper: ThreadSleeper,
        }
    }
}

impl<T: UploadTransport, S: Sleeper> Uploader<T, S> {
    pub fn with_sleeper(transport: T, config: UploadConfig, sleeper: S) -> Self {
        Uploader {
            transport,
            config,
            sleeper,
        }
    }

    pub fn upload(
        &self,
        request: &UploadRequest,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<UploadOutcome> {
        let file_size = validate_file(&request.path)?;
        let budget = self.config.timeouts.budget_for(file_size);
        let progress = progress.unwrap_or_else(|| Arc::new(NoProgress));
        let max_attempts = self.config.retry.max_attempts.max(1);

        info!(
            path = %request.path.display(),
            size = file_size,
            total_timeout_secs = budget.total.as_secs(),
            "starting upload"
        );

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            let ctx = AttemptContext {
                request,
                file_size,
                budget,
                attempt,
                progress: Arc::clone(&progress),
            };
            match self.transport.send(&ctx) {
                UploadAttemptResult::Success { remote_path } => {
                    info!(remote_path = %remote_path, attempts = attempt, "upload finished");
                    break UploadOutcome::Uploaded {
                        remote_path,
                        attempts_made: attempt,
                    };
                }
                UploadAttemptResult::TerminalFailure(reason) => {
                    warn!(attempt, error = %reason, "upload failed, not retrying");
                    break UploadOutcome::Failed {
                        last_reason: reason,
                        attempts_made: attempt,
                    };
                }
                UploadAttemptResult::RetryableFailure(reason) => {
                    if attempt >= max_attempts {
                        warn!(attempt, error = %reason, "upload failed, max retries exceeded");
                        break UploadOutcome::Failed {
                            last_reason: reason,
                            attempts_made: attempt,
                        };
                    }
                    let delay = self.config.retry.delay_for(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_secs = delay.as_secs_f64(),
                        error = %reason,
                        "upload attempt failed, retrying"
                    );
                    self.sleeper.sleep(delay);
                }
            }
        };
        progress.finish();
        Ok(outcome)
    }
}
