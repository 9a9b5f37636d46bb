mod file;
mod report;

pub use file::{UploadFile, UploadMetadata};
pub use report::{FileOutcome, UploadReport};

use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::QueryClient;
use crate::constants::{MAX_UPLOAD_RETRIES, RETRY_BASE_DELAY_MS, UPLOAD_DELAY_MS};
use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateway;
use crate::models::{NewPhoto, Photo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Wait between two files; not applied after the last one.
    pub pacing: Duration,
    pub max_retries: u32,
    pub retry_base: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(UPLOAD_DELAY_MS),
            max_retries: MAX_UPLOAD_RETRIES,
            retry_base: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }
}

impl UploadPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_base.saturating_mul(1u32 << exponent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Uploading {
        index: usize,
    },
    Retrying {
        index: usize,
        attempt: u32,
        delay: Duration,
    },
    Delaying {
        next_index: usize,
        delay: Duration,
    },
    Completed,
    PartiallyFailed {
        failed: usize,
    },
    Cancelled,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Completed | UploadState::PartiallyFailed { .. } | UploadState::Cancelled
        )
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Idle => write!(f, "idle"),
            UploadState::Uploading { index } => write!(f, "uploading #{}", index + 1),
            UploadState::Retrying {
                index,
                attempt,
                delay,
            } => write!(
                f,
                "retrying #{} (attempt {}) in {}s",
                index + 1,
                attempt,
                delay.as_secs()
            ),
            UploadState::Delaying { next_index, delay } => {
                write!(f, "waiting {}s before #{}", delay.as_secs(), next_index + 1)
            }
            UploadState::Completed => write!(f, "completed"),
            UploadState::PartiallyFailed { failed } => write!(f, "{} upload(s) failed", failed),
            UploadState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Uploads a batch of files one after another through
/// [`QueryClient::create_photo`], pacing requests for the server's rate
/// limit and retrying rate-limited attempts with exponential backoff.
///
/// A file that fails is recorded in the report and the batch moves on to
/// the next file.
pub struct UploadOrchestrator<'a, G> {
    client: &'a QueryClient<G>,
    policy: UploadPolicy,
    state: UploadState,
    observer: Option<UnboundedSender<UploadState>>,
    cancel: CancellationToken,
}

impl<'a, G: Gateway> UploadOrchestrator<'a, G> {
    pub fn new(client: &'a QueryClient<G>, policy: UploadPolicy) -> Self {
        Self {
            client,
            policy,
            state: UploadState::Idle,
            observer: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Every state transition is sent to `observer`.
    pub fn with_observer(mut self, observer: UnboundedSender<UploadState>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn transition(&mut self, next: UploadState) {
        debug!("Upload state: {} -> {}", self.state, next);
        self.state = next.clone();
        if let Some(observer) = &self.observer {
            // A dropped receiver only means nobody is watching
            let _ = observer.send(next);
        }
    }

    /// Returns false when cancelled during the wait.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    pub async fn run(
        &mut self,
        album_id: &str,
        files: Vec<UploadFile>,
        metadata: &UploadMetadata,
    ) -> ClientResult<UploadReport> {
        if files.is_empty() {
            return Err(ClientError::Validation(
                "Select at least one file to upload".to_string(),
            ));
        }

        let total = files.len();
        let mut report = UploadReport::new(total);

        for (index, file) in files.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }

            info!("Uploading photo {} of {}: {}", index + 1, total, file.filename);
            let photo = metadata.new_photo(file, total);
            match self.upload_with_retry(album_id, index, &photo).await {
                Attempt::Created(created) => report.record_created(index, created),
                Attempt::Interrupted => break,
                Attempt::Failed(e) => {
                    warn!("Upload of {} failed: {}", photo.filename, e);
                    report.record_failed(index, e.user_message());
                }
            }

            if index + 1 < total {
                let delay = self.policy.pacing;
                self.transition(UploadState::Delaying {
                    next_index: index + 1,
                    delay,
                });
                if !self.pause(delay).await {
                    break;
                }
            }
        }

        let terminal = if self.cancel.is_cancelled() {
            UploadState::Cancelled
        } else if report.failed_count() > 0 {
            UploadState::PartiallyFailed {
                failed: report.failed_count(),
            }
        } else {
            UploadState::Completed
        };
        info!(
            "Upload batch finished: {} created, {} failed",
            report.created_count(),
            report.failed_count()
        );
        self.transition(terminal.clone());
        report.finish(terminal);
        Ok(report)
    }

    async fn upload_with_retry(
        &mut self,
        album_id: &str,
        index: usize,
        photo: &NewPhoto,
    ) -> Attempt {
        let mut attempt = 0;
        loop {
            self.transition(UploadState::Uploading { index });
            let err = match self.client.create_photo(album_id, photo).await {
                Ok(created) => return Attempt::Created(created),
                Err(e) => e,
            };

            if !err.is_rate_limited() || attempt >= self.policy.max_retries {
                return Attempt::Failed(err);
            }

            attempt += 1;
            let delay = self.policy.backoff(attempt);
            warn!(
                "Rate limited on {}, retry {} of {} in {}s",
                photo.filename,
                attempt,
                self.policy.max_retries,
                delay.as_secs()
            );
            self.transition(UploadState::Retrying {
                index,
                attempt,
                delay,
            });
            if !self.pause(delay).await {
                return Attempt::Interrupted;
            }
        }
    }
}

enum Attempt {
    Created(Photo),
    Failed(ClientError),
    /// Cancelled while waiting for a retry.
    Interrupted,
}
