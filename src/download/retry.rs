use crate::error::DownloadError;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff on 5xx, 429, and transient connection errors;
/// non-retryable 4xx propagate immediately (spec §4.C "Retries").
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, DownloadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DownloadError>>,
    {
        let mut last_error = None;
        for attempt_number in 0..self.max_attempts {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) if is_retryable(&error) => {
                    last_error = Some(error);
                    if attempt_number + 1 < self.max_attempts {
                        let backoff = Duration::from_millis(200 * 2u64.pow(attempt_number));
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(error) => return Err(error),
            }
        }
        Err(last_error.unwrap_or(DownloadError::RetriesExhausted { url: String::new(), attempts: self.max_attempts }))
    }
}

fn is_retryable(error: &DownloadError) -> bool {
    match error {
        DownloadError::Request(request_error) => {
            request_error.is_timeout()
                || request_error.is_connect()
                || request_error
                    .status()
                    .map(|status| status.is_server_error() || status.as_u16() == 429)
                    .unwrap_or(false)
        }
        _ => false,
    }
}
