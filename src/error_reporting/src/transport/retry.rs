use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{ApiResponse, TransportResult};

/// Runs `send` until it succeeds, fails with a non-retryable error, or
/// `max_retries` extra attempts have been spent.
pub(super) async fn send_with_retry<F, Fut>(
    endpoint: &str,
    max_retries: usize,
    retry_delay: Duration,
    mut send: F,
) -> TransportResult<ApiResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TransportResult<ApiResponse>>,
{
    let max_attempts = max_retries + 1;
    let mut attempt = 1;

    loop {
        let start_time = Instant::now();

        match send().await {
            Ok(response) => {
                debug!(
                    "Request to {} succeeded on attempt {}, elapsed: {:?}",
                    endpoint,
                    attempt,
                    start_time.elapsed()
                );
                return Ok(response);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!(
                    "Attempt {} failed (retrying): {}, elapsed: {:?}",
                    attempt,
                    e,
                    start_time.elapsed()
                );
                tokio::time::sleep(retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                debug!(
                    "Attempt {} failed: {}, elapsed: {:?}",
                    attempt,
                    e,
                    start_time.elapsed()
                );
                return Err(e);
            }
        }
    }
}
