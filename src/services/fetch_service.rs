use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tokio::time::sleep;

const RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Rate limiting and server-side failures are worth another attempt; other
/// client errors are not.
pub fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Bounded fixed-delay retry loop. `max_retries = 0` makes exactly one
/// attempt. A final value that is still retryable is handed back as-is so
/// the caller sees the real response; a final transport error propagates.
pub async fn run_with_retry<T, E, F, Fut, R>(
    mut call: F,
    is_retryable: R,
    max_retries: u32,
    delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&T) -> bool,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) if !is_retryable(&value) => return Ok(value),
            Ok(value) => {
                if attempt >= max_retries {
                    return Ok(value);
                }
            }
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err);
                }
            }
        }

        attempt += 1;
        println!("Retrying request (attempt {} of {})", attempt + 1, max_retries + 1);
        sleep(delay).await;
    }
}

/// GET with bounded retries and a fixed 1 second delay between attempts.
/// Only used for idempotent reads; there is no jitter or exponential growth
/// because the retry budget stays small and the calls are interactive.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    max_retries: u32,
) -> Result<Response, reqwest::Error> {
    run_with_retry(
        || client.get(url).send(),
        |response: &Response| retryable_status(response.status()),
        max_retries,
        RETRY_DELAY,
    )
    .await
}
