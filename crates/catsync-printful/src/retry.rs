//! Retry with exponential back-off and jitter for catalog API calls.
//!
//! Transient conditions (HTTP 429, 5xx, connection failures, request
//! timeouts) are retried; everything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;

/// Upper bound on a single back-off sleep.
const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a back-off delay.
///
/// Retriable:
/// - [`SourceError::RateLimited`] (HTTP 429).
/// - [`SourceError::UnexpectedStatus`] with a 5xx status.
/// - [`SourceError::Http`] for timeouts, connection and request failures.
///
/// Not retriable: 404 and other 4xx, malformed bodies, pagination guards,
/// configuration errors.
pub(crate) fn is_retriable(err: &SourceError) -> bool {
    match err {
        SourceError::RateLimited { .. } => true,
        SourceError::UnexpectedStatus { status, .. } => *status >= 500,
        SourceError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        SourceError::NotFound { .. }
        | SourceError::Deserialize { .. }
        | SourceError::PaginationLimit { .. }
        | SourceError::PaginationStalled { .. }
        | SourceError::Timeout { .. }
        | SourceError::InvalidConfig(_) => false,
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at [`MAX_DELAY_MS`], then scaled by a ±25 % jitter factor.
/// A rate-limit response with a larger `Retry-After` wins over the computed delay.
fn backoff_delay_ms(err: &SourceError, attempt: u32, backoff_base_ms: u64) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    match err {
        SourceError::RateLimited { retry_after_secs } if backoff_base_ms > 0 => {
            jittered.max(retry_after_secs.saturating_mul(1000).min(MAX_DELAY_MS))
        }
        _ => jittered,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors. With `max_retries = 3` the operation runs at most four
/// times. Non-retriable errors are returned without sleeping.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = backoff_delay_ms(&err, attempt, backoff_base_ms);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "catalog API transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
