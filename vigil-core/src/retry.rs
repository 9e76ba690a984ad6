//! Bounded exponential backoff for transient upstream errors.

use std::future::Future;

use tracing::debug;

use vigil_types::BackoffConfig;

use crate::error::VigilError;

/// Run `op` up to `cfg.max_attempts` times, sleeping `min(base * 2^n, cap)`
/// between attempts.
///
/// Only transient errors are retried; anything else surfaces immediately.
/// The final transient error surfaces after the last attempt, leaving the
/// caller to record it and resume from scratch on the next task tick.
pub async fn retry_with_backoff<T, F, Fut>(cfg: &BackoffConfig, mut op: F) -> Result<T, VigilError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VigilError>>,
{
    let attempts = cfg.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < attempts => {
                let delay = cfg
                    .base
                    .saturating_mul(2u32.saturating_pow(attempt))
                    .min(cfg.cap);
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
