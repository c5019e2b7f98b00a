//! Retry logic for transient extractor failures
//!
//! The hosting site periodically rotates the player code the extractor has to
//! decipher; until the extractor is upgraded every request fails with a
//! "signature" or "nsig" error. Those failures are the only retryable class:
//! before each retry the caller gets a hook (used to upgrade the extractor and
//! emit a warning), then the policy waits a fixed delay.
//!
//! # Example
//!
//! ```no_run
//! use playlist_dl::retry::{IsRetryable, retry_with_policy};
//! use playlist_dl::config::SignatureRetryPolicy;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Signature,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Signature)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let policy = SignatureRetryPolicy::default();
//! retry_with_policy(
//!     &policy,
//!     |_attempt| async { Ok::<_, MyError>(()) },
//!     |_err, _attempt| async {},
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::SignatureRetryPolicy;
use crate::error::{DownloadError, Error};
use rand::Rng;
use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

static SIGNATURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)signature|nsig")
        .expect("static regex is valid")
});

/// Whether an extractor message belongs to the signature/nsig failure class
pub fn is_signature_message(message: &str) -> bool {
    SIGNATURE_PATTERN.is_match(message)
}

/// Trait for errors that can be classified as retryable or not
///
/// Only signature/nsig extraction failures are retryable. Unavailable videos,
/// geo blocks, missing files and tool failures are permanent.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for DownloadError {
    fn is_retryable(&self) -> bool {
        self.is_signature_error()
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Download(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Execute an async operation under a [`SignatureRetryPolicy`]
///
/// `operation` receives the 1-based attempt number. When it fails with a
/// retryable error and attempts remain, `before_retry` is awaited with the
/// error and the number of the attempt about to start, then the policy delay
/// elapses. Non-retryable errors are returned immediately.
///
/// # Returns
///
/// The successful result or the last error once `max_attempts` is exhausted.
pub async fn retry_with_policy<F, Fut, T, E, H, HFut>(
    policy: &SignatureRetryPolicy,
    mut operation: F,
    mut before_retry: H,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    H: FnMut(&E, u32) -> HFut,
    HFut: Future<Output = ()>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    "signature error, retrying"
                );

                attempt += 1;
                before_retry(&e, attempt).await;

                let delay = if policy.jitter {
                    add_jitter(policy.delay)
                } else {
                    policy.delay
                };
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay so parallel workers do not retry in lockstep
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
