//! Timeout enforcement.
//!
//! Thin wrapper over Tokio's timer that gives timeouts their own error type,
//! so callers can tell a silent peer apart from a failing socket.

use std::future::Future;
use std::time::Duration;

/// The deadline passed before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Run `future` with a deadline of `limit`.
pub async fn with_timeout<F>(limit: Duration, future: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| TimedOut(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_deadline() {
        let value = with_timeout(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn reports_the_limit_on_timeout() {
        let limit = Duration::from_millis(20);
        let result = with_timeout(limit, tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(result, Err(TimedOut(limit)));
    }
}
