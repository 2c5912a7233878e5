//! Deadline enforcement for outbound calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout, error::Elapsed};

/// Race `future` against a deadline.
///
/// Dropping the losing future cancels the request.
pub async fn with_deadline<F>(limit: Duration, future: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    timeout(limit, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let result = with_deadline(Duration::from_millis(50), std::future::pending::<()>()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fast_future_passes() {
        let result = with_deadline(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
