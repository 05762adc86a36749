//! Waiting between attempts.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::error::Cancelled;

/// Suspend the current task for `duration`.
///
/// # Example
///
/// ```rust
/// use tideline::retry::delay;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// delay(Duration::from_millis(1)).await;
/// # });
/// ```
pub async fn delay(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Suspend for `duration` unless `token` is cancelled first.
///
/// Resolves with `Err(Cancelled)` as soon as the token fires, so an
/// orchestrator can abandon a step the user no longer cares about. A token
/// that is already cancelled wins over a zero-length wait.
pub async fn delay_or_cancel(
    duration: Duration,
    token: &CancellationToken,
) -> Result<(), Cancelled> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn delay_waits_for_the_duration() {
        let start = Instant::now();
        delay(Duration::from_millis(5000)).await;
        assert!(start.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        assert_eq!(delay_or_cancel(Duration::from_secs(3), &token).await, Ok(()));
    }

    #[tokio::test]
    async fn pre_cancelled_token_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let result = delay_or_cancel(Duration::from_secs(3600), &token).await;
        assert_eq!(result, Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_long_wait() {
        let token = CancellationToken::new();
        let child = token.clone();
        let start = Instant::now();

        let waiter = tokio::spawn(async move {
            delay_or_cancel(Duration::from_secs(3600), &child).await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        assert_eq!(waiter.await.unwrap(), Err(Cancelled));
        assert!(start.elapsed() < Duration::from_secs(3600));
    }
}
