//! Running one plan step under the retry engine.
//!
//! [`StepRunner`] ties the pieces together: it runs an attempt, classifies a
//! failure, asks [`should_retry`] with the category's policy, waits out the
//! backoff and tries again until the step succeeds or gives up.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::decision::{should_retry, DecisionReason, StepState};
use super::delay::{delay, delay_or_cancel};
use super::error::{GiveUp, StepFailed};
use super::table::PolicyTable;
use crate::classify::{ErrorClassification, ErrorClassifier, ErrorSource};
use crate::message::{retry_message, RetryMessage};
use crate::testing::{should_inject_failure, InjectedFailure, TestConfig};

/// Error from a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError<E> {
    /// The step itself failed.
    Step(E),
    /// The failure-injection harness forced a failure.
    Injected(InjectedFailure),
}

impl<E> AttemptError<E> {
    /// The step's own error, if this was not an injected failure.
    pub fn into_step_error(self) -> Option<E> {
        match self {
            AttemptError::Step(e) => Some(e),
            AttemptError::Injected(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Step(e) => write!(f, "{}", e),
            AttemptError::Injected(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AttemptError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Step(e) => Some(e),
            AttemptError::Injected(e) => Some(e),
        }
    }
}

impl<E: ErrorSource> ErrorSource for AttemptError<E> {
    fn message(&self) -> Cow<'_, str> {
        match self {
            AttemptError::Step(e) => e.message(),
            AttemptError::Injected(e) => e.message(),
        }
    }

    fn status_code(&self) -> Option<u16> {
        match self {
            AttemptError::Step(e) => e.status_code(),
            AttemptError::Injected(e) => e.status_code(),
        }
    }

    fn error_code(&self) -> Option<&str> {
        match self {
            AttemptError::Step(e) => e.error_code(),
            AttemptError::Injected(e) => e.error_code(),
        }
    }
}

/// Information about a failed attempt, passed to hooks.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Position of the step in its plan.
    pub step_index: usize,
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// How the error was classified.
    pub classification: &'a ErrorClassification,
    /// Delay before next attempt; `None` when the step gives up.
    pub next_delay: Option<Duration>,
    /// Status line for the UI; `None` when the step gives up.
    pub message: Option<String>,
    /// Total elapsed time since first attempt.
    pub elapsed: Duration,
}

/// A step that eventually succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome<T> {
    /// The step's result.
    pub value: T,
    /// Attempts it took (initial + retries).
    pub attempts: u32,
    /// Total time spent, waits included.
    pub elapsed: Duration,
}

impl<T> StepOutcome<T> {
    /// Extract the value, discarding metadata.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Runs plan steps with classification-driven retries.
///
/// # Example
///
/// ```rust
/// use tideline::retry::StepRunner;
/// use tideline::ProviderError;
///
/// # tokio_test::block_on(async {
/// let runner = StepRunner::new();
/// let outcome = runner
///     .run(0, |_attempt| async { Ok::<_, ProviderError>("done") })
///     .await
///     .unwrap();
/// assert_eq!(outcome.value, "done");
/// assert_eq!(outcome.attempts, 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct StepRunner {
    policies: PolicyTable,
    classifier: &'static ErrorClassifier,
    injection: TestConfig,
    cancel: Option<CancellationToken>,
}

impl StepRunner {
    /// Runner with the built-in policy table and no injection.
    pub fn new() -> Self {
        Self {
            policies: PolicyTable::default(),
            classifier: ErrorClassifier::global(),
            injection: TestConfig::disabled(),
            cancel: None,
        }
    }

    /// Use a custom policy table.
    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Enable failure injection.
    pub fn with_test_config(mut self, config: TestConfig) -> Self {
        self.injection = config;
        self
    }

    /// Abort waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The policy table in use.
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Run step `step_index` until it succeeds or gives up.
    ///
    /// `attempt` receives the 1-based attempt number and must start the step
    /// from scratch each time.
    pub async fn run<T, E, F, Fut>(
        &self,
        step_index: usize,
        attempt: F,
    ) -> Result<StepOutcome<T>, StepFailed<AttemptError<E>>>
    where
        E: ErrorSource,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_with_hooks(step_index, attempt, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_failure` after every failed
    /// attempt, before any wait.
    ///
    /// The hook is synchronous and should not block; use it for progress
    /// updates, logging or metrics.
    pub async fn run_with_hooks<T, E, F, Fut, H>(
        &self,
        step_index: usize,
        mut attempt: F,
        mut on_failure: H,
    ) -> Result<StepOutcome<T>, StepFailed<AttemptError<E>>>
    where
        E: ErrorSource,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(&RetryEvent<'_, AttemptError<E>>),
    {
        let start = Instant::now();
        let mut state = StepState::first();
        let mut prev_delay: Option<Duration> = None;

        loop {
            let attempt_number = state.attempts();

            let result = if should_inject_failure(step_index, attempt_number, &self.injection) {
                #[cfg(feature = "tracing")]
                tracing::debug!(step_index, attempt = attempt_number, "injecting failure");
                Err(AttemptError::Injected(InjectedFailure::new(
                    self.injection.error_type,
                )))
            } else {
                attempt(attempt_number).await.map_err(AttemptError::Step)
            };

            let error = match result {
                Ok(value) => {
                    return Ok(StepOutcome {
                        value,
                        attempts: attempt_number,
                        elapsed: start.elapsed(),
                    });
                }
                Err(error) => error,
            };

            let classification = self.classifier.classify(&error);
            let policy = self.policies.policy_for(classification.category());
            let decision = should_retry(&classification, &state, policy);

            if !decision.should_retry() {
                let reason = match decision.reason() {
                    DecisionReason::NonRetriable(category) => GiveUp::NonRetriable(*category),
                    _ => GiveUp::MaxRetriesExceeded,
                };

                on_failure(&RetryEvent {
                    step_index,
                    attempt: attempt_number,
                    error: &error,
                    classification: &classification,
                    next_delay: None,
                    message: None,
                    elapsed: start.elapsed(),
                });

                #[cfg(feature = "tracing")]
                tracing::info!(
                    step_index,
                    attempts = attempt_number,
                    category = %classification.category(),
                    reason = %reason,
                    "step gave up"
                );

                return Err(StepFailed::new(
                    error,
                    classification,
                    reason,
                    attempt_number,
                    start.elapsed(),
                ));
            }

            let wait = policy.backoff_with_jitter(attempt_number, prev_delay);
            let max_retries = classification
                .max_retries()
                .unwrap_or_else(|| policy.max_retries());

            on_failure(&RetryEvent {
                step_index,
                attempt: attempt_number,
                error: &error,
                classification: &classification,
                next_delay: Some(wait),
                message: Some(retry_message(RetryMessage {
                    attempt: state.retries_made() + 1,
                    max_attempts: max_retries,
                    error_type: classification.category().as_str(),
                })),
                elapsed: start.elapsed(),
            });

            #[cfg(feature = "tracing")]
            tracing::warn!(
                step_index,
                attempt = attempt_number,
                category = %classification.category(),
                delay_ms = wait.as_millis() as u64,
                "step failed, retrying"
            );

            match &self.cancel {
                Some(token) => {
                    if delay_or_cancel(wait, token).await.is_err() {
                        #[cfg(feature = "tracing")]
                        tracing::info!(step_index, attempts = attempt_number, "step cancelled");
                        return Err(StepFailed::new(
                            error,
                            classification,
                            GiveUp::Cancelled,
                            attempt_number,
                            start.elapsed(),
                        ));
                    }
                }
                None => delay(wait).await,
            }

            prev_delay = Some(wait);
            state = state.next();
        }
    }
}

impl Default for StepRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ErrorCategory, ProviderError};
    use crate::retry::RetryPolicy;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let outcome = StepRunner::new()
            .run(0, |_| async { Ok::<_, ProviderError>(42) })
            .await
            .unwrap();
        assert_eq!(outcome.value, 42);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let outcome = StepRunner::new()
            .run(0, |_| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ProviderError::new("ECONNRESET"))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1000ms + 2000ms of backoff under the default policy
        assert_eq!(outcome.elapsed, ms(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let failed = StepRunner::new()
            .run(0, |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ProviderError::new("Invalid API key"))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.reason, GiveUp::NonRetriable(ErrorCategory::Permanent));
        assert!(failed.is_permanent());
        assert!(failed.to_string().contains("non_retriable_permanent"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_schedule_and_exhaustion() {
        let mut delays = Vec::new();
        let failed = StepRunner::new()
            .with_test_config(TestConfig::fail_all().with_error_type(ErrorCategory::RateLimit))
            .run_with_hooks(
                0,
                |_| async { Ok::<_, ProviderError>(()) },
                |event| delays.push(event.next_delay),
            )
            .await
            .unwrap_err();

        assert_eq!(
            delays,
            vec![Some(ms(5000)), Some(ms(10_000)), Some(ms(20_000)), None]
        );
        assert_eq!(failed.attempts, 4);
        assert_eq!(failed.reason, GiveUp::MaxRetriesExceeded);
        assert_eq!(failed.classification.category(), ErrorCategory::RateLimit);
        assert!(matches!(failed.final_error, AttemptError::Injected(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_injection_scoped_to_step_and_attempts() {
        let runner = StepRunner::new()
            .with_test_config(TestConfig::fail_step(1).with_fail_attempts(2));

        let other = runner
            .run(0, |_| async { Ok::<_, ProviderError>("untouched") })
            .await
            .unwrap();
        assert_eq!(other.attempts, 1);

        let target = runner
            .run(1, |_| async { Ok::<_, ProviderError>("recovered") })
            .await
            .unwrap();
        assert_eq!(target.attempts, 3);
        assert_eq!(target.value, "recovered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_number_is_passed_to_closure() {
        let mut seen = Vec::new();
        let _ = StepRunner::new()
            .run(0, |n| {
                seen.push(n);
                async { Err::<(), _>(ProviderError::new("mystery")) }
            })
            .await;
        // unknown: one retry
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_receives_status_lines() {
        let mut lines = Vec::new();
        let _ = StepRunner::new()
            .run_with_hooks(
                2,
                |_| async { Err::<(), _>(ProviderError::new("request failed").with_status(503)) },
                |event| {
                    assert_eq!(event.step_index, 2);
                    lines.push(event.message.clone());
                },
            )
            .await;
        assert_eq!(
            lines,
            vec![
                Some("Server temporarily unavailable, retrying (1/2)...".to_string()),
                Some("Server temporarily unavailable, retrying (2/2)...".to_string()),
                None,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy_table() {
        let table = PolicyTable::new(RetryPolicy::exponential(ms(10)).with_max_delay(ms(15)));
        let failed = StepRunner::new()
            .with_policies(table)
            .run(0, |_| async { Err::<(), _>(ProviderError::new("ECONNRESET")) })
            .await
            .unwrap_err();
        assert_eq!(failed.attempts, 4);
        // 10 + 15 + 15
        assert_eq!(failed.total_duration, ms(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_waiting() {
        let token = CancellationToken::new();
        let runner = StepRunner::new().with_cancellation(token.clone());

        let handle = tokio::spawn(async move {
            runner
                .run(0, |_| async { Err::<(), _>(ProviderError::new("429")) })
                .await
        });
        tokio::time::sleep(ms(100)).await;
        token.cancel();

        let failed = handle.await.unwrap().unwrap_err();
        assert_eq!(failed.reason, GiveUp::Cancelled);
        assert_eq!(failed.attempts, 1);
        assert!(failed.total_duration < ms(5000));
    }

    #[cfg(feature = "tracing")]
    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn test_logs_retries_and_give_up() {
        let _ = StepRunner::new()
            .run(4, |_| async { Err::<(), _>(ProviderError::new("search returned no results")) })
            .await;
        assert!(logs_contain("step failed, retrying"));
        assert!(logs_contain("category=search_failed"));
        assert!(logs_contain("step gave up"));
        assert!(logs_contain("reason=max_retries_exceeded"));
    }
}
