//! The retry decision.

use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroU32;

use super::error::InvalidStepState;
use super::policy::RetryPolicy;
use crate::classify::{ErrorCategory, ErrorClassification};

/// Attempt count of one retryable step.
///
/// Owned and persisted by the caller; this crate only reads it. The count
/// includes the initial attempt, so it is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepState {
    attempts: NonZeroU32,
}

impl StepState {
    /// State after the first attempt.
    pub fn first() -> Self {
        Self {
            attempts: NonZeroU32::MIN,
        }
    }

    /// State after `attempts` attempts. Zero is rejected.
    pub fn new(attempts: u32) -> Result<Self, InvalidStepState> {
        NonZeroU32::new(attempts)
            .map(|attempts| Self { attempts })
            .ok_or(InvalidStepState)
    }

    /// Attempts made so far, initial attempt included.
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    /// Retries made so far (the initial attempt is not a retry).
    pub fn retries_made(&self) -> u32 {
        self.attempts.get() - 1
    }

    /// State after one more attempt.
    pub fn next(self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
        }
    }
}

impl Default for StepState {
    fn default() -> Self {
        Self::first()
    }
}

impl TryFrom<u32> for StepState {
    type Error = InvalidStepState;

    fn try_from(attempts: u32) -> Result<Self, Self::Error> {
        Self::new(attempts)
    }
}

/// Why [`should_retry`] decided the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub enum DecisionReason {
    /// `non_retriable_<type>`
    NonRetriable(ErrorCategory),
    /// `max_retries_exceeded`
    MaxRetriesExceeded,
    /// Retrying; carries the classification's reason.
    Retry(String),
}

impl DecisionReason {
    /// Wire form of the reason.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            DecisionReason::NonRetriable(category) => {
                Cow::Owned(format!("non_retriable_{}", category))
            }
            DecisionReason::MaxRetriesExceeded => Cow::Borrowed("max_retries_exceeded"),
            DecisionReason::Retry(reason) => Cow::Borrowed(reason.as_str()),
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<String> for DecisionReason {
    fn from(s: String) -> Self {
        if s == "max_retries_exceeded" {
            return DecisionReason::MaxRetriesExceeded;
        }
        if let Some(category) = s
            .strip_prefix("non_retriable_")
            .and_then(|rest| rest.parse().ok())
        {
            return DecisionReason::NonRetriable(category);
        }
        DecisionReason::Retry(s)
    }
}

impl From<DecisionReason> for String {
    fn from(reason: DecisionReason) -> Self {
        reason.as_str().into_owned()
    }
}

/// Outcome of [`should_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RetryDecision {
    should_retry: bool,
    reason: DecisionReason,
}

impl RetryDecision {
    /// Whether the caller should wait and try again.
    pub fn should_retry(&self) -> bool {
        self.should_retry
    }

    /// Why.
    pub fn reason(&self) -> &DecisionReason {
        &self.reason
    }
}

/// Decide whether a failed step should be retried.
///
/// The classification's own cap takes precedence over the policy's cap;
/// the policy cap only applies when the classification carries none.
///
/// # Examples
///
/// ```rust
/// use tideline::{classify_error, should_retry, RetryPolicy, StepState};
///
/// let network = classify_error("ECONNRESET");
/// let policy = RetryPolicy::standard();
///
/// let decision = should_retry(&network, &StepState::new(3).unwrap(), &policy);
/// assert!(decision.should_retry());
/// assert_eq!(decision.reason().to_string(), "network");
///
/// let decision = should_retry(&network, &StepState::new(4).unwrap(), &policy);
/// assert!(!decision.should_retry());
/// assert_eq!(decision.reason().to_string(), "max_retries_exceeded");
/// ```
pub fn should_retry(
    classification: &ErrorClassification,
    state: &StepState,
    policy: &RetryPolicy,
) -> RetryDecision {
    if !classification.retriable() {
        return RetryDecision {
            should_retry: false,
            reason: DecisionReason::NonRetriable(classification.category()),
        };
    }

    let effective_max = classification
        .max_retries()
        .unwrap_or_else(|| policy.max_retries());

    if state.retries_made() >= effective_max {
        return RetryDecision {
            should_retry: false,
            reason: DecisionReason::MaxRetriesExceeded,
        };
    }

    RetryDecision {
        should_retry: true,
        reason: DecisionReason::Retry(classification.reason().to_string()),
    }
}
