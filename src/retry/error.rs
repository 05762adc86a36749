//! Error types for retry operations.

use std::fmt;
use std::time::Duration;

use crate::classify::{ErrorCategory, ErrorClassification};

/// Why a step stopped retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUp {
    /// The classification forbids retrying.
    NonRetriable(ErrorCategory),
    /// The retry budget for the category is spent.
    MaxRetriesExceeded,
    /// The run was cancelled while waiting to retry.
    Cancelled,
}

impl fmt::Display for GiveUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GiveUp::NonRetriable(category) => write!(f, "non_retriable_{}", category),
            GiveUp::MaxRetriesExceeded => f.write_str("max_retries_exceeded"),
            GiveUp::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Error returned when a step stops retrying.
///
/// Contains the error from the final attempt along with its classification
/// and metadata about the retry sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailed<E> {
    /// The error from the final attempt.
    pub final_error: E,
    /// Classification of the final error.
    pub classification: ErrorClassification,
    /// Why retrying stopped.
    pub reason: GiveUp,
    /// Total number of attempts made (initial + retries).
    pub attempts: u32,
    /// Total time spent on the step, waits included.
    pub total_duration: Duration,
}

impl<E> StepFailed<E> {
    /// Create a new StepFailed error.
    pub fn new(
        final_error: E,
        classification: ErrorClassification,
        reason: GiveUp,
        attempts: u32,
        total_duration: Duration,
    ) -> Self {
        Self {
            final_error,
            classification,
            reason,
            attempts,
            total_duration,
        }
    }

    /// Extract the final error, discarding metadata.
    pub fn into_error(self) -> E {
        self.final_error
    }

    /// Get a reference to the final error.
    pub fn error(&self) -> &E {
        &self.final_error
    }

    /// Whether the user must see this immediately (e.g. a bad API key).
    pub fn is_permanent(&self) -> bool {
        matches!(self.reason, GiveUp::NonRetriable(_))
    }
}

impl<E: fmt::Display> fmt::Display for StepFailed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step gave up after {} attempts ({}, {:?}): {}",
            self.attempts, self.reason, self.total_duration, self.final_error
        )
    }
}

impl<E: std::error::Error + 'static> std::error::Error for StepFailed<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.final_error)
    }
}

/// Returned when a cancellable wait is aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("wait cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Returned by [`StepState::new`](super::StepState::new) for a zero attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidStepState;

impl fmt::Display for InvalidStepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("step state must count at least one attempt")
    }
}

impl std::error::Error for InvalidStepState {}

/// A retry policy that violates its invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Multiplier below 1 or not finite.
    InvalidMultiplier(f64),
    /// Proportional jitter factor outside `0..=1` or not finite.
    InvalidJitter(f64),
    /// Base delay larger than the cap.
    BaseExceedsCap {
        /// Configured base delay.
        base_delay: Duration,
        /// Configured cap.
        max_delay: Duration,
    },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::InvalidMultiplier(m) => {
                write!(f, "backoff multiplier must be finite and >= 1, got {}", m)
            }
            PolicyError::InvalidJitter(factor) => {
                write!(f, "jitter factor must be between 0 and 1, got {}", factor)
            }
            PolicyError::BaseExceedsCap {
                base_delay,
                max_delay,
            } => write!(
                f,
                "base delay {:?} exceeds max delay {:?}",
                base_delay, max_delay
            ),
        }
    }
}

impl std::error::Error for PolicyError {}
