//! Testing utilities and failure injection for Tideline
//!
//! This module lets test suites (and manual QA) force specific steps and
//! attempts to fail deterministically, so the retry engine can be exercised
//! without waiting for a real provider to misbehave. It also provides
//! assertion macros for retry decisions and, behind the `proptest` feature,
//! strategies for property-based tests.
//!
//! # Examples
//!
//! ## Failure injection
//!
//! ```rust
//! use tideline::testing::{should_inject_failure, TestConfig};
//!
//! // Step 1 fails on its first two attempts, then succeeds.
//! let config = TestConfig::fail_step(1).with_fail_attempts(2);
//!
//! assert!(should_inject_failure(1, 1, &config));
//! assert!(should_inject_failure(1, 2, &config));
//! assert!(!should_inject_failure(1, 3, &config));
//! assert!(!should_inject_failure(0, 1, &config));
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use tideline::{assert_gives_up, assert_should_retry};
//! use tideline::{classify_error, should_retry, RetryPolicy, StepState};
//!
//! let policy = RetryPolicy::standard();
//! let decision = should_retry(&classify_error("ECONNRESET"), &StepState::first(), &policy);
//! assert_should_retry!(decision);
//!
//! let decision = should_retry(&classify_error("403 Forbidden"), &StepState::first(), &policy);
//! assert_gives_up!(decision, "non_retriable_permanent");
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::classify::{ErrorCategory, ErrorSource};

/// Failure-injection switches.
///
/// Production code builds the default (disabled) config, in which case
/// [`should_inject_failure`] returns `false` without looking at anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct TestConfig {
    /// Master switch.
    pub enabled: bool,
    /// Restrict injection to this step index.
    pub fail_at_step: Option<usize>,
    /// Fail only the first N attempts; `None` fails every attempt.
    pub fail_attempts: Option<u32>,
    /// Category of the injected error.
    pub error_type: ErrorCategory,
}

impl TestConfig {
    /// Disabled harness.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            fail_at_step: None,
            fail_attempts: None,
            error_type: ErrorCategory::Network,
        }
    }

    /// Fail every attempt of every step.
    pub fn fail_all() -> Self {
        Self {
            enabled: true,
            ..Self::disabled()
        }
    }

    /// Fail every attempt of one step.
    pub fn fail_step(step_index: usize) -> Self {
        Self {
            enabled: true,
            fail_at_step: Some(step_index),
            ..Self::disabled()
        }
    }

    /// Fail only the first `n` attempts.
    pub fn with_fail_attempts(mut self, n: u32) -> Self {
        self.fail_attempts = Some(n);
        self
    }

    /// Choose the category of injected errors.
    pub fn with_error_type(mut self, category: ErrorCategory) -> Self {
        self.error_type = category;
        self
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Whether attempt `attempt_number` (1-based) of step `step_index` should be
/// forced to fail.
pub fn should_inject_failure(step_index: usize, attempt_number: u32, config: &TestConfig) -> bool {
    if !config.enabled {
        return false;
    }
    if let Some(target) = config.fail_at_step {
        if target != step_index {
            return false;
        }
    }
    match config.fail_attempts {
        Some(n) => attempt_number <= n,
        None => true,
    }
}

/// A canned error whose message matches exactly one category's patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedFailure {
    category: ErrorCategory,
    message: &'static str,
}

impl InjectedFailure {
    /// Canned failure for `category`. Categories without a template
    /// (`unknown`) get the network template.
    pub fn new(category: ErrorCategory) -> Self {
        let (category, message) = match category {
            ErrorCategory::Permanent => (category, "401 Unauthorized: Simulated invalid API key"),
            ErrorCategory::Timeout => (category, "ETIMEDOUT: Simulated request timeout"),
            ErrorCategory::RateLimit => (category, "429 Too Many Requests: Simulated rate limit"),
            ErrorCategory::SearchFailed => {
                (category, "Search failed: Simulated empty search results")
            }
            ErrorCategory::ServerError => {
                (category, "503 Service Unavailable: Simulated server error")
            }
            ErrorCategory::Network | ErrorCategory::Unknown => (
                ErrorCategory::Network,
                "ECONNRESET: Simulated network failure",
            ),
        };
        Self { category, message }
    }

    /// The category this failure was built to trigger.
    pub fn category(&self) -> ErrorCategory {
        self.category
    }
}

impl fmt::Display for InjectedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for InjectedFailure {}

impl ErrorSource for InjectedFailure {
    // Message only: injected failures must go through pattern matching.
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.message)
    }
}

/// Canned failure for a category given by wire name; unrecognised names get
/// the network template.
pub fn create_test_error(error_type: &str) -> InjectedFailure {
    let category = error_type.parse().unwrap_or(ErrorCategory::Network);
    InjectedFailure::new(category)
}

/// Assert that a retry decision says to retry.
///
/// # Example
///
/// ```rust
/// use tideline::{assert_should_retry, classify_error, should_retry, RetryPolicy, StepState};
///
/// let d = should_retry(&classify_error("503"), &StepState::first(), &RetryPolicy::standard());
/// assert_should_retry!(d);
/// ```
#[macro_export]
macro_rules! assert_should_retry {
    ($decision:expr) => {{
        let decision = &$decision;
        if !decision.should_retry() {
            panic!("Expected retry, got give-up: {}", decision.reason());
        }
    }};
}

/// Assert that a retry decision gives up, optionally with a specific reason.
///
/// # Example
///
/// ```rust
/// use tideline::{assert_gives_up, classify_error, should_retry, RetryPolicy, StepState};
///
/// let d = should_retry(
///     &classify_error("503"),
///     &StepState::new(3).unwrap(),
///     &RetryPolicy::standard(),
/// );
/// assert_gives_up!(d, "max_retries_exceeded");
/// ```
#[macro_export]
macro_rules! assert_gives_up {
    ($decision:expr) => {{
        let decision = &$decision;
        if decision.should_retry() {
            panic!("Expected give-up, got retry: {}", decision.reason());
        }
    }};
    ($decision:expr, $reason:expr) => {{
        let decision = &$decision;
        if decision.should_retry() {
            panic!(
                "Expected give-up with {:?}, got retry: {}",
                $reason,
                decision.reason()
            );
        }
        assert_eq!(decision.reason().to_string(), $reason);
    }};
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl Arbitrary for ErrorCategory {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        proptest::sample::select(ErrorCategory::ALL.to_vec()).boxed()
    }
}

#[cfg(feature = "proptest")]
impl Arbitrary for crate::retry::StepState {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (1u32..64)
            .prop_filter_map("attempts must be non-zero", |n| {
                crate::retry::StepState::new(n).ok()
            })
            .boxed()
    }
}
