//! Retry decisions and backoff for plan steps.
//!
//! This module follows a "pure core, imperative shell" split:
//!
//! - **Pure Core**: [`RetryPolicy`], [`PolicyTable`] and [`should_retry`] are
//!   plain data and functions. No clocks, no I/O, trivially testable.
//! - **Shell**: [`delay`], [`delay_or_cancel`] and [`StepRunner`] (behind the
//!   `async` feature) do the actual waiting and re-running.
//!
//! # Quick Start
//!
//! ```rust
//! use tideline::{classify_error, get_retry_policy, should_retry, StepState};
//! use std::time::Duration;
//!
//! let classification = classify_error("429 Too Many Requests");
//! let policy = get_retry_policy(classification.category());
//! let state = StepState::first();
//!
//! let decision = should_retry(&classification, &state, policy);
//! assert!(decision.should_retry());
//! assert_eq!(policy.calculate_backoff(state.attempts()), Duration::from_millis(5000));
//! ```
//!
//! # Policies
//!
//! | Category       | Base   | Cap     | Multiplier |
//! |----------------|--------|---------|------------|
//! | `rate_limit`   | 5000ms | 30000ms | 2.0        |
//! | `timeout`      | 2000ms | 6000ms  | 1.5        |
//! | everything else| 1000ms | 8000ms  | 2.0        |
//!
//! # Jitter Support
//!
//! Jitter adds randomness to delays to prevent thundering herd problems.
//! Enable the `jitter` feature to use jitter:
//!
//! ```toml
//! tideline = { version = "...", features = ["jitter"] }
//! ```
//!
//! ```rust,ignore
//! use tideline::RetryPolicy;
//!
//! // Add ±25% randomness to delays
//! let policy = RetryPolicy::standard().with_jitter(0.25);
//! ```
//!
//! # Error Types
//!
//! - [`StepFailed`]: Returned when a step gives up, with the final error and metadata
//! - [`PolicyError`]: A policy whose numbers cannot work
//! - [`InvalidStepState`]: A step state claiming zero attempts
//! - [`Cancelled`]: A cancellable wait was aborted

mod decision;
mod error;
mod policy;
mod table;

#[cfg(feature = "async")]
mod delay;
#[cfg(feature = "async")]
mod executor;

pub use decision::{should_retry, DecisionReason, RetryDecision, StepState};
pub use error::{Cancelled, GiveUp, InvalidStepState, PolicyError, StepFailed};
pub use policy::{calculate_backoff, JitterStrategy, RetryPolicy};
pub use table::{get_retry_policy, PolicyTable};

#[cfg(feature = "async")]
pub use delay::{delay, delay_or_cancel};
#[cfg(feature = "async")]
pub use executor::{AttemptError, RetryEvent, StepOutcome, StepRunner};

#[cfg(test)]
mod tests;
