//! # Tideline
//!
//! > *"Every tide turns"*
//!
//! Error classification and retry decisions for multi-step research runs.
//!
//! ## Philosophy
//!
//! **Tideline** follows the principle of **pure core, imperative shell**:
//! - **Pure core**: classifying an error, choosing a policy, deciding whether
//!   to retry and computing the backoff are plain functions over plain data
//! - **Shell**: the [`retry::StepRunner`] (feature `async`) waits, re-runs and
//!   honours cancellation
//!
//! ## Quick Example
//!
//! ```rust
//! use tideline::{classify_error, get_retry_policy, should_retry, ErrorCategory, StepState};
//! use std::time::Duration;
//!
//! let classification = classify_error("503 Service Unavailable");
//! assert_eq!(classification.category(), ErrorCategory::ServerError);
//!
//! let policy = get_retry_policy(classification.category());
//! let mut state = StepState::first();
//! let mut waits = Vec::new();
//!
//! while should_retry(&classification, &state, policy).should_retry() {
//!     waits.push(policy.calculate_backoff(state.attempts()));
//!     state = state.next();
//! }
//!
//! // server errors get two retries
//! assert_eq!(waits, vec![Duration::from_millis(1000), Duration::from_millis(2000)]);
//! ```
//!
//! Steps also need stable identifiers so progress can be tracked across
//! retries; see [`step_id`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod classify;
pub mod message;
pub mod retry;
pub mod step_id;
pub mod testing;

// Re-exports
pub use classify::{
    classify_error, ErrorCategory, ErrorClassification, ErrorClassifier, ErrorSource, Priority,
    ProviderError,
};
pub use message::{retry_message, RetryMessage};
pub use retry::{
    calculate_backoff, get_retry_policy, should_retry, Cancelled, DecisionReason, GiveUp,
    InvalidStepState, JitterStrategy, PolicyError, PolicyTable, RetryDecision, RetryPolicy,
    StepFailed, StepState,
};
pub use step_id::{ensure_step_ids, generate_step_id, PlanStep, StepLike};

#[cfg(feature = "async")]
pub use retry::{StepOutcome, StepRunner};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::classify::{classify_error, ErrorCategory, ErrorClassification, ErrorSource};
    pub use crate::retry::{
        calculate_backoff, get_retry_policy, should_retry, RetryDecision, RetryPolicy, StepFailed,
        StepState,
    };
    pub use crate::step_id::{ensure_step_ids, generate_step_id};

    #[cfg(feature = "async")]
    pub use crate::retry::StepRunner;
}
