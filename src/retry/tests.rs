//! Integration tests for retry functionality.

use super::*;
use crate::classify::{classify_error, ErrorCategory, ProviderError};
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Drive the pure core by hand: returns the delays a caller would wait
/// before giving up on an error that never goes away.
fn schedule_for(message: &str) -> (Vec<Duration>, DecisionReason) {
    let classification = classify_error(message);
    let policy = get_retry_policy(classification.category());
    let mut state = StepState::first();
    let mut delays = Vec::new();

    loop {
        let decision = should_retry(&classification, &state, policy);
        if !decision.should_retry() {
            return (delays, decision.reason().clone());
        }
        delays.push(calculate_backoff(state.attempts(), policy));
        state = state.next();
    }
}

#[test]
fn test_rate_limit_schedule() {
    let (delays, reason) = schedule_for("429 Too Many Requests");
    assert_eq!(delays, vec![ms(5000), ms(10_000), ms(20_000)]);
    assert_eq!(reason, DecisionReason::MaxRetriesExceeded);
}

#[test]
fn test_timeout_schedule() {
    let (delays, reason) = schedule_for("Request timed out");
    assert_eq!(delays, vec![ms(2000), ms(3000)]);
    assert_eq!(reason, DecisionReason::MaxRetriesExceeded);
}

#[test]
fn test_network_schedule() {
    let (delays, _) = schedule_for("socket hang up");
    assert_eq!(delays, vec![ms(1000), ms(2000), ms(4000)]);
}

#[test]
fn test_server_error_schedule() {
    let (delays, _) = schedule_for("502 Bad Gateway");
    assert_eq!(delays, vec![ms(1000), ms(2000)]);
}

#[test]
fn test_search_failed_schedule() {
    let (delays, _) = schedule_for("No search results for query");
    assert_eq!(delays, vec![ms(1000), ms(2000)]);
}

#[test]
fn test_unknown_retries_once() {
    let (delays, reason) = schedule_for("the flux capacitor overheated");
    assert_eq!(delays, vec![ms(1000)]);
    assert_eq!(reason, DecisionReason::MaxRetriesExceeded);
}

#[test]
fn test_permanent_schedule_is_empty() {
    let (delays, reason) = schedule_for("Invalid API key provided");
    assert!(delays.is_empty());
    assert_eq!(reason, DecisionReason::NonRetriable(ErrorCategory::Permanent));
}

#[test]
fn test_structured_status_drives_policy() {
    let error = ProviderError::new("upstream said no").with_status(429);
    let classification = classify_error(&error);
    let policy = get_retry_policy(classification.category());
    assert_eq!(policy, &RetryPolicy::rate_limited());
}

#[test]
fn test_builtin_table_matches_lookup() {
    for category in ErrorCategory::ALL {
        assert_eq!(
            PolicyTable::builtin().policy_for(category),
            get_retry_policy(category)
        );
    }
}

#[test]
fn test_all_builtin_policies_are_valid() {
    assert!(PolicyTable::builtin().validate().is_ok());
    for category in ErrorCategory::ALL {
        assert!(get_retry_policy(category).validate().is_ok());
    }
}

#[test]
fn test_give_up_display_matches_decision_reason() {
    assert_eq!(
        GiveUp::NonRetriable(ErrorCategory::Permanent).to_string(),
        DecisionReason::NonRetriable(ErrorCategory::Permanent).to_string()
    );
    assert_eq!(
        GiveUp::MaxRetriesExceeded.to_string(),
        DecisionReason::MaxRetriesExceeded.to_string()
    );
}

#[cfg(feature = "jitter")]
#[test]
fn test_jitter_stays_within_cap() {
    let policy = RetryPolicy::rate_limited().with_full_jitter();
    let mut prev = None;
    for attempt in 1..10 {
        let d = policy.backoff_with_jitter(attempt, prev);
        assert!(d <= policy.max_delay());
        prev = Some(d);
    }
    // calculate_backoff ignores jitter entirely
    assert_eq!(policy.calculate_backoff(1), ms(5000));
}

#[cfg(feature = "proptest")]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn policy_strategy() -> impl Strategy<Value = RetryPolicy> {
        (1u64..10_000, 1u64..20, 1.0f64..4.0).prop_map(|(base, cap_factor, multiplier)| {
            RetryPolicy::exponential(Duration::from_millis(base))
                .with_max_delay(Duration::from_millis(base * cap_factor))
                .with_multiplier(multiplier)
        })
    }

    proptest! {
        #[test]
        fn backoff_never_exceeds_cap(policy in policy_strategy(), attempt in 1u32..200) {
            prop_assert!(policy.calculate_backoff(attempt) <= policy.max_delay());
        }

        #[test]
        fn backoff_is_monotonic(policy in policy_strategy(), attempt in 1u32..100) {
            prop_assert!(
                policy.calculate_backoff(attempt) <= policy.calculate_backoff(attempt + 1)
            );
        }

        #[test]
        fn first_backoff_is_base(policy in policy_strategy()) {
            prop_assert_eq!(policy.calculate_backoff(1), policy.base_delay());
        }

        #[test]
        fn backoff_is_pure(policy in policy_strategy(), attempt in 1u32..50) {
            prop_assert_eq!(
                policy.calculate_backoff(attempt),
                policy.calculate_backoff(attempt)
            );
        }

        #[test]
        fn non_retriable_never_retries(state in any::<StepState>(), max in 0u32..50) {
            let c = classify_error("403 Forbidden");
            let policy = RetryPolicy::standard().with_max_retries(max);
            let d = should_retry(&c, &state, &policy);
            prop_assert!(!d.should_retry());
            prop_assert_eq!(d.reason().to_string(), "non_retriable_permanent");
        }

        #[test]
        fn retries_stop_exactly_at_cap(category in any::<ErrorCategory>(), state in any::<StepState>()) {
            let c = crate::classify::ErrorClassification::for_category(category, "x");
            let d = should_retry(&c, &state, &RetryPolicy::standard());
            let expected = category.is_retriable() && state.retries_made() < category.max_retries();
            prop_assert_eq!(d.should_retry(), expected);
        }
    }
}
