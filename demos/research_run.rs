//! Research Run Example
//!
//! Walks a small research plan through the step runner with failure
//! injection switched on. Shows:
//! - Stable step IDs assigned once, before any step runs
//! - Per-category retry schedules and user-facing status lines
//! - A permanent failure that is surfaced without retrying
//!
//! Delays are scaled down so the run finishes in well under a second.
//!
//! Run with: `cargo run --example research_run --features tracing`

use std::time::Duration;

use tideline::retry::{AttemptError, StepRunner};
use tideline::testing::TestConfig;
use tideline::{ensure_step_ids, ErrorCategory, PlanStep, PolicyTable, ProviderError, RetryPolicy};

fn fast_policies() -> PolicyTable {
    let ms = Duration::from_millis;
    PolicyTable::new(RetryPolicy::exponential(ms(10)).with_max_delay(ms(80)))
        .with_override(
            ErrorCategory::RateLimit,
            RetryPolicy::exponential(ms(50)).with_max_delay(ms(300)),
        )
        .with_override(
            ErrorCategory::Timeout,
            RetryPolicy::exponential(ms(20))
                .with_max_delay(ms(60))
                .with_multiplier(1.5),
        )
}

async fn run_plan(title: &str, runner: &StepRunner, plan: &[PlanStep]) {
    println!("\n=== {} ===", title);

    for (index, step) in plan.iter().enumerate() {
        let id = step.id.as_deref().unwrap_or("?");
        let action = step.action.clone().unwrap_or_default();

        let result = runner
            .run_with_hooks(
                index,
                |attempt| {
                    let action = action.clone();
                    async move {
                        if action.contains("pricing") && attempt == 1 {
                            return Err(ProviderError::new("fetch failed"));
                        }
                        if action.contains("private") {
                            return Err(ProviderError::new("Forbidden").with_status(403));
                        }
                        Ok(format!("notes for '{}'", action))
                    }
                },
                |event| match (&event.message, event.next_delay) {
                    (Some(line), Some(delay)) => {
                        println!("  [{}] {} (waiting {:?})", id, line, delay)
                    }
                    _ => println!("  [{}] giving up: {}", id, event.error),
                },
            )
            .await;

        match result {
            Ok(outcome) => println!(
                "  [{}] ok after {} attempt(s) in {:?}: {}",
                id, outcome.attempts, outcome.elapsed, outcome.value
            ),
            Err(failed) => {
                let origin = match &failed.final_error {
                    AttemptError::Step(_) => "provider",
                    AttemptError::Injected(_) => "injected",
                };
                println!(
                    "  [{}] failed ({}, {} error, permanent: {})",
                    id,
                    failed.reason,
                    origin,
                    failed.is_permanent()
                );
            }
        }
    }
}

#[tokio::main]
async fn main() {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt().with_target(false).init();

    let plan = ensure_step_ids(vec![
        PlanStep::new("Search for background information"),
        PlanStep::new("Compare pricing across providers"),
        PlanStep::new("Read the private analyst report"),
        PlanStep::new("Summarise findings"),
    ]);

    println!("Plan:");
    for step in &plan {
        println!("  {}", step.id.as_deref().unwrap_or("?"));
    }

    let quiet = StepRunner::new().with_policies(fast_policies());
    run_plan("Normal run", &quiet, &plan).await;

    let flaky = StepRunner::new().with_policies(fast_policies()).with_test_config(
        TestConfig::fail_step(0)
            .with_fail_attempts(2)
            .with_error_type(ErrorCategory::RateLimit),
    );
    run_plan("Injected rate limits on step 0", &flaky, &plan).await;

    let broken = StepRunner::new()
        .with_policies(fast_policies())
        .with_test_config(TestConfig::fail_all().with_error_type(ErrorCategory::Timeout));
    run_plan("Every attempt times out", &broken, &plan).await;
}
