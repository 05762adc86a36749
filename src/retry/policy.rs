//! Retry policy types and configuration.

use std::time::Duration;

use super::error::PolicyError;

/// A retry policy describing how long to wait between attempts.
///
/// Policies are pure data - they describe retry behavior but don't execute it.
/// This makes them easy to test, clone, and inspect. They are loaded once and
/// never mutated while steps run.
///
/// Delay for the n-th retry (1-based) is
/// `base_delay * backoff_multiplier^(n - 1)`, capped at `max_delay`.
///
/// # Examples
///
/// ```rust
/// use tideline::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(1000))
///     .with_max_retries(3)
///     .with_max_delay(Duration::from_millis(8000));
///
/// assert_eq!(policy.calculate_backoff(1), Duration::from_millis(1000));
/// assert_eq!(policy.calculate_backoff(4), Duration::from_millis(8000));
/// assert_eq!(policy.calculate_backoff(5), Duration::from_millis(8000)); // capped
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "PolicyConfig", into = "PolicyConfig")
)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
    jitter: JitterStrategy,
}

/// Strategy for adding randomness to delays.
///
/// Only [`RetryPolicy::backoff_with_jitter`] applies it;
/// [`RetryPolicy::calculate_backoff`] stays deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum JitterStrategy {
    /// No jitter applied.
    #[default]
    None,
    /// Add ±percentage randomness to delay.
    Proportional(f64),
    /// Random delay between 0 and calculated delay (AWS recommended).
    Full,
    /// Decorrelated jitter (AWS style).
    Decorrelated,
}

impl RetryPolicy {
    /// Default policy: 3 retries, 1s base, 8s cap, doubling.
    pub fn standard() -> Self {
        Self::exponential(Duration::from_millis(1000))
            .with_max_retries(3)
            .with_max_delay(Duration::from_millis(8000))
    }

    /// Rate-limit policy: 5s base, 30s cap, doubling.
    ///
    /// Providers usually want multi-second cool-downs before they accept
    /// traffic again.
    pub fn rate_limited() -> Self {
        Self::exponential(Duration::from_millis(5000))
            .with_max_retries(3)
            .with_max_delay(Duration::from_millis(30_000))
    }

    /// Timeout policy: 2s base, 6s cap, multiplier 1.5.
    pub fn timed_out() -> Self {
        Self::exponential(Duration::from_millis(2000))
            .with_max_retries(3)
            .with_max_delay(Duration::from_millis(6000))
            .with_multiplier(1.5)
    }

    /// Create a doubling policy from a base delay.
    ///
    /// Starts with 3 retries and a cap of `8 * base`.
    pub fn exponential(base: Duration) -> Self {
        Self {
            max_retries: 3,
            base_delay: base,
            max_delay: base.saturating_mul(8),
            backoff_multiplier: 2.0,
            jitter: JitterStrategy::None,
        }
    }

    /// Set the maximum number of retry attempts.
    ///
    /// This does not include the initial attempt. For example, `max_retries(3)`
    /// means up to 4 total attempts (1 initial + 3 retries).
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the maximum delay cap.
    ///
    /// Delays will never exceed this value, with or without jitter.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    /// Set the base delay used for the first retry.
    pub fn with_base_delay(mut self, d: Duration) -> Self {
        self.base_delay = d;
        self
    }

    /// Set the growth factor between consecutive retries.
    ///
    /// Must be finite and at least 1; see [`RetryPolicy::validate`].
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Add proportional jitter to delays.
    ///
    /// The factor determines the range of randomness. For example, `0.25` means
    /// the actual delay will be ±25% of the calculated delay.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, this method does nothing.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = JitterStrategy::Proportional(factor.clamp(0.0, 1.0));
        self
    }

    /// Use full jitter (AWS recommended).
    ///
    /// **Note**: Requires the `jitter` feature. Without it, this method does nothing.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Use decorrelated jitter (AWS style).
    ///
    /// **Note**: Requires the `jitter` feature. Without it, this method does nothing.
    pub fn with_decorrelated_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Decorrelated;
        self
    }

    /// Get the maximum number of retries.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Get the base delay.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Get the backoff multiplier.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Get the jitter strategy.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// Pure and deterministic: no jitter is applied here. `attempt = 0` is
    /// treated like the first retry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tideline::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::timed_out();
    /// assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2000));
    /// assert_eq!(policy.calculate_backoff(2), Duration::from_millis(3000));
    /// assert_eq!(policy.calculate_backoff(3), Duration::from_millis(4500));
    /// assert_eq!(policy.calculate_backoff(4), Duration::from_millis(6000)); // capped
    /// ```
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.powi(exponent);
        let raw_nanos = self.base_delay.as_nanos() as f64 * factor;
        let cap_nanos = self.max_delay.as_nanos() as f64;

        if !raw_nanos.is_finite() || raw_nanos >= cap_nanos {
            return self.max_delay;
        }
        Duration::from_nanos(raw_nanos.round() as u64).min(self.max_delay)
    }

    /// Delay before retry `attempt` with the policy's jitter applied.
    ///
    /// `prev_delay` feeds decorrelated jitter; pass the delay actually waited
    /// before the previous retry.
    pub fn backoff_with_jitter(&self, attempt: u32, prev_delay: Option<Duration>) -> Duration {
        let base_delay = self.calculate_backoff(attempt);
        self.jitter.apply(base_delay, prev_delay, self.max_delay)
    }

    /// Check the policy's invariants.
    ///
    /// The multiplier must be finite and `>= 1`, the base delay must not
    /// exceed the cap, and a proportional jitter factor must lie in `0..=1`.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(PolicyError::InvalidMultiplier(self.backoff_multiplier));
        }
        if let JitterStrategy::Proportional(factor) = self.jitter {
            if !(0.0..=1.0).contains(&factor) {
                return Err(PolicyError::InvalidJitter(factor));
            }
        }
        if self.base_delay > self.max_delay {
            return Err(PolicyError::BaseExceedsCap {
                base_delay: self.base_delay,
                max_delay: self.max_delay,
            });
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Delay before retry `attempt` under `policy`.
///
/// Free-function form of [`RetryPolicy::calculate_backoff`].
pub fn calculate_backoff(attempt: u32, policy: &RetryPolicy) -> Duration {
    policy.calculate_backoff(attempt)
}

impl JitterStrategy {
    /// Apply jitter to a base delay.
    ///
    /// # Arguments
    ///
    /// * `base_delay` - The calculated delay before jitter
    /// * `prev_delay` - The previous delay (for decorrelated jitter)
    /// * `max_delay` - Cap on the final delay
    pub fn apply(
        &self,
        base_delay: Duration,
        #[cfg_attr(not(feature = "jitter"), allow(unused_variables))] prev_delay: Option<Duration>,
        max_delay: Duration,
    ) -> Duration {
        let jittered = match self {
            JitterStrategy::None => base_delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Proportional(factor) => {
                use rand::Rng;
                let mut rng = rand::rng();
                let factor = if factor.is_nan() {
                    0.0
                } else {
                    factor.clamp(0.0, 1.0)
                };
                let base_millis = base_delay.as_millis() as f64;
                let jitter_range = base_millis * factor;
                let min = (base_millis - jitter_range).max(0.0);
                let max = base_millis + jitter_range;
                let jittered_millis = rng.random_range(min..=max);
                Duration::from_millis(jittered_millis as u64)
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Proportional(_) => base_delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Full => {
                use rand::Rng;
                let mut rng = rand::rng();
                let max_millis = base_delay.as_millis() as u64;
                if max_millis == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rng.random_range(0..=max_millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Full => base_delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Decorrelated => {
                use rand::Rng;
                let mut rng = rand::rng();
                let prev = prev_delay.unwrap_or(base_delay);
                let base_millis = base_delay.as_millis() as u64;
                let max_millis = prev.as_millis().saturating_mul(3) as u64;
                if max_millis <= base_millis {
                    base_delay
                } else {
                    Duration::from_millis(rng.random_range(base_millis..=max_millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Decorrelated => base_delay,
        };

        jittered.min(max_delay)
    }
}

/// Wire shape of a policy: delays in whole milliseconds, camelCase keys.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyConfig {
    max_retries: u32,
    base_delay: u64,
    max_delay: u64,
    backoff_multiplier: f64,
    #[serde(default)]
    jitter: JitterStrategy,
}

#[cfg(feature = "serde")]
impl TryFrom<PolicyConfig> for RetryPolicy {
    type Error = PolicyError;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay),
            max_delay: Duration::from_millis(config.max_delay),
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        };
        policy.validate()?;
        Ok(policy)
    }
}

#[cfg(feature = "serde")]
impl From<RetryPolicy> for PolicyConfig {
    fn from(policy: RetryPolicy) -> Self {
        PolicyConfig {
            max_retries: policy.max_retries,
            base_delay: policy.base_delay.as_millis() as u64,
            max_delay: policy.max_delay.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter: policy.jitter,
        }
    }
}
