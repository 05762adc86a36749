//! Per-category policy lookup.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::error::PolicyError;
use super::policy::RetryPolicy;
use crate::classify::ErrorCategory;

/// A default policy plus overrides keyed by error category.
///
/// [`PolicyTable::default`] is the built-in table: the standard policy with
/// slower-starting overrides for `rate_limit` and `timeout`.
///
/// # Examples
///
/// ```rust
/// use tideline::{ErrorCategory, PolicyTable, RetryPolicy};
/// use std::time::Duration;
///
/// let table = PolicyTable::new(RetryPolicy::standard()).with_override(
///     ErrorCategory::ServerError,
///     RetryPolicy::exponential(Duration::from_millis(3000)),
/// );
///
/// assert_eq!(
///     table.policy_for(ErrorCategory::ServerError).base_delay(),
///     Duration::from_millis(3000)
/// );
/// // No override registered: falls back to the default policy.
/// assert_eq!(table.policy_for(ErrorCategory::Network), &RetryPolicy::standard());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolicyTable {
    default: RetryPolicy,
    #[cfg_attr(feature = "serde", serde(default))]
    overrides: HashMap<ErrorCategory, RetryPolicy>,
}

impl PolicyTable {
    /// A table with no overrides.
    pub fn new(default: RetryPolicy) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// The built-in table, shared process-wide.
    pub fn builtin() -> &'static PolicyTable {
        static BUILTIN: OnceLock<PolicyTable> = OnceLock::new();
        BUILTIN.get_or_init(PolicyTable::default)
    }

    /// Register (or replace) the policy used for `category`.
    pub fn with_override(mut self, category: ErrorCategory, policy: RetryPolicy) -> Self {
        self.overrides.insert(category, policy);
        self
    }

    /// The fallback policy.
    pub fn default_policy(&self) -> &RetryPolicy {
        &self.default
    }

    /// Policy for `category`: its override if one exists, else the default.
    pub fn policy_for(&self, category: ErrorCategory) -> &RetryPolicy {
        self.overrides.get(&category).unwrap_or(&self.default)
    }

    /// Policy for a category given by wire name. Unrecognised names get the
    /// default policy.
    pub fn policy_for_name(&self, error_type: &str) -> &RetryPolicy {
        match error_type.parse() {
            Ok(category) => self.policy_for(category),
            Err(_) => &self.default,
        }
    }

    /// Validate every policy in the table.
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.default.validate()?;
        self.overrides.values().try_for_each(RetryPolicy::validate)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        PolicyTable::new(RetryPolicy::standard())
            .with_override(ErrorCategory::RateLimit, RetryPolicy::rate_limited())
            .with_override(ErrorCategory::Timeout, RetryPolicy::timed_out())
    }
}

/// Built-in policy for `category`.
///
/// # Examples
///
/// ```rust
/// use tideline::{get_retry_policy, ErrorCategory};
/// use std::time::Duration;
///
/// let p = get_retry_policy(ErrorCategory::RateLimit);
/// assert_eq!(p.base_delay(), Duration::from_millis(5000));
/// assert_eq!(p.max_delay(), Duration::from_millis(30_000));
///
/// let p = get_retry_policy(ErrorCategory::Network);
/// assert_eq!(p.base_delay(), Duration::from_millis(1000));
/// ```
pub fn get_retry_policy(category: ErrorCategory) -> &'static RetryPolicy {
    PolicyTable::builtin().policy_for(category)
}
