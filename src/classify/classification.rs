//! The classifier's output value.

use super::category::{ErrorCategory, Priority};

/// Structured verdict on a single error.
///
/// Created fresh per error and never mutated afterwards; the builder methods
/// consume `self` and return a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ErrorClassification {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    category: ErrorCategory,
    retriable: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    max_retries: Option<u32>,
    reason: String,
    #[cfg_attr(feature = "serde", serde(default))]
    priority: Option<Priority>,
    #[cfg_attr(feature = "serde", serde(default))]
    long_delay: bool,
    message: String,
}

impl ErrorClassification {
    /// Build the classification a category carries intrinsically.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tideline::{ErrorCategory, ErrorClassification, Priority};
    ///
    /// let c = ErrorClassification::for_category(ErrorCategory::RateLimit, "429");
    /// assert!(c.retriable());
    /// assert_eq!(c.max_retries(), Some(3));
    /// assert_eq!(c.priority(), Some(Priority::High));
    /// assert!(c.long_delay());
    /// assert_eq!(c.reason(), "rate_limit");
    /// ```
    pub fn for_category(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            retriable: category.is_retriable(),
            max_retries: Some(category.max_retries()),
            reason: category.as_str().to_string(),
            priority: category.priority(),
            long_delay: category.long_delay(),
            message: message.into(),
        }
    }

    /// Replace the retry cap. `None` defers to the retry policy's cap.
    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replace the machine-readable reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// The assigned category.
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Whether a retry may be attempted at all.
    pub fn retriable(&self) -> bool {
        self.retriable
    }

    /// Category-tuned retry cap; takes precedence over the policy cap.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Short machine-readable reason for logs and decisions.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// UI priority.
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// Whether this failure needs an extended base delay.
    pub fn long_delay(&self) -> bool {
        self.long_delay
    }

    /// The original error text.
    pub fn message(&self) -> &str {
        &self.message
    }
}
