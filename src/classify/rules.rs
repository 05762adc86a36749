//! Ordered rule table and the classifier that walks it.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use super::category::ErrorCategory;
use super::classification::ErrorClassification;
use super::source::ErrorSource;

const PERMANENT_PATTERNS: &[&str] = &[
    r"invalid.*apikey",
    r"invalid.*key",
    r"authentication",
    r"unauthorized",
    r"permission.*denied",
    r"forbidden",
    r"401",
    r"403",
];

const NETWORK_PATTERNS: &[&str] = &[
    r"econnreset",
    r"econnrefused",
    r"enotfound",
    r"epipe",
    r"connection (reset|refused|aborted|closed)",
    r"broken pipe",
    r"socket hang up",
    r"network",
    r"fetch failed",
    r"failed to fetch",
];

const TIMEOUT_PATTERNS: &[&str] = &[
    r"timeout",
    r"timed out",
    r"etimedout",
    r"deadline exceeded",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[r"rate.?limit", r"\b429\b", r"too many requests"];

const SEARCH_FAILED_PATTERNS: &[&str] = &[
    r"search.*fail",
    r"no (search )?results",
    r"empty (search )?results?",
    r"api error",
];

const SERVER_ERROR_PATTERNS: &[&str] = &[
    r"\b5\d\d\b",
    r"service unavailable",
    r"internal server error",
    r"bad gateway",
];

/// Message rules in evaluation order. `Unknown` has no rule; it is the
/// fallback.
const RULE_TABLE: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::Permanent, PERMANENT_PATTERNS),
    (ErrorCategory::Network, NETWORK_PATTERNS),
    (ErrorCategory::Timeout, TIMEOUT_PATTERNS),
    (ErrorCategory::RateLimit, RATE_LIMIT_PATTERNS),
    (ErrorCategory::SearchFailed, SEARCH_FAILED_PATTERNS),
    (ErrorCategory::ServerError, SERVER_ERROR_PATTERNS),
];

#[derive(Debug, Clone)]
struct CategoryRule {
    category: ErrorCategory,
    patterns: Vec<Regex>,
}

impl CategoryRule {
    fn matches(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(message))
    }
}

/// Maps errors to an [`ErrorClassification`].
///
/// Structured fields are consulted first (HTTP status, then error code).
/// If neither decides, the message is matched against the rule table in
/// fixed order: permanent, network, timeout, rate_limit, search_failed,
/// server_error. The first category with a matching pattern wins; nothing
/// matching yields `unknown`.
///
/// The classifier holds only compiled patterns and is never mutated, so one
/// instance can be shared freely. [`ErrorClassifier::global`] returns a
/// process-wide instance.
///
/// # Examples
///
/// ```rust
/// use tideline::{ErrorCategory, ErrorClassifier};
///
/// let classifier = ErrorClassifier::new();
///
/// // Auth failures win even if the text also mentions a timeout.
/// let c = classifier.classify("401 Unauthorized (upstream timeout)");
/// assert_eq!(c.category(), ErrorCategory::Permanent);
/// assert!(!c.retriable());
/// ```
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<CategoryRule>,
}

impl ErrorClassifier {
    /// Compile the built-in rule table.
    pub fn new() -> Self {
        let rules = RULE_TABLE
            .iter()
            .map(|(category, patterns)| CategoryRule {
                category: *category,
                patterns: compile_patterns(patterns),
            })
            .collect();
        Self { rules }
    }

    /// Shared instance compiled on first use.
    pub fn global() -> &'static ErrorClassifier {
        static GLOBAL: OnceLock<ErrorClassifier> = OnceLock::new();
        GLOBAL.get_or_init(ErrorClassifier::new)
    }

    /// Categories with message rules, in evaluation order.
    pub fn rule_order(&self) -> impl Iterator<Item = ErrorCategory> + '_ {
        self.rules.iter().map(|rule| rule.category)
    }

    /// Classify an error. Never fails.
    pub fn classify<E: ErrorSource + ?Sized>(&self, error: &E) -> ErrorClassification {
        let message = error.message();

        if let Some(category) = error.status_code().and_then(classify_status) {
            #[cfg(feature = "tracing")]
            tracing::debug!(category = %category, source = "status", "classified error");
            return ErrorClassification::for_category(category, message.into_owned());
        }

        if let Some(category) = error.error_code().and_then(classify_code) {
            #[cfg(feature = "tracing")]
            tracing::debug!(category = %category, source = "code", "classified error");
            return ErrorClassification::for_category(category, message.into_owned());
        }

        let category = self.match_message(&message);
        #[cfg(feature = "tracing")]
        tracing::debug!(category = %category, source = "message", "classified error");
        ErrorClassification::for_category(category, message.into_owned())
    }

    /// Every category whose message rules match, in evaluation order.
    ///
    /// Diagnostic helper; classification itself stops at the first match.
    pub fn matching_categories(&self, message: &str) -> Vec<ErrorCategory> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(message))
            .map(|rule| rule.category)
            .collect()
    }

    /// Run only the message rules.
    pub fn match_message(&self, message: &str) -> ErrorCategory {
        self.rules
            .iter()
            .find(|rule| rule.matches(message))
            .map(|rule| rule.category)
            .unwrap_or(ErrorCategory::Unknown)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify an error with the shared classifier.
///
/// # Examples
///
/// ```rust
/// use tideline::{classify_error, ErrorCategory, ProviderError};
///
/// assert_eq!(classify_error("ECONNRESET").category(), ErrorCategory::Network);
///
/// // A structured status beats the message text.
/// let err = ProviderError::new("upstream said no").with_status(429);
/// assert_eq!(classify_error(&err).category(), ErrorCategory::RateLimit);
/// ```
pub fn classify_error<E: ErrorSource + ?Sized>(error: &E) -> ErrorClassification {
    ErrorClassifier::global().classify(error)
}

/// Category implied by an HTTP status, if it implies one.
pub fn classify_status(status: u16) -> Option<ErrorCategory> {
    match status {
        401 | 403 => Some(ErrorCategory::Permanent),
        408 | 504 => Some(ErrorCategory::Timeout),
        429 => Some(ErrorCategory::RateLimit),
        500..=599 => Some(ErrorCategory::ServerError),
        _ => None,
    }
}

/// Category implied by an OS/SDK error code, if it implies one.
pub fn classify_code(code: &str) -> Option<ErrorCategory> {
    match code.to_ascii_uppercase().as_str() {
        "ECONNRESET" | "ECONNREFUSED" | "ECONNABORTED" | "ENOTCONN" | "ENOTFOUND" | "EPIPE"
        | "EAI_AGAIN" => Some(ErrorCategory::Network),
        "ETIMEDOUT" | "ESOCKETTIMEDOUT" => Some(ErrorCategory::Timeout),
        _ => None,
    }
}

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| RegexBuilder::new(p).case_insensitive(true).build().ok())
        .collect()
}
