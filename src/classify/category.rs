//! The failure taxonomy and its intrinsic retry properties.

use std::fmt;
use std::str::FromStr;

/// Failure category assigned to an error by the classifier.
///
/// The declaration order is the evaluation order used by
/// [`ErrorClassifier`](super::ErrorClassifier): `Permanent` is checked first
/// and always wins, `Unknown` is the fallback when nothing matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorCategory {
    /// Authentication or authorization failure. Never retried.
    Permanent,
    /// Connection reset/refused, DNS failure, broken pipe, failed fetch.
    Network,
    /// The upstream call timed out.
    Timeout,
    /// Provider asked us to slow down (429, "too many requests").
    RateLimit,
    /// A search returned nothing or the search API errored.
    SearchFailed,
    /// HTTP 5xx or "service unavailable".
    ServerError,
    /// Nothing matched; retried once.
    Unknown,
}

/// How urgently a retry notice should be surfaced to the user.
///
/// Presentation only; never used in backoff math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Priority {
    /// Surface prominently.
    High,
    /// Surface normally.
    Medium,
}

impl ErrorCategory {
    /// Every category in classifier evaluation order.
    pub const ALL: [ErrorCategory; 7] = [
        ErrorCategory::Permanent,
        ErrorCategory::Network,
        ErrorCategory::Timeout,
        ErrorCategory::RateLimit,
        ErrorCategory::SearchFailed,
        ErrorCategory::ServerError,
        ErrorCategory::Unknown,
    ];

    /// Wire name of the category (`"rate_limit"`, `"server_error"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::SearchFailed => "search_failed",
            Self::ServerError => "server_error",
            Self::Unknown => "unknown",
        }
    }

    /// Whether errors of this category may be retried at all.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::Permanent)
    }

    /// The retry cap tuned for this category.
    pub fn max_retries(&self) -> u32 {
        match self {
            Self::Permanent => 0,
            Self::Network | Self::RateLimit => 3,
            Self::Timeout | Self::SearchFailed | Self::ServerError => 2,
            Self::Unknown => 1,
        }
    }

    /// UI priority, if the category carries one.
    pub fn priority(&self) -> Option<Priority> {
        match self {
            Self::Network | Self::RateLimit => Some(Priority::High),
            Self::Timeout | Self::SearchFailed | Self::ServerError => Some(Priority::Medium),
            Self::Permanent | Self::Unknown => None,
        }
    }

    /// Whether this category needs an extended base delay.
    pub fn long_delay(&self) -> bool {
        matches!(self, Self::RateLimit)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ErrorCategory {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Error returned when parsing a string that names no category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error category: {:?}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for ErrorCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
