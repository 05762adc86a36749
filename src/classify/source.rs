//! What the classifier needs to know about an error.

use std::borrow::Cow;
use std::fmt;
use std::io;

/// An error-like value the classifier can inspect.
///
/// Only [`message`](ErrorSource::message) is required. Upstreams that expose
/// an HTTP status or an OS-style error code should report them too: structured
/// fields are checked before message patterns.
pub trait ErrorSource {
    /// Free-text message (or the value's string rendering).
    fn message(&self) -> Cow<'_, str>;

    /// HTTP status reported by the upstream, if any.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Machine error code such as `ECONNRESET`, if any.
    fn error_code(&self) -> Option<&str> {
        None
    }
}

impl ErrorSource for str {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl ErrorSource for String {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<T: ErrorSource + ?Sized> ErrorSource for &T {
    fn message(&self) -> Cow<'_, str> {
        (**self).message()
    }

    fn status_code(&self) -> Option<u16> {
        (**self).status_code()
    }

    fn error_code(&self) -> Option<&str> {
        (**self).error_code()
    }
}

impl ErrorSource for dyn std::error::Error + '_ {
    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl ErrorSource for dyn std::error::Error + Send + Sync + '_ {
    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl ErrorSource for io::Error {
    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn error_code(&self) -> Option<&str> {
        let code = match self.kind() {
            io::ErrorKind::ConnectionReset => "ECONNRESET",
            io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
            io::ErrorKind::ConnectionAborted => "ECONNABORTED",
            io::ErrorKind::NotConnected => "ENOTCONN",
            io::ErrorKind::BrokenPipe => "EPIPE",
            io::ErrorKind::TimedOut => "ETIMEDOUT",
            _ => return None,
        };
        Some(code)
    }
}

/// A failure reported by an LLM or search provider.
///
/// Provider adapters build one of these from whatever their SDK returns so
/// the status code survives into classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    message: String,
    status: Option<u16>,
    code: Option<String>,
}

impl ProviderError {
    /// An error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
        }
    }

    /// Attach the HTTP status the provider answered with.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach a machine error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// The HTTP status, if known.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ErrorSource for ProviderError {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.message.as_str())
    }

    fn status_code(&self) -> Option<u16> {
        self.status
    }

    fn error_code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_kinds_map_to_os_codes() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
        assert_eq!(reset.error_code(), Some("ECONNRESET"));

        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(timed_out.error_code(), Some("ETIMEDOUT"));

        let other = io::Error::other("disk on fire");
        assert_eq!(other.error_code(), None);
        assert_eq!(other.message(), "disk on fire");
    }

    #[test]
    fn provider_error_exposes_structured_fields() {
        let err = ProviderError::new("slow down")
            .with_status(429)
            .with_code("rate_limited");
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.error_code(), Some("rate_limited"));
        assert_eq!(err.message(), "slow down");
        assert_eq!(err.to_string(), "slow down (HTTP 429)");
    }

    #[test]
    fn boxed_std_errors_use_their_display() {
        let boxed: Box<dyn std::error::Error + Send + Sync> = "plain failure".into();
        assert_eq!((*boxed).message(), "plain failure");
    }
}
