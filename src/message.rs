//! User-facing retry status lines.

/// Inputs for [`retry_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryMessage<'a> {
    /// Which retry this is (1-based).
    pub attempt: u32,
    /// How many retries are allowed in total.
    pub max_attempts: u32,
    /// Category wire name; unmapped names get a generic line.
    pub error_type: &'a str,
}

/// Short status line for a toast or progress display.
///
/// # Examples
///
/// ```rust
/// use tideline::{retry_message, RetryMessage};
///
/// let line = retry_message(RetryMessage {
///     attempt: 2,
///     max_attempts: 3,
///     error_type: "rate_limit",
/// });
/// assert_eq!(line, "Rate limit reached, waiting to retry (2/3)...");
/// ```
pub fn retry_message(msg: RetryMessage<'_>) -> String {
    let status = match msg.error_type {
        "network" => "Network connection issue, retrying",
        "timeout" => "Request timed out, retrying",
        "rate_limit" => "Rate limit reached, waiting to retry",
        "search_failed" => "Search failed, retrying",
        "server_error" => "Server temporarily unavailable, retrying",
        _ => "Encountered an issue, retrying",
    };
    format!("{} ({}/{})...", status, msg.attempt, msg.max_attempts)
}
