//! Error classification.
//!
//! Turns heterogeneous upstream failures (SDK errors, fetch errors, HTTP
//! status text) into a typed [`ErrorClassification`] that the retry engine
//! can act on.
//!
//! # Quick Start
//!
//! ```rust
//! use tideline::{classify_error, ErrorCategory};
//!
//! let c = classify_error("429 Too Many Requests");
//! assert_eq!(c.category(), ErrorCategory::RateLimit);
//! assert_eq!(c.max_retries(), Some(3));
//!
//! let c = classify_error("something nobody anticipated");
//! assert_eq!(c.category(), ErrorCategory::Unknown);
//! assert_eq!(c.max_retries(), Some(1));
//! ```
//!
//! # Categories
//!
//! | category        | retriable | max retries | priority |
//! |-----------------|-----------|-------------|----------|
//! | `permanent`     | no        | 0           |          |
//! | `network`       | yes       | 3           | high     |
//! | `timeout`       | yes       | 2           | medium   |
//! | `rate_limit`    | yes       | 3           | high     |
//! | `search_failed` | yes       | 2           | medium   |
//! | `server_error`  | yes       | 2           | medium   |
//! | `unknown`       | yes       | 1           |          |

mod category;
mod classification;
mod rules;
mod source;

pub use category::{ErrorCategory, Priority, UnknownCategory};
pub use classification::ErrorClassification;
pub use rules::{classify_code, classify_error, classify_status, ErrorClassifier};
pub use source::{ErrorSource, ProviderError};
