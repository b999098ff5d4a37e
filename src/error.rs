//! Error types for wds-postgrades
//!
//! This module provides the error taxonomy for a grade submission:
//! - Build-time failures (malformed payload, mismatched sections, configuration)
//! - Transport and unexpected-status failures from the single HTTP attempt
//! - Grade-code resolution failures, which are scoped to one student
//!
//! A rejected batch (HTTP 500 carrying a SOAP fault) is not an error: it is a
//! normal [`SubmissionResponse`](crate::response::SubmissionResponse) that goes
//! through error attribution.

use thiserror::Error;

/// Result type alias for wds-postgrades operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wds-postgrades
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_version")
        key: Option<String>,
    },

    /// The SOAP envelope could not be built or did not re-parse as well-formed XML.
    /// Nothing was sent.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Connection, DNS, TLS or timeout failure. The batch outcome is unknown.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote system answered with a status other than 200 or 500
    #[error("server returned HTTP status {status}")]
    Server {
        /// Raw HTTP status code
        status: u16,
    },

    /// A submission was added to a batch for a different section
    #[error("submission for section {found} cannot join batch for section {expected}")]
    SectionMismatch {
        /// Section of the batch
        expected: String,
        /// Section of the rejected submission
        found: String,
    },

    /// Grade code could not be resolved for a student
    #[error("grade code error: {0}")]
    GradeCode(#[from] GradeCodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::MalformedPayload(e.to_string())
    }
}

/// Grade-code resolution errors
///
/// These are per-student: the caller skips the student and keeps preparing the
/// rest of the roster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeCodeError {
    /// Grading basis string is not one the provider defines
    #[error("unknown grading basis '{0}'")]
    UnknownBasis(String),

    /// No grade code row matches the lookup key
    #[error("no grade code for scheme {scheme}, basis {basis}, display '{display}'")]
    NotFound {
        /// Grading scheme identifier
        scheme: String,
        /// Grading basis as sent by the provider
        basis: String,
        /// Display grade used for the lookup
        display: String,
    },

    /// More than one grade code row matches the lookup key
    #[error("{count} grade codes match scheme {scheme}, basis {basis}, display '{display}'")]
    Ambiguous {
        /// Grading scheme identifier
        scheme: String,
        /// Grading basis as sent by the provider
        basis: String,
        /// Display grade used for the lookup
        display: String,
        /// Number of matching rows
        count: usize,
    },
}

/// Trait for errors that can be classified as retryable or not
///
/// The client never retries on its own. Callers use this to decide whether the
/// whole batch can safely be resubmitted.
pub trait IsRetryable {
    /// Returns true if the failure leaves the batch in an unknown state that a
    /// resubmission can resolve
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Nothing reached the remote system, or the answer was lost
            Error::Transport(_) => true,
            // The remote system saw the batch and refused it
            Error::Server { .. } => false,
            // Build-time failures repeat identically
            Error::MalformedPayload(_)
            | Error::SectionMismatch { .. }
            | Error::Config { .. }
            | Error::GradeCode(_) => false,
            Error::Io(_) | Error::Serialization(_) => false,
        }
    }
}
