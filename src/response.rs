//! Classification of the remote system's HTTP response

use tracing::warn;

use crate::error::{Error, Result};
use crate::xml::{clean_xml, strip_placeholders};

/// How a status code is to be treated, decided before the body is read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    /// 200: the batch was accepted
    Accepted,
    /// 500: the batch was parsed and some or all records were refused
    Rejected,
}

/// A response the remote system produced after understanding the request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionResponse {
    /// HTTP 200 with the cleaned acknowledgement document
    Accepted {
        /// Cleaned response XML
        xml: String,
    },
    /// HTTP 500 with the cleaned SOAP fault, ready for error attribution
    Rejected {
        /// Cleaned fault XML
        xml: String,
    },
}

impl SubmissionResponse {
    /// The cleaned response document
    pub fn xml(&self) -> &str {
        match self {
            SubmissionResponse::Accepted { xml } | SubmissionResponse::Rejected { xml } => xml,
        }
    }

    /// True for a 200 acknowledgement
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionResponse::Accepted { .. })
    }

    /// HTTP status the response was classified from
    pub fn status(&self) -> u16 {
        match self {
            SubmissionResponse::Accepted { .. } => 200,
            SubmissionResponse::Rejected { .. } => 500,
        }
    }
}

/// Decide how to treat a status code
///
/// # Errors
/// Any status other than 200 or 500 is [`Error::Server`]; its body is never
/// inspected.
pub fn classify_status(status: u16) -> Result<ResponseKind> {
    match status {
        200 => Ok(ResponseKind::Accepted),
        500 => Ok(ResponseKind::Rejected),
        other => {
            warn!(status = other, "unexpected HTTP status from grade service");
            Err(Error::Server { status: other })
        }
    }
}

impl ResponseKind {
    /// Attach the cleaned body
    ///
    /// A body that does not parse is still returned, with placeholders
    /// stripped, so a rejection is never mistaken for an empty success.
    pub fn with_body(self, body: &str) -> SubmissionResponse {
        let xml = match clean_xml(body) {
            Ok(xml) => xml,
            Err(e) => {
                warn!(error = %e, kind = ?self, "response body is not well-formed XML");
                strip_placeholders(body).into_owned()
            }
        };
        match self {
            ResponseKind::Accepted => SubmissionResponse::Accepted { xml },
            ResponseKind::Rejected => SubmissionResponse::Rejected { xml },
        }
    }
}

/// Classify a complete status and body pair
pub fn classify(status: u16, body: &str) -> Result<SubmissionResponse> {
    Ok(classify_status(status)?.with_body(body))
}
