//! # wds-postgrades
//!
//! Client library for posting course grades to the Workday Student Records
//! SOAP service.
//!
//! ## Design Philosophy
//!
//! wds-postgrades is designed to be:
//! - **Batch oriented** - One request carries every grade of one section
//! - **Attributable** - Faults returned by the service are mapped back to the
//!   submissions that caused them
//! - **Library-first** - No CLI or UI, the host application owns scheduling
//!   and persistence
//! - **Non-retrying** - Each call sends once; retry policy belongs to the caller
//!
//! ## Quick Start
//!
//! ```no_run
//! use wds_postgrades::{Config, GradeClient, GradeSubmission, GradeType, SubmissionBatch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_json_str(
//!         r#"{
//!             "credentials": { "username": "ISU_Grades", "password": "secret" },
//!             "endpoint": { "api_version": "44.0" }
//!         }"#,
//!     )?;
//!     let client = GradeClient::new(config)?;
//!
//!     let mut batch = SubmissionBatch::new("SECTION_LISTING_1", GradeType::Final);
//!     batch.push(GradeSubmission::new("891234567", "GRADE_A", "SECTION_LISTING_1"))?;
//!
//!     let outcome = client.submit(&batch).await?;
//!     for failure in &outcome.failed {
//!         println!("{}: {}", failure.submission.universal_id, failure.message);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Mapping SOAP faults back to submissions
pub mod attribution;
/// HTTP client for the grade service
pub mod client;
/// Configuration types
pub mod config;
/// SOAP envelope construction
pub mod envelope;
/// Error types
pub mod error;
/// Grade-code resolution
pub mod grade_codes;
/// Grade record serialization
pub mod payload;
/// Academic periods and interim grading windows
pub mod periods;
/// Response classification
pub mod response;
/// Roster to batch preparation
pub mod roster;
/// Core types
pub mod types;
/// XML cleanup and validation
pub mod xml;

// Re-export commonly used types
pub use attribution::{
    FailedSubmission, FaultEntry, SoapFault, SubmissionOutcome, attribute_errors, parse_fault,
};
pub use client::GradeClient;
pub use config::{Config, CredentialsConfig, EndpointConfig, HttpConfig};
pub use envelope::EnvelopeBuilder;
pub use error::{Error, GradeCodeError, IsRetryable, Result};
pub use grade_codes::{GradeCode, GradeCodeLookup, GradeSchemeTable, GradingBasis};
pub use periods::{AcademicPeriod, GradingWindow, GradingWindows, WindowStatus};
pub use response::{ResponseKind, SubmissionResponse};
pub use roster::{EnrolledStudent, FinalGrade, PreparedBatch, PreparationError};
pub use types::{
    GradeId, GradeSubmission, GradeType, SectionListingId, SubmissionBatch, UniversalId,
};
