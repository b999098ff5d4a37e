//! Attribution of SOAP fault entries to the submissions that caused them
//!
//! A validation fault lists one `Validation_Error` per problem. Each carries an
//! `Xpath` pointing into the request, e.g.
//! `/wd:Submit_Grades_for_Registrations_Request[1]/…/wd:Student_Grades_Data[3]/…`.
//! The bracketed index on the record element is the 1-based batch position.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::{GradeSubmission, GradeType, SectionListingId, SubmissionBatch};
use crate::xml::check_well_formed;

/// Fault texts meaning every student in the section already has a grade
const SECTION_GRADED_MARKERS: &[&str] = &["already have grades", "already been graded"];

/// Fallback message when a fault entry carries no text
const UNKNOWN_ERROR: &str = "Unknown error occurred";

#[allow(clippy::expect_used)]
static RECORD_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Student_Grades_Data|Student_Interim_Grades_Data)\[([^\]]*)\]")
        .expect("record index pattern is valid")
});

/// One `Validation_Error` from a fault
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultEntry {
    /// 1-based record position, when the XPath names a numeric one
    pub position: Option<usize>,
    /// Raw XPath as reported
    pub xpath: Option<String>,
    /// Message text, with the detail message appended when present
    pub message: String,
}

/// Parsed SOAP fault
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapFault {
    /// `faultcode` text
    pub fault_code: Option<String>,
    /// `faultstring` text
    pub fault_string: Option<String>,
    /// Validation errors in document order
    pub errors: Vec<FaultEntry>,
}

impl SoapFault {
    /// True if any text in the fault reports the section as already graded
    pub fn is_section_already_graded(&self) -> bool {
        self.fault_string
            .iter()
            .map(String::as_str)
            .chain(self.errors.iter().map(|e| e.message.as_str()))
            .any(mentions_section_graded)
    }
}

fn mentions_section_graded(text: &str) -> bool {
    let lower = text.to_lowercase();
    SECTION_GRADED_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Extract the record position from a fault XPath
///
/// Returns `None` when the XPath does not address a record element or the
/// index is not a number.
pub fn record_position(xpath: &str) -> Option<usize> {
    RECORD_INDEX
        .captures(xpath)
        .and_then(|caps| caps.get(1))
        .and_then(|index| index.as_str().trim().parse().ok())
}

/// Parse a SOAP fault document
///
/// Element names are matched by local name, so any namespace prefix works.
///
/// # Errors
/// Returns [`Error::MalformedPayload`] if the document is not well-formed.
pub fn parse_fault(xml: &str) -> Result<SoapFault> {
    check_well_formed(xml)?;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fault = SoapFault::default();
    let mut text = String::new();
    let mut in_error = false;
    let mut message: Option<String> = None;
    let mut detail: Option<String> = None;
    let mut xpath: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => {
                text.clear();
                if e.local_name().as_ref() == b"Validation_Error" {
                    in_error = true;
                    message = None;
                    detail = None;
                    xpath = None;
                }
            }
            Event::Text(t) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| Error::MalformedPayload(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(c) => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(e) => {
                let value = std::mem::take(&mut text).trim().to_string();
                match e.local_name().as_ref() {
                    b"faultcode" => fault.fault_code = non_empty(value),
                    b"faultstring" => fault.fault_string = non_empty(value),
                    b"Message" if in_error => message = non_empty(value),
                    b"Detail_Message" if in_error => detail = non_empty(value),
                    b"Xpath" if in_error => xpath = non_empty(value),
                    b"Validation_Error" => {
                        in_error = false;
                        let position = xpath.as_deref().and_then(record_position);
                        fault.errors.push(FaultEntry {
                            position,
                            xpath: xpath.take(),
                            message: compose_message(message.take(), detail.take()),
                        });
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    Ok(fault)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn compose_message(message: Option<String>, detail: Option<String>) -> String {
    match (message, detail) {
        (Some(m), Some(d)) if m != d => format!("{} ({})", m, d),
        (Some(m), _) => m,
        (None, Some(d)) => d,
        (None, None) => UNKNOWN_ERROR.to_string(),
    }
}

/// A submission the remote system refused
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSubmission {
    /// 1-based position in the batch
    pub position: usize,
    /// The submission as it was sent
    pub submission: GradeSubmission,
    /// Error message(s) reported for this position
    pub message: String,
}

/// Attributed outcome of one batch submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// Section of the batch
    pub section_listing_id: SectionListingId,
    /// Grade type of the batch
    pub grade_type: GradeType,
    /// Submissions with no error attributed to them, in batch order
    pub succeeded: Vec<GradeSubmission>,
    /// Submissions with at least one error, in batch order
    pub failed: Vec<FailedSubmission>,
    /// The remote system reports every student in the section as already graded
    pub section_already_graded: bool,
    /// Fault text when the fault carries no validation errors
    pub batch_fault: Option<String>,
    /// Fault entries whose position could not be mapped to a submission
    pub unattributed: Vec<FaultEntry>,
}

impl SubmissionOutcome {
    /// Outcome of an accepted batch: everything succeeded
    pub fn accepted(batch: &SubmissionBatch) -> Self {
        Self {
            section_listing_id: batch.section_listing_id().clone(),
            grade_type: batch.grade_type(),
            succeeded: batch.submissions().to_vec(),
            failed: Vec::new(),
            section_already_graded: false,
            batch_fault: None,
            unattributed: Vec::new(),
        }
    }

    /// True when nothing was refused and no batch-level condition was reported
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
            && !self.section_already_graded
            && self.batch_fault.is_none()
            && self.unattributed.is_empty()
    }
}

/// Partition a batch using the fault returned for it
///
/// A fault that cannot be parsed yields an outcome with `batch_fault` set and
/// no per-record failures.
pub fn attribute_errors(batch: &SubmissionBatch, fault_xml: &str) -> SubmissionOutcome {
    match parse_fault(fault_xml) {
        Ok(fault) => attribute_fault(batch, &fault),
        Err(e) => {
            warn!(
                section = %batch.section_listing_id(),
                error = %e,
                "could not parse fault response, no errors attributed"
            );
            SubmissionOutcome {
                batch_fault: Some(format!("unparseable fault response: {}", e)),
                ..SubmissionOutcome::accepted(batch)
            }
        }
    }
}

/// Partition a batch using an already parsed fault
pub fn attribute_fault(batch: &SubmissionBatch, fault: &SoapFault) -> SubmissionOutcome {
    let mut outcome = SubmissionOutcome::accepted(batch);

    if fault.errors.is_empty() {
        outcome.batch_fault = Some(
            fault
                .fault_string
                .clone()
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        );
    }

    if fault.is_section_already_graded() {
        info!(
            section = %batch.section_listing_id(),
            "section already graded, no per-student errors attributed"
        );
        outcome.section_already_graded = true;
        return outcome;
    }

    let mut messages: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for entry in &fault.errors {
        match entry.position {
            Some(position) if batch.get(position).is_some() => {
                messages.entry(position).or_default().push(&entry.message);
            }
            _ => {
                warn!(
                    section = %batch.section_listing_id(),
                    xpath = entry.xpath.as_deref().unwrap_or("<none>"),
                    position = ?entry.position,
                    records = batch.len(),
                    message = %entry.message,
                    "fault entry does not map to a submission"
                );
                outcome.unattributed.push(entry.clone());
            }
        }
    }

    let failed_positions: BTreeSet<usize> = messages.keys().copied().collect();
    outcome.failed = messages
        .into_iter()
        .filter_map(|(position, texts)| {
            batch.get(position).map(|submission| FailedSubmission {
                position,
                submission: submission.clone(),
                message: texts.join("; "),
            })
        })
        .collect();
    outcome.succeeded = batch
        .submissions()
        .iter()
        .enumerate()
        .filter(|(index, _)| !failed_positions.contains(&(index + 1)))
        .map(|(_, submission)| submission.clone())
        .collect();

    info!(
        section = %batch.section_listing_id(),
        failed = outcome.failed.len(),
        succeeded = outcome.succeeded.len(),
        unattributed = outcome.unattributed.len(),
        "attributed fault entries to submissions"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_of(n: usize) -> SubmissionBatch {
        SubmissionBatch::from_submissions(
            "SEC-1",
            GradeType::Final,
            (1..=n).map(|i| GradeSubmission::new(format!("U{}", i), format!("G{}", i), "SEC-1")),
        )
        .unwrap()
    }

    fn validation_error(index: &str, message: &str) -> String {
        format!(
            "<wd:Validation_Error>\
               <wd:Message>{}</wd:Message>\
               <wd:Xpath>/wd:Submit_Grades_for_Registrations_Request[1]/wd:Submit_Grades_for_Registrations_Data[1]/wd:Student_Grades_Data[{}]/wd:Student_Grade_Reference[1]</wd:Xpath>\
             </wd:Validation_Error>",
            message, index
        )
    }

    fn fault(faultstring: &str, errors: &[String]) -> String {
        format!(
            "<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\">\
               <SOAP-ENV:Body>\
                 <SOAP-ENV:Fault xmlns:wd=\"urn:com.workday/bsvc\">\
                   <faultcode>SOAP-ENV:Client.validationError</faultcode>\
                   <faultstring>{}</faultstring>\
                   <detail><wd:Validation_Fault>{}</wd:Validation_Fault></detail>\
                 </SOAP-ENV:Fault>\
               </SOAP-ENV:Body>\
             </SOAP-ENV:Envelope>",
            faultstring,
            errors.concat()
        )
    }

    #[test]
    fn test_record_position_reads_final_and_interim_indices() {
        assert_eq!(
            record_position("/wd:X[1]/wd:Y_Data[1]/wd:Student_Grades_Data[7]/wd:ID[1]"),
            Some(7)
        );
        assert_eq!(
            record_position("/wd:X[1]/wd:Student_Interim_Grades_Data[12]"),
            Some(12)
        );
        assert_eq!(record_position("/wd:X[1]/wd:Student_Grades_Data[last()]"), None);
        assert_eq!(record_position("/wd:Section_Listing_Reference[1]"), None);
    }

    #[test]
    fn test_parse_fault_collects_code_string_and_errors() {
        let xml = fault(
            "Validation error occurred.",
            &[validation_error("2", "Invalid grade &amp; basis")],
        );

        let parsed = parse_fault(&xml).unwrap();

        assert_eq!(
            parsed.fault_code.as_deref(),
            Some("SOAP-ENV:Client.validationError")
        );
        assert_eq!(
            parsed.fault_string.as_deref(),
            Some("Validation error occurred.")
        );
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].position, Some(2));
        assert_eq!(parsed.errors[0].message, "Invalid grade & basis");
    }

    #[test]
    fn test_detail_message_is_appended() {
        let xml = fault(
            "Validation error occurred.",
            &["<wd:Validation_Error>\
                 <wd:Message>Invalid ID value</wd:Message>\
                 <wd:Detail_Message>'X' is not a Student_Grade_ID</wd:Detail_Message>\
                 <wd:Xpath>/wd:Student_Grades_Data[1]</wd:Xpath>\
               </wd:Validation_Error>"
                .to_string()],
        );

        let parsed = parse_fault(&xml).unwrap();
        assert_eq!(
            parsed.errors[0].message,
            "Invalid ID value ('X' is not a Student_Grade_ID)"
        );
    }

    #[test]
    fn test_errors_move_matching_submissions_to_failed() {
        let batch = batch_of(5);
        let xml = fault(
            "Validation error occurred.",
            &[
                validation_error("4", "Grade not allowed"),
                validation_error("2", "Registration withdrawn"),
            ],
        );

        let outcome = attribute_errors(&batch, &xml);

        let failed: Vec<_> = outcome
            .failed
            .iter()
            .map(|f| (f.position, f.submission.universal_id.as_str()))
            .collect();
        assert_eq!(failed, vec![(2, "U2"), (4, "U4")]);
        assert_eq!(outcome.failed[0].message, "Registration withdrawn");

        let succeeded: Vec<_> = outcome
            .succeeded
            .iter()
            .map(|s| s.universal_id.as_str())
            .collect();
        assert_eq!(succeeded, vec!["U1", "U3", "U5"]);
        assert!(outcome.batch_fault.is_none());
        assert!(!outcome.is_clean());
    }

    #[test]
    fn test_partition_sizes_add_up_for_every_subset() {
        let n = 6;
        let batch = batch_of(n);

        // Every subset of positions 1..=n
        for mask in 0u32..(1 << n) {
            let positions: Vec<usize> = (1..=n).filter(|p| mask & (1 << (p - 1)) != 0).collect();
            let errors: Vec<String> = positions
                .iter()
                .map(|p| validation_error(&p.to_string(), "bad"))
                .collect();

            let outcome = attribute_errors(&batch, &fault("Validation error occurred.", &errors));

            assert_eq!(outcome.failed.len(), positions.len());
            assert_eq!(outcome.succeeded.len(), n - positions.len());
            for failed in &outcome.failed {
                assert_eq!(&failed.submission, batch.get(failed.position).unwrap());
            }
            let expected_success: Vec<_> = batch
                .submissions()
                .iter()
                .enumerate()
                .filter(|(i, _)| !positions.contains(&(i + 1)))
                .map(|(_, s)| s.clone())
                .collect();
            assert_eq!(outcome.succeeded, expected_success);
        }
    }

    #[test]
    fn test_repeated_position_yields_one_failure_with_joined_messages() {
        let batch = batch_of(2);
        let xml = fault(
            "Validation error occurred.",
            &[
                validation_error("1", "First problem"),
                validation_error("1", "Second problem"),
            ],
        );

        let outcome = attribute_errors(&batch, &xml);

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].message, "First problem; Second problem");
        assert_eq!(outcome.succeeded.len(), 1);
    }

    #[test]
    fn test_unmappable_positions_stay_in_succeeded_and_are_reported() {
        let batch = batch_of(3);
        let xml = fault(
            "Validation error occurred.",
            &[
                validation_error("0", "zero"),
                validation_error("9", "too far"),
                validation_error("abc", "not a number"),
                validation_error("3", "real"),
            ],
        );

        let outcome = attribute_errors(&batch, &xml);

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].position, 3);
        assert_eq!(outcome.succeeded.len(), 2);
        assert_eq!(outcome.unattributed.len(), 3);
        assert_eq!(outcome.unattributed[2].position, None);
    }

    #[test]
    fn test_section_already_graded_clears_per_student_errors() {
        let batch = batch_of(3);
        let xml = fault(
            "Validation error occurred.",
            &[
                validation_error("1", "All students already have grades for this section"),
                validation_error("2", "Grade not allowed"),
            ],
        );

        let outcome = attribute_errors(&batch, &xml);

        assert!(outcome.section_already_graded);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.succeeded.len(), 3);
    }

    #[test]
    fn test_section_already_graded_in_faultstring_is_detected() {
        let batch = batch_of(1);
        let xml = fault("The section has ALREADY BEEN GRADED.", &[]);

        let outcome = attribute_errors(&batch, &xml);

        assert!(outcome.section_already_graded);
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn test_fault_without_validation_errors_sets_batch_fault() {
        let batch = batch_of(2);
        let xml = fault("Processing error occurred.", &[]);

        let outcome = attribute_errors(&batch, &xml);

        assert_eq!(
            outcome.batch_fault.as_deref(),
            Some("Processing error occurred.")
        );
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.succeeded.len(), 2);
    }

    #[test]
    fn test_unparseable_fault_sets_batch_fault() {
        let batch = batch_of(2);

        let outcome = attribute_errors(&batch, "Service Unavailable");

        assert!(outcome.batch_fault.is_some());
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.succeeded.len(), 2);
    }

    #[test]
    fn test_accepted_outcome_is_clean() {
        let batch = batch_of(2);
        let outcome = SubmissionOutcome::accepted(&batch);
        assert!(outcome.is_clean());
        assert_eq!(outcome.succeeded.len(), 2);
    }
}
