//! Per-student record blocks for a grade-posting request
//!
//! Each submission becomes one record element whose tag depends on the grade
//! type. Records are emitted in batch order; fault responses refer back to them
//! by that position.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{GradeType, SubmissionBatch};
use crate::xml::XmlWriter;

/// Date format used for every date element
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Qualify a local name with the `wd:` service prefix
pub(crate) fn wd(local: &str) -> String {
    format!("wd:{}", local)
}

/// Render the record blocks for a batch as a standalone fragment
///
/// `today` is stamped into every interim record. Final records ignore it.
/// The fragment has one top-level element per submission and uses the `wd:`
/// prefix without declaring it; it is meant to be embedded in an envelope.
pub fn build_grades_fragment(batch: &SubmissionBatch, today: NaiveDate) -> Result<String> {
    let mut writer = XmlWriter::new();
    write_grade_records(&mut writer, batch, today)?;
    writer.finish()
}

pub(crate) fn write_grade_records(
    writer: &mut XmlWriter,
    batch: &SubmissionBatch,
    today: NaiveDate,
) -> Result<()> {
    let grade_type = batch.grade_type();
    let record_tag = wd(grade_type.record_tag());
    let note_tag = wd(grade_type.note_tag());
    let stamp = today.format(DATE_FORMAT).to_string();

    for (index, submission) in batch.submissions().iter().enumerate() {
        let position = index + 1;

        if submission.universal_id.is_blank() {
            warn!(
                section = %batch.section_listing_id(),
                position,
                "submission has no student universal ID, sending empty reference"
            );
        }
        if submission.grade_id.is_blank() {
            warn!(
                section = %batch.section_listing_id(),
                position,
                student = %submission.universal_id,
                "submission has no grade ID, sending empty reference"
            );
        }

        writer.start(&record_tag, &[])?;

        writer.start("wd:Student_Reference", &[])?;
        writer.text_element(
            "wd:ID",
            &[("wd:type", "Universal_Identifier_ID")],
            submission.universal_id.as_str(),
        )?;
        writer.end("wd:Student_Reference")?;

        writer.start("wd:Student_Grade_Reference", &[])?;
        writer.text_element(
            "wd:ID",
            &[("wd:type", "Student_Grade_ID")],
            submission.grade_id.as_str(),
        )?;
        writer.end("wd:Student_Grade_Reference")?;

        // Notes are free text written by graders, braces included
        if let Some(note) = &submission.note {
            writer.verbatim_text_element(&note_tag, &[], note)?;
        }

        match grade_type {
            GradeType::Interim => {
                writer.text_element("wd:Student_Interim_Grade_Date", &[], &stamp)?;
                if submission.last_attendance.is_some() {
                    debug!(
                        position,
                        student = %submission.universal_id,
                        "ignoring last attendance date on interim submission"
                    );
                }
            }
            GradeType::Final => {
                if let Some(date) = submission.last_attendance {
                    writer.text_element(
                        "wd:Student_Last_Date_of_Attendance",
                        &[],
                        &date.format(DATE_FORMAT).to_string(),
                    )?;
                }
            }
        }

        writer.end(&record_tag)?;
    }

    Ok(())
}
