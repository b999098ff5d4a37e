//! Turning an enrolled-student roster into submission batches
//!
//! Students are processed in roster order. A student whose grade cannot be
//! resolved is skipped with a [`PreparationError`]; the rest of the section is
//! still prepared.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::GradeCodeError;
use crate::grade_codes::{GradeCode, GradeCodeLookup, GradingBasis, resolve_grade_code};
use crate::types::{GradeSubmission, GradeType, SectionListingId, SubmissionBatch, UniversalId};

/// Course grade in its three display forms
///
/// `None` means the gradebook has no final grade yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalGrade {
    /// Points, e.g. "87.50"
    pub real: Option<String>,
    /// Percentage, e.g. "87.50 %"
    pub percent: Option<String>,
    /// Letter, e.g. "B+"
    pub letter: Option<String>,
}

/// A student enrolled in a section, with the course grade to post
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledStudent {
    /// Student universal identifier
    pub universal_id: UniversalId,
    /// Preferred or legal first name
    pub first_name: String,
    /// Preferred or legal last name
    pub last_name: String,
    /// Grading scheme of the registration
    pub grading_scheme: String,
    /// Grading basis of the registration, as the provider spells it
    pub grading_basis: String,
    /// Section the registration belongs to
    pub section_listing_id: SectionListingId,
    /// Computed course grade
    #[serde(default)]
    pub final_grade: FinalGrade,
    /// Optional grade note
    #[serde(default)]
    pub note: Option<String>,
    /// Optional last date of attendance
    #[serde(default)]
    pub last_attendance: Option<NaiveDate>,
}

impl EnrolledStudent {
    /// "First Last"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Why a student was left out of a batch
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PreparationFailure {
    /// The gradebook has no letter grade for the student
    #[error("no letter grade available")]
    NoGrade,

    /// The grade code could not be resolved
    #[error(transparent)]
    GradeCode(#[from] GradeCodeError),

    /// The student is enrolled in another section
    #[error("student belongs to section {found}, not {expected}")]
    WrongSection {
        /// Section being prepared
        expected: SectionListingId,
        /// Section of the student
        found: SectionListingId,
    },
}

/// A student skipped during preparation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparationError {
    /// The skipped student
    pub universal_id: UniversalId,
    /// Display name for operator messages
    pub name: String,
    /// Reason for skipping
    pub reason: PreparationFailure,
}

impl std::fmt::Display for PreparationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.universal_id, self.reason)
    }
}

/// A batch ready to send, plus the students that could not join it
#[derive(Clone, Debug)]
pub struct PreparedBatch {
    /// Submissions in roster order
    pub batch: SubmissionBatch,
    /// Resolved grade code per submission, aligned with the batch
    pub grade_codes: Vec<GradeCode>,
    /// Students that were skipped
    pub skipped: Vec<PreparationError>,
}

fn prepare_student<L>(
    section: &SectionListingId,
    student: &EnrolledStudent,
    lookup: &L,
) -> Result<(GradeSubmission, GradeCode), PreparationFailure>
where
    L: GradeCodeLookup + ?Sized,
{
    if &student.section_listing_id != section {
        return Err(PreparationFailure::WrongSection {
            expected: section.clone(),
            found: student.section_listing_id.clone(),
        });
    }

    let basis: GradingBasis = student.grading_basis.parse()?;
    // Audit rows do not depend on the letter, so a missing grade is fine there
    let letter = match (&student.final_grade.letter, basis) {
        (Some(letter), _) => letter.as_str(),
        (None, GradingBasis::Audit) => "",
        (None, _) => return Err(PreparationFailure::NoGrade),
    };

    let code = resolve_grade_code(lookup, &student.grading_scheme, basis, letter)?;

    let submission = GradeSubmission {
        universal_id: student.universal_id.clone(),
        grade_id: code.grade_id.clone(),
        note: student.note.clone(),
        last_attendance: student.last_attendance,
        section_listing_id: section.clone(),
    };
    Ok((submission, code))
}

/// Prepare one section's batch
pub fn prepare_batch<L>(
    section: &SectionListingId,
    grade_type: GradeType,
    students: &[EnrolledStudent],
    lookup: &L,
) -> PreparedBatch
where
    L: GradeCodeLookup + ?Sized,
{
    let mut batch = SubmissionBatch::new(section.clone(), grade_type);
    let mut grade_codes = Vec::new();
    let mut skipped = Vec::new();

    for student in students {
        let prepared = prepare_student(section, student, lookup).and_then(|(submission, code)| {
            batch
                .push(submission)
                .map(|()| code)
                .map_err(|_| PreparationFailure::WrongSection {
                    expected: section.clone(),
                    found: student.section_listing_id.clone(),
                })
        });

        match prepared {
            Ok(code) => grade_codes.push(code),
            Err(reason) => {
                warn!(
                    section = %section,
                    student = %student.universal_id,
                    reason = %reason,
                    "skipping student"
                );
                skipped.push(PreparationError {
                    universal_id: student.universal_id.clone(),
                    name: student.display_name(),
                    reason,
                });
            }
        }
    }

    info!(
        section = %section,
        grade_type = %grade_type,
        prepared = batch.len(),
        skipped = skipped.len(),
        "prepared grade batch"
    );

    PreparedBatch {
        batch,
        grade_codes,
        skipped,
    }
}

/// Prepare one batch per section, in the order sections first appear
pub fn prepare_batches<L>(
    grade_type: GradeType,
    students: &[EnrolledStudent],
    lookup: &L,
) -> Vec<PreparedBatch>
where
    L: GradeCodeLookup + ?Sized,
{
    let mut sections: Vec<SectionListingId> = Vec::new();
    for student in students {
        if !sections.contains(&student.section_listing_id) {
            sections.push(student.section_listing_id.clone());
        }
    }

    sections
        .iter()
        .map(|section| {
            let members: Vec<EnrolledStudent> = students
                .iter()
                .filter(|s| &s.section_listing_id == section)
                .cloned()
                .collect();
            prepare_batch(section, grade_type, &members, lookup)
        })
        .collect()
}
