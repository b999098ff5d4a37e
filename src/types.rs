//! Core types for wds-postgrades

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the identifier carries no characters after trimming
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Student universal identifier in the student-records system
    UniversalId
);
string_id!(
    /// Provider grade record identifier (the resolved grade code)
    GradeId
);
string_id!(
    /// Section listing identifier in the student-records system
    SectionListingId
);

/// Which grade-posting operation a batch targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeType {
    /// End-of-term grades, submitted through a business process
    Final,
    /// Mid-term progress grades
    Interim,
}

impl GradeType {
    /// SOAP operation element name
    pub fn operation(&self) -> &'static str {
        match self {
            GradeType::Final => "Submit_Grades_for_Registrations_Request",
            GradeType::Interim => "Put_Interim_Grades_for_Registrations_Request",
        }
    }

    /// Data wrapper element name inside the operation
    pub fn data_wrapper(&self) -> &'static str {
        match self {
            GradeType::Final => "Submit_Grades_for_Registrations_Data",
            GradeType::Interim => "Put_Interim_Grades_for_Registrations_Data",
        }
    }

    /// Element name of a single student record
    pub fn record_tag(&self) -> &'static str {
        match self {
            GradeType::Final => "Student_Grades_Data",
            GradeType::Interim => "Student_Interim_Grades_Data",
        }
    }

    /// Element name of the optional grade note
    pub fn note_tag(&self) -> &'static str {
        match self {
            GradeType::Final => "Student_Grade_Note",
            GradeType::Interim => "Student_Interim_Grade_Note",
        }
    }

}

impl std::fmt::Display for GradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeType::Final => f.write_str("final"),
            GradeType::Interim => f.write_str("interim"),
        }
    }
}

impl std::str::FromStr for GradeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "final" | "finals" => Ok(GradeType::Final),
            "interim" => Ok(GradeType::Interim),
            other => Err(Error::Config {
                message: format!("unknown grade type '{}'", other),
                key: Some("grade_type".to_string()),
            }),
        }
    }
}

/// One grade to post for one student
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSubmission {
    /// Student reference
    pub universal_id: UniversalId,

    /// Grade record reference
    pub grade_id: GradeId,

    /// Optional grade note. Omitted from the payload when `None`
    #[serde(default)]
    pub note: Option<String>,

    /// Optional last date of attendance (final grades only)
    #[serde(default)]
    pub last_attendance: Option<NaiveDate>,

    /// Section the registration belongs to
    pub section_listing_id: SectionListingId,
}

impl GradeSubmission {
    /// Create a submission with no note and no attendance date
    pub fn new(
        universal_id: impl Into<UniversalId>,
        grade_id: impl Into<GradeId>,
        section_listing_id: impl Into<SectionListingId>,
    ) -> Self {
        Self {
            universal_id: universal_id.into(),
            grade_id: grade_id.into(),
            note: None,
            last_attendance: None,
            section_listing_id: section_listing_id.into(),
        }
    }

    /// Attach a grade note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach a last date of attendance
    pub fn with_last_attendance(mut self, date: NaiveDate) -> Self {
        self.last_attendance = Some(date);
        self
    }
}

/// Ordered set of submissions for one section and one grade type
///
/// Fault responses address records by their 1-based position in this batch,
/// so the order in which submissions are pushed is preserved as-is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedBatch")]
pub struct SubmissionBatch {
    section_listing_id: SectionListingId,
    grade_type: GradeType,
    submissions: Vec<GradeSubmission>,
}

/// Wire form of a batch, checked through [`SubmissionBatch::push`]
#[derive(Deserialize)]
struct UncheckedBatch {
    section_listing_id: SectionListingId,
    grade_type: GradeType,
    submissions: Vec<GradeSubmission>,
}

impl TryFrom<UncheckedBatch> for SubmissionBatch {
    type Error = Error;

    fn try_from(raw: UncheckedBatch) -> Result<Self> {
        Self::from_submissions(raw.section_listing_id, raw.grade_type, raw.submissions)
    }
}

impl SubmissionBatch {
    /// Create an empty batch
    pub fn new(section_listing_id: impl Into<SectionListingId>, grade_type: GradeType) -> Self {
        Self {
            section_listing_id: section_listing_id.into(),
            grade_type,
            submissions: Vec::new(),
        }
    }

    /// Append a submission
    ///
    /// # Errors
    /// Returns [`Error::SectionMismatch`] if the submission belongs to another section.
    pub fn push(&mut self, submission: GradeSubmission) -> Result<()> {
        if submission.section_listing_id != self.section_listing_id {
            return Err(Error::SectionMismatch {
                expected: self.section_listing_id.to_string(),
                found: submission.section_listing_id.to_string(),
            });
        }
        self.submissions.push(submission);
        Ok(())
    }

    /// Build a batch from an iterator, failing on the first foreign section
    pub fn from_submissions<I>(
        section_listing_id: impl Into<SectionListingId>,
        grade_type: GradeType,
        submissions: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = GradeSubmission>,
    {
        let mut batch = Self::new(section_listing_id, grade_type);
        for submission in submissions {
            batch.push(submission)?;
        }
        Ok(batch)
    }

    /// Section shared by every submission
    pub fn section_listing_id(&self) -> &SectionListingId {
        &self.section_listing_id
    }

    /// Grade type shared by every submission
    pub fn grade_type(&self) -> GradeType {
        self.grade_type
    }

    /// Submissions in batch order
    pub fn submissions(&self) -> &[GradeSubmission] {
        &self.submissions
    }

    /// Look up a submission by its 1-based position
    pub fn get(&self, position: usize) -> Option<&GradeSubmission> {
        position
            .checked_sub(1)
            .and_then(|index| self.submissions.get(index))
    }

    /// Number of submissions
    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    /// True when the batch holds no submissions
    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }
}
