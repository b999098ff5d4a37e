//! Grade-code resolution
//!
//! The student-records system identifies each postable grade by a grade ID
//! scoped to a grading scheme and grading basis. This module maps a student's
//! computed letter grade to that ID:
//!
//! - **Graded** students look up their letter grade directly.
//! - **Pass/Fail** students look up `Pass` or `F`, derived from the letter.
//! - **Audit** students always look up `Audit`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{GradeCodeError, Result};
use crate::types::GradeId;

/// How a registration is graded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradingBasis {
    /// Letter grades
    #[serde(rename = "Graded")]
    Graded,
    /// Pass or fail
    #[serde(rename = "Pass/Fail")]
    PassFail,
    /// Attendance only
    #[serde(rename = "Audit")]
    Audit,
}

impl GradingBasis {
    /// The basis as the provider spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            GradingBasis::Graded => "Graded",
            GradingBasis::PassFail => "Pass/Fail",
            GradingBasis::Audit => "Audit",
        }
    }

    /// Display grade to look up for a computed letter grade
    pub fn display_key(&self, letter: &str) -> String {
        match self {
            GradingBasis::Graded => letter.trim().to_string(),
            GradingBasis::PassFail => pass_fail_keyword(letter).to_string(),
            GradingBasis::Audit => "Audit".to_string(),
        }
    }
}

impl std::fmt::Display for GradingBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GradingBasis {
    type Err = GradeCodeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Graded" => Ok(GradingBasis::Graded),
            "Pass/Fail" => Ok(GradingBasis::PassFail),
            "Audit" => Ok(GradingBasis::Audit),
            other => Err(GradeCodeError::UnknownBasis(other.to_string())),
        }
    }
}

/// Pass/fail keyword for a letter grade
///
/// C and above pass; C- and below fail. Anything unrecognised maps to
/// `Unknown`, which no grade code row matches.
pub fn pass_fail_keyword(letter: &str) -> &'static str {
    match letter.trim() {
        "A+" | "A" | "A-" | "B+" | "B" | "B-" | "C+" | "C" | "Pass" => "Pass",
        "C-" | "D+" | "D" | "D-" | "F" | "Fail" => "F",
        _ => "Unknown",
    }
}

/// One row of a grading scheme
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCode {
    /// Grading scheme the row belongs to
    pub grading_scheme_id: String,
    /// Grading basis the row applies to
    pub grading_basis: GradingBasis,
    /// Display grade (letter, `Pass`, `F`, `Audit`)
    pub grade_display: String,
    /// Provider grade ID to post
    pub grade_id: GradeId,
}

/// Read model of grading-scheme rows
pub trait GradeCodeLookup {
    /// All rows matching the scheme, basis and display grade
    fn find_grade_codes(
        &self,
        grading_scheme_id: &str,
        basis: GradingBasis,
        grade_display: &str,
    ) -> Vec<GradeCode>;
}

/// Resolve the grade code for a student
///
/// # Errors
/// - [`GradeCodeError::NotFound`] when no row matches
/// - [`GradeCodeError::Ambiguous`] when several rows match
pub fn resolve_grade_code<L>(
    lookup: &L,
    grading_scheme_id: &str,
    basis: GradingBasis,
    letter: &str,
) -> std::result::Result<GradeCode, GradeCodeError>
where
    L: GradeCodeLookup + ?Sized,
{
    let display_key = basis.display_key(letter);
    let mut rows = lookup.find_grade_codes(grading_scheme_id, basis, &display_key);

    match rows.len() {
        0 => Err(GradeCodeError::NotFound {
            scheme: grading_scheme_id.to_string(),
            basis: basis.to_string(),
            display: display_key,
        }),
        1 => {
            let code = rows.remove(0);
            debug!(
                scheme = grading_scheme_id,
                basis = %basis,
                display = %display_key,
                grade_id = %code.grade_id,
                "resolved grade code"
            );
            Ok(code)
        }
        count => Err(GradeCodeError::Ambiguous {
            scheme: grading_scheme_id.to_string(),
            basis: basis.to_string(),
            display: display_key,
            count,
        }),
    }
}

/// In-memory grading-scheme table
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeSchemeTable {
    rows: Vec<GradeCode>,
}

impl GradeSchemeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row
    pub fn insert(&mut self, code: GradeCode) {
        self.rows.push(code);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse a JSON array of rows
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON array of rows from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }
}

impl FromIterator<GradeCode> for GradeSchemeTable {
    fn from_iter<I: IntoIterator<Item = GradeCode>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl GradeCodeLookup for GradeSchemeTable {
    fn find_grade_codes(
        &self,
        grading_scheme_id: &str,
        basis: GradingBasis,
        grade_display: &str,
    ) -> Vec<GradeCode> {
        self.rows
            .iter()
            .filter(|row| {
                row.grading_scheme_id == grading_scheme_id
                    && row.grading_basis == basis
                    && row.grade_display == grade_display
            })
            .cloned()
            .collect()
    }
}
