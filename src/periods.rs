//! Academic periods and interim grading windows

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// An academic period known to the student-records system
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicPeriod {
    /// Local row identifier
    pub id: i64,
    /// Provider academic period identifier
    pub academic_period_id: String,
    /// Whether the period is enabled locally
    pub enabled: bool,
    /// When the period ends
    pub end_date: DateTime<Utc>,
}

/// Enabled periods that have not ended yet, in input order
pub fn active_periods(periods: &[AcademicPeriod], now: DateTime<Utc>) -> Vec<&AcademicPeriod> {
    periods
        .iter()
        .filter(|p| p.enabled && p.end_date > now)
        .collect()
}

/// Time range during which interim grades may be posted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedWindow")]
pub struct GradingWindow {
    /// First instant grading is allowed
    pub start: DateTime<Utc>,
    /// Last instant grading is allowed
    pub end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct UncheckedWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<UncheckedWindow> for GradingWindow {
    type Error = Error;

    fn try_from(raw: UncheckedWindow) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl GradingWindow {
    /// Create a window
    ///
    /// # Errors
    /// Returns a configuration error if `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end < start {
            return Err(Error::Config {
                message: format!("grading window ends ({}) before it starts ({})", end, start),
                key: Some("grading_window".to_string()),
            });
        }
        Ok(Self { start, end })
    }

    /// Inclusive on both ends
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }
}

/// Interim grading state of a period at a point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowStatus {
    /// No window configured for the period
    NotConfigured,
    /// The window has not opened yet
    Upcoming {
        /// Time until the window opens
        opens_in: Duration,
    },
    /// The window is open
    Open {
        /// Time until the window closes
        closes_in: Duration,
    },
    /// The window has closed
    Closed,
}

impl WindowStatus {
    /// True only for [`WindowStatus::Open`]
    pub fn is_open(&self) -> bool {
        matches!(self, WindowStatus::Open { .. })
    }
}

impl std::fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowStatus::NotConfigured => {
                f.write_str("Interim grading has not been configured for this period")
            }
            WindowStatus::Upcoming { opens_in } => {
                write!(f, "Interim grading opens in {}", format_span(*opens_in))
            }
            WindowStatus::Open { closes_in } => {
                write!(f, "Interim grading is open for {}", format_span(*closes_in))
            }
            WindowStatus::Closed => f.write_str("Interim grading has closed for this period"),
        }
    }
}

/// Render a span as "2 days 3 hours", dropping zero units
fn format_span(span: Duration) -> String {
    let total = span.num_minutes().max(0);
    let days = total / (24 * 60);
    let hours = (total / 60) % 24;
    let minutes = total % 60;

    let mut parts = Vec::new();
    for (value, unit) in [(days, "day"), (hours, "hour"), (minutes, "min")] {
        match value {
            0 => {}
            1 => parts.push(format!("1 {}", unit)),
            n => parts.push(format!("{} {}s", n, unit)),
        }
    }
    if parts.is_empty() {
        "less than a minute".to_string()
    } else {
        parts.join(" ")
    }
}

/// Interim grading windows keyed by academic period identifier
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradingWindows {
    windows: HashMap<String, GradingWindow>,
}

impl GradingWindows {
    /// Create an empty set of windows
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure or replace the window for a period
    pub fn set(&mut self, academic_period_id: impl Into<String>, window: GradingWindow) {
        self.windows.insert(academic_period_id.into(), window);
    }

    /// Remove a period's window, returning it if one was configured
    pub fn remove(&mut self, academic_period_id: &str) -> Option<GradingWindow> {
        self.windows.remove(academic_period_id)
    }

    /// Window configured for a period
    pub fn get(&self, academic_period_id: &str) -> Option<&GradingWindow> {
        self.windows.get(academic_period_id)
    }

    /// True if interim grades may be posted for the period at `now`
    ///
    /// Periods without a configured window are closed.
    pub fn is_interim_grading_open(&self, academic_period_id: &str, now: DateTime<Utc>) -> bool {
        self.get(academic_period_id)
            .is_some_and(|window| window.contains(now))
    }

    /// Interim grading state of a period at `now`
    pub fn interim_grading_status(
        &self,
        academic_period_id: &str,
        now: DateTime<Utc>,
    ) -> WindowStatus {
        match self.get(academic_period_id) {
            None => WindowStatus::NotConfigured,
            Some(window) if now < window.start => WindowStatus::Upcoming {
                opens_in: window.start - now,
            },
            Some(window) if now > window.end => WindowStatus::Closed,
            Some(window) => WindowStatus::Open {
                closes_in: window.end - now,
            },
        }
    }
}
