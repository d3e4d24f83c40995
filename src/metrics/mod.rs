//! Derived metrics over already-fetched records.
//!
//! Everything in here is pure and synchronous: no storage access, no clock
//! reads. Callers pass "now" (and the viewer's timezone where dates matter)
//! explicitly.

pub mod calendar;
pub mod classify;
pub mod filter;
pub mod gpa;
pub mod study;

use chrono::NaiveDate;
use thiserror::Error;

pub use calendar::{
    CalendarGrid, DayBucket, assignments_on, bin_range, month_grid, padded_month_range,
    shift_month, upcoming_deadlines, weekday_labels,
};
pub use classify::{
    DeadlineUrgency, days_until_due, due_label, is_due_soon, is_overdue, percent_score, urgency,
};
pub use filter::{AssignmentCounts, FilterCriteria, PriorityFilter, StatusFilter, filter_assignments};
pub use gpa::{courses_in_semester, gpa, letter_grade, semesters, target_progress, total_credits};
pub use study::study_minutes_since;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("calendar for {year}-{month} extends past the supported date range")]
    OutOfRange { year: i32, month: u32 },

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown filter value: {0}")]
    UnknownFilter(String),
}
