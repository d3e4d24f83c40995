use chrono::{DateTime, Datelike, Utc};

use crate::error::AppError;

pub mod assignment;
pub mod course;
pub mod student;
pub mod study_session;

pub use assignment::{Assignment, AssignmentDraft, AssignmentKind, Priority};
pub use course::{Course, CourseDraft};
pub use student::{Student, StudentDraft};
pub use study_session::{StudySession, StudySessionDraft};

/// Years that survive a write and read back as RFC 3339 text.
pub const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Rejects timestamps the stores cannot write as four-digit-year RFC 3339.
pub fn check_storable(field: &str, ts: &DateTime<Utc>) -> Result<(), AppError> {
    if STORABLE_YEARS.contains(&ts.year()) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "{} must fall between years {} and {}, got {}",
            field,
            STORABLE_YEARS.start(),
            STORABLE_YEARS.end(),
            ts.to_rfc3339()
        )))
    }
}
