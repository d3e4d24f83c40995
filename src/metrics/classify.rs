use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Assignment;

const DUE_SOON_WINDOW_DAYS: i64 = 7;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Past due and still open.
pub fn is_overdue(assignment: &Assignment, now: DateTime<Utc>) -> bool {
    !assignment.completed && assignment.due_date < now
}

/// Open and due within the look-ahead window.
///
/// This is also true for overdue work; use `is_due_soon && !is_overdue` for
/// a mutually exclusive badge.
pub fn is_due_soon(assignment: &Assignment, now: DateTime<Utc>) -> bool {
    !assignment.completed && assignment.due_date <= now + Duration::days(DUE_SOON_WINDOW_DAYS)
}

/// Whole days until the deadline, rounded up. Negative when overdue.
pub fn days_until_due(assignment: &Assignment, now: DateTime<Utc>) -> i64 {
    let millis = (assignment.due_date - now).num_milliseconds();
    (millis as f64 / MILLIS_PER_DAY).ceil() as i64
}

/// Score as a whole percentage; `None` for ungraded work.
pub fn percent_score(assignment: &Assignment) -> Option<i64> {
    let earned = assignment.earned_points?;
    if assignment.points <= 0.0 {
        return None;
    }
    Some((earned / assignment.points * 100.0).round() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineUrgency {
    Critical,
    Warning,
    Normal,
}

pub fn urgency(assignment: &Assignment, now: DateTime<Utc>) -> DeadlineUrgency {
    match days_until_due(assignment, now) {
        d if d <= 1 => DeadlineUrgency::Critical,
        d if d <= 3 => DeadlineUrgency::Warning,
        _ => DeadlineUrgency::Normal,
    }
}

pub fn due_label(days: i64) -> String {
    match days {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "1 day overdue".to_string(),
        d if d < 0 => format!("{} days overdue", -d),
        d => format!("{} days", d),
    }
}
