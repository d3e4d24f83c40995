use chrono::{DateTime, Utc};

use crate::models::StudySession;

/// Total study time of sessions on or after `since`, in whole minutes.
pub fn study_minutes_since(sessions: &[StudySession], since: DateTime<Utc>) -> u64 {
    let seconds: u64 = sessions
        .iter()
        .filter(|s| s.date >= since)
        .map(|s| u64::from(s.duration))
        .sum();
    (seconds as f64 / 60.0).round() as u64
}
