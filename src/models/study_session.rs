use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: i64,
    pub course_id: i64,
    /// Seconds.
    pub duration: u32,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionDraft {
    pub course_id: i64,
    pub duration: u32,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

impl StudySessionDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.duration == 0 {
            return Err(AppError::BadRequest("duration must be positive".to_string()));
        }
        super::check_storable("date", &self.date)
    }

    pub fn into_session(self, id: i64) -> StudySession {
        StudySession {
            id,
            course_id: self.course_id,
            duration: self.duration,
            date: self.date,
            notes: self.notes,
        }
    }
}

impl From<&StudySession> for StudySessionDraft {
    fn from(s: &StudySession) -> Self {
        Self {
            course_id: s.course_id,
            duration: s.duration,
            date: s.date,
            notes: s.notes.clone(),
        }
    }
}
