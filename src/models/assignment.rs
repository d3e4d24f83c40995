use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentKind {
    Homework,
    Quiz,
    Exam,
    Project,
    Essay,
}

impl AssignmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentKind::Homework => "Homework",
            AssignmentKind::Quiz => "Quiz",
            AssignmentKind::Exam => "Exam",
            AssignmentKind::Project => "Project",
            AssignmentKind::Essay => "Essay",
        }
    }
}

impl FromStr for AssignmentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Homework" => Ok(AssignmentKind::Homework),
            "Quiz" => Ok(AssignmentKind::Quiz),
            "Exam" => Ok(AssignmentKind::Exam),
            "Project" => Ok(AssignmentKind::Project),
            "Essay" => Ok(AssignmentKind::Essay),
            other => Err(AppError::InvalidRecord(format!("unknown assignment type: {:?}", other))),
        }
    }
}

impl fmt::Display for AssignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(Priority::High),
            "Medium" => Ok(Priority::Medium),
            "Low" => Ok(Priority::Low),
            other => Err(AppError::InvalidRecord(format!("unknown priority: {:?}", other))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: AssignmentKind,
    pub priority: Priority,
    pub due_date: DateTime<Utc>,
    pub points: f64,
    pub earned_points: Option<f64>,
    pub completed: bool,
}

impl Assignment {
    pub fn is_graded(&self) -> bool {
        self.earned_points.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDraft {
    pub course_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: AssignmentKind,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub due_date: DateTime<Utc>,
    pub points: f64,
    #[serde(default)]
    pub earned_points: Option<f64>,
    #[serde(default)]
    pub completed: bool,
}

fn default_priority() -> Priority {
    Priority::Medium
}

impl AssignmentDraft {
    /// A recorded score always means the work was handed in.
    pub fn normalize(mut self) -> Self {
        if self.earned_points.is_some() {
            self.completed = true;
        }
        self.title = self.title.trim().to_string();
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("assignment title is required".to_string()));
        }
        if !self.points.is_finite() || self.points <= 0.0 {
            return Err(AppError::BadRequest(format!(
                "points must be a positive number, got {}",
                self.points
            )));
        }
        super::check_storable("dueDate", &self.due_date)?;
        if let Some(earned) = self.earned_points {
            if !earned.is_finite() || earned < 0.0 {
                return Err(AppError::BadRequest(format!(
                    "earnedPoints must be a non-negative number, got {}",
                    earned
                )));
            }
            if earned > self.points {
                return Err(AppError::BadRequest(format!(
                    "earnedPoints ({}) exceeds points ({})",
                    earned, self.points
                )));
            }
            if !self.completed {
                return Err(AppError::Conflict(
                    "a graded assignment cannot be marked incomplete".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn into_assignment(self, id: i64) -> Assignment {
        Assignment {
            id,
            course_id: self.course_id,
            title: self.title,
            kind: self.kind,
            priority: self.priority,
            due_date: self.due_date,
            points: self.points,
            earned_points: self.earned_points,
            completed: self.completed,
        }
    }
}

impl From<&Assignment> for AssignmentDraft {
    fn from(a: &Assignment) -> Self {
        Self {
            course_id: a.course_id,
            title: a.title.clone(),
            kind: a.kind,
            priority: a.priority,
            due_date: a.due_date,
            points: a.points,
            earned_points: a.earned_points,
            completed: a.completed,
        }
    }
}
