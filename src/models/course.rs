use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub professor: String,
    pub semester: String,
    pub credits: u32,
    pub current_grade: f64,
    pub target_grade: f64,
}

/// Everything a course carries except its id. Used for both create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub professor: String,
    #[serde(default)]
    pub semester: String,
    pub credits: u32,
    pub current_grade: f64,
    pub target_grade: f64,
}

impl CourseDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("course name is required".to_string()));
        }
        if self.code.trim().is_empty() {
            return Err(AppError::BadRequest("course code is required".to_string()));
        }
        check_percentage("currentGrade", self.current_grade)?;
        check_percentage("targetGrade", self.target_grade)?;
        Ok(())
    }

    pub fn into_course(self, id: i64) -> Course {
        Course {
            id,
            name: self.name,
            code: self.code,
            professor: self.professor,
            semester: self.semester,
            credits: self.credits,
            current_grade: self.current_grade,
            target_grade: self.target_grade,
        }
    }
}

impl From<&Course> for CourseDraft {
    fn from(course: &Course) -> Self {
        Self {
            name: course.name.clone(),
            code: course.code.clone(),
            professor: course.professor.clone(),
            semester: course.semester.clone(),
            credits: course.credits,
            current_grade: course.current_grade,
            target_grade: course.target_grade,
        }
    }
}

fn check_percentage(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(AppError::BadRequest(format!(
            "{} must be a percentage between 0 and 100, got {}",
            field, value
        )));
    }
    Ok(())
}
