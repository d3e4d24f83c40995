//! Adapter between the hosted backend's records and canonical models.
//!
//! Required fields that are missing or unparsable are errors; the only
//! defaults are the ones the canonical model itself defines (empty
//! descriptive strings, `completed` implied by a recorded score).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::dto::{
    AssignmentRecord, CourseRecord, FieldSpec, OrderBy, SortType, StudentRecord,
    StudySessionRecord,
};
use crate::db::Record;
use crate::error::AppError;
use crate::models::{
    Assignment, AssignmentDraft, Course, CourseDraft, Student, StudentDraft, StudySession,
    StudySessionDraft,
};

pub trait HostedRecord: Record {
    const TABLE: &'static str;

    fn fields() -> Vec<FieldSpec>;
    fn order_by() -> OrderBy;
    fn from_hosted(raw: Value) -> Result<Self, AppError>;
    fn to_hosted(draft: &Self::Draft) -> Value;
}

fn decode<T: DeserializeOwned>(table: &str, raw: Value) -> Result<T, AppError> {
    serde_json::from_value(raw)
        .map_err(|e| AppError::InvalidRecord(format!("{}: malformed record: {}", table, e)))
}

fn required<T>(table: &str, id: i64, field: &str, value: Option<T>) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::InvalidRecord(format!("{} {}: missing {}", table, id, field)))
}

/// RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` read as UTC, or a bare date at
/// midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn timestamp(table: &str, id: i64, field: &str, raw: Option<String>) -> Result<DateTime<Utc>, AppError> {
    let raw = required(table, id, field, raw)?;
    parse_timestamp(&raw).ok_or_else(|| {
        AppError::InvalidRecord(format!("{} {}: unparsable {}: {:?}", table, id, field, raw))
    })
}

fn whole_number(table: &str, id: i64, field: &str, value: f64) -> Result<u32, AppError> {
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(AppError::InvalidRecord(format!(
            "{} {}: {} must be a non-negative whole number, got {}",
            table, id, field, value
        )));
    }
    Ok(value as u32)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl HostedRecord for Course {
    const TABLE: &'static str = "course_c";

    fn fields() -> Vec<FieldSpec> {
        [
            "Id",
            "Name",
            "name_c",
            "code_c",
            "credits_c",
            "professor_c",
            "semester_c",
            "current_grade_c",
            "target_grade_c",
        ]
        .into_iter()
        .map(FieldSpec::plain)
        .collect()
    }

    fn order_by() -> OrderBy {
        OrderBy { field_name: "Name", sorttype: SortType::Asc }
    }

    fn from_hosted(raw: Value) -> Result<Self, AppError> {
        let r: CourseRecord = decode(Self::TABLE, raw)?;
        let t = Self::TABLE;
        Ok(Course {
            id: r.id,
            name: required(t, r.id, "name_c", r.name_c.or(r.name))?,
            code: required(t, r.id, "code_c", r.code_c)?,
            professor: r.professor_c.unwrap_or_default(),
            semester: r.semester_c.unwrap_or_default(),
            credits: whole_number(t, r.id, "credits_c", required(t, r.id, "credits_c", r.credits_c)?)?,
            current_grade: required(t, r.id, "current_grade_c", r.current_grade_c)?,
            target_grade: required(t, r.id, "target_grade_c", r.target_grade_c)?,
        })
    }

    fn to_hosted(draft: &CourseDraft) -> Value {
        json!({
            "Name": draft.name,
            "name_c": draft.name,
            "code_c": draft.code,
            "credits_c": draft.credits,
            "professor_c": draft.professor,
            "semester_c": draft.semester,
            "current_grade_c": draft.current_grade,
            "target_grade_c": draft.target_grade,
        })
    }
}

impl HostedRecord for Assignment {
    const TABLE: &'static str = "assignment_c";

    fn fields() -> Vec<FieldSpec> {
        let mut fields: Vec<FieldSpec> = [
            "Id",
            "Name",
            "title_c",
            "type_c",
            "due_date_c",
            "points_c",
            "earned_points_c",
            "completed_c",
            "priority_c",
        ]
        .into_iter()
        .map(FieldSpec::plain)
        .collect();
        fields.push(FieldSpec::lookup("course_id_c", "name_c"));
        fields
    }

    fn order_by() -> OrderBy {
        OrderBy { field_name: "due_date_c", sorttype: SortType::Asc }
    }

    fn from_hosted(raw: Value) -> Result<Self, AppError> {
        let r: AssignmentRecord = decode(Self::TABLE, raw)?;
        let t = Self::TABLE;
        let earned_points = r.earned_points_c;
        Ok(Assignment {
            id: r.id,
            course_id: required(t, r.id, "course_id_c", r.course_id_c)?.id(),
            title: required(t, r.id, "title_c", r.title_c.or(r.name))?,
            kind: required(t, r.id, "type_c", r.type_c)?.parse()?,
            priority: required(t, r.id, "priority_c", r.priority_c)?.parse()?,
            due_date: timestamp(t, r.id, "due_date_c", r.due_date_c)?,
            points: required(t, r.id, "points_c", r.points_c)?,
            earned_points,
            completed: r.completed_c.unwrap_or(false) || earned_points.is_some(),
        })
    }

    fn to_hosted(draft: &AssignmentDraft) -> Value {
        json!({
            "Name": draft.title,
            "title_c": draft.title,
            "type_c": draft.kind.as_str(),
            "due_date_c": format_timestamp(&draft.due_date),
            "points_c": draft.points,
            "earned_points_c": draft.earned_points,
            "completed_c": draft.completed,
            "priority_c": draft.priority.as_str(),
            "course_id_c": draft.course_id,
        })
    }
}

impl HostedRecord for StudySession {
    const TABLE: &'static str = "study_session_c";

    fn fields() -> Vec<FieldSpec> {
        let mut fields: Vec<FieldSpec> = ["Id", "Name", "duration_c", "date_c", "notes_c"]
            .into_iter()
            .map(FieldSpec::plain)
            .collect();
        fields.push(FieldSpec::lookup("course_id_c", "name_c"));
        fields
    }

    fn order_by() -> OrderBy {
        OrderBy { field_name: "date_c", sorttype: SortType::Desc }
    }

    fn from_hosted(raw: Value) -> Result<Self, AppError> {
        let r: StudySessionRecord = decode(Self::TABLE, raw)?;
        let t = Self::TABLE;
        Ok(StudySession {
            id: r.id,
            course_id: required(t, r.id, "course_id_c", r.course_id_c)?.id(),
            duration: whole_number(t, r.id, "duration_c", required(t, r.id, "duration_c", r.duration_c)?)?,
            date: timestamp(t, r.id, "date_c", r.date_c)?,
            notes: r.notes_c.unwrap_or_default(),
        })
    }

    fn to_hosted(draft: &StudySessionDraft) -> Value {
        json!({
            "Name": format!("Study Session - {}", draft.date.format("%Y-%m-%d")),
            "duration_c": draft.duration,
            "date_c": format_timestamp(&draft.date),
            "notes_c": draft.notes,
            "course_id_c": draft.course_id,
        })
    }
}

impl HostedRecord for Student {
    const TABLE: &'static str = "student_c";

    fn fields() -> Vec<FieldSpec> {
        [
            "Id",
            "Name",
            "Tags",
            "first_name_c",
            "last_name_c",
            "email_c",
            "phone_number_c",
        ]
        .into_iter()
        .map(FieldSpec::plain)
        .collect()
    }

    fn order_by() -> OrderBy {
        OrderBy { field_name: "last_name_c", sorttype: SortType::Asc }
    }

    fn from_hosted(raw: Value) -> Result<Self, AppError> {
        let r: StudentRecord = decode(Self::TABLE, raw)?;
        let t = Self::TABLE;
        Ok(Student {
            id: r.id,
            first_name: required(t, r.id, "first_name_c", r.first_name_c)?,
            last_name: required(t, r.id, "last_name_c", r.last_name_c)?,
            email: r.email_c.filter(|e| !e.is_empty()),
            phone_number: r.phone_number_c.filter(|p| !p.is_empty()),
            tags: r.tags.unwrap_or_default(),
        })
    }

    fn to_hosted(draft: &StudentDraft) -> Value {
        json!({
            "Name": format!("{} {}", draft.first_name, draft.last_name).trim(),
            "first_name_c": draft.first_name,
            "last_name_c": draft.last_name,
            "email_c": draft.email.clone().unwrap_or_default(),
            "phone_number_c": draft.phone_number.clone().unwrap_or_default(),
            "Tags": draft.tags,
        })
    }
}
