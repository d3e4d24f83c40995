//! Wire shapes of the hosted record-storage backend.
//!
//! Tables and fields follow the backend's naming (`course_c`, `due_date_c`,
//! `Id`, `Name`). Nothing outside `records` sees these types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct FieldRef {
    #[serde(rename = "Name")]
    pub name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub field: FieldRef,
    #[serde(rename = "referenceField", skip_serializing_if = "Option::is_none")]
    pub reference_field: Option<Box<FieldSpec>>,
}

impl FieldSpec {
    pub fn plain(name: &'static str) -> Self {
        Self { field: FieldRef { name }, reference_field: None }
    }

    pub fn lookup(name: &'static str, display: &'static str) -> Self {
        Self {
            field: FieldRef { name },
            reference_field: Some(Box::new(FieldSpec::plain(display))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum SortType {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBy {
    #[serde(rename = "fieldName")]
    pub field_name: &'static str,
    pub sorttype: SortType,
}

#[derive(Debug, Clone, Serialize)]
pub struct PagingInfo {
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchParams {
    pub fields: Vec<FieldSpec>,
    #[serde(rename = "orderBy", skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(rename = "pagingInfo", skip_serializing_if = "Option::is_none")]
    pub paging_info: Option<PagingInfo>,
}

#[derive(Debug, Serialize)]
pub struct RecordsPayload {
    pub records: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct DeletePayload {
    #[serde(rename = "RecordIds")]
    pub record_ids: Vec<i64>,
}

/// Envelope every backend call answers with.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub results: Option<Vec<RecordResult>>,
}

#[derive(Debug, Deserialize)]
pub struct RecordResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A reference field arrives either as a bare id or as `{Id, Name}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Lookup {
    Id(i64),
    Ref {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Name", default)]
        name: Option<String>,
    },
}

impl Lookup {
    pub fn id(&self) -> i64 {
        match self {
            Lookup::Id(id) => *id,
            Lookup::Ref { id, .. } => *id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CourseRecord {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_c: Option<String>,
    #[serde(default)]
    pub code_c: Option<String>,
    #[serde(default)]
    pub credits_c: Option<f64>,
    #[serde(default)]
    pub professor_c: Option<String>,
    #[serde(default)]
    pub semester_c: Option<String>,
    #[serde(default)]
    pub current_grade_c: Option<f64>,
    #[serde(default)]
    pub target_grade_c: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentRecord {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title_c: Option<String>,
    #[serde(default)]
    pub type_c: Option<String>,
    #[serde(default)]
    pub due_date_c: Option<String>,
    #[serde(default)]
    pub points_c: Option<f64>,
    #[serde(default)]
    pub earned_points_c: Option<f64>,
    #[serde(default)]
    pub completed_c: Option<bool>,
    #[serde(default)]
    pub priority_c: Option<String>,
    #[serde(default)]
    pub course_id_c: Option<Lookup>,
}

#[derive(Debug, Deserialize)]
pub struct StudySessionRecord {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(default)]
    pub duration_c: Option<f64>,
    #[serde(default)]
    pub date_c: Option<String>,
    #[serde(default)]
    pub notes_c: Option<String>,
    #[serde(default)]
    pub course_id_c: Option<Lookup>,
}

#[derive(Debug, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(default)]
    pub first_name_c: Option<String>,
    #[serde(default)]
    pub last_name_c: Option<String>,
    #[serde(default)]
    pub email_c: Option<String>,
    #[serde(default)]
    pub phone_number_c: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<String>,
}
