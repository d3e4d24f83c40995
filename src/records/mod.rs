//! Client for the hosted generic record-storage backend.

pub mod dto;
pub mod mapping;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::{Repository, Store};
use crate::error::AppError;
use crate::models::{Assignment, Course, Student, StudySession};

pub use mapping::HostedRecord;

const PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct RecordsConfig {
    pub api_url: String,
    pub project_id: String,
    pub public_key: String,
}

/// The five operations the hosted backend offers on any table.
#[async_trait]
pub trait RecordsClient: Send + Sync {
    async fn fetch_records(&self, table: &str, params: &dto::FetchParams) -> Result<Vec<Value>, AppError>;
    async fn get_record_by_id(
        &self,
        table: &str,
        id: i64,
        fields: &[dto::FieldSpec],
    ) -> Result<Option<Value>, AppError>;
    async fn create_record(&self, table: &str, record: Value) -> Result<Value, AppError>;
    async fn update_record(&self, table: &str, record: Value) -> Result<Value, AppError>;
    async fn delete_record(&self, table: &str, id: i64) -> Result<bool, AppError>;
}

pub struct RecordsHttpClient {
    client: Client,
    config: RecordsConfig,
}

impl RecordsHttpClient {
    pub fn new(config: RecordsConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/tables/{}/records", self.config.api_url, table)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<dto::Envelope, AppError> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.config.public_key))
            .header("X-Project-Id", &self.config.project_id)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        let envelope: dto::Envelope = response.json().await?;
        if !envelope.success {
            return Err(AppError::Upstream(
                envelope.message.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        Ok(envelope)
    }
}

/// First successful per-record result; any failed one fails the call.
fn single_result(envelope: dto::Envelope, action: &str, table: &str) -> Result<Value, AppError> {
    let results = envelope
        .results
        .ok_or_else(|| AppError::Upstream(format!("{} {}: no response data", action, table)))?;

    let failed: Vec<&dto::RecordResult> = results.iter().filter(|r| !r.success).collect();
    if !failed.is_empty() {
        let reasons: Vec<&str> = failed.iter().filter_map(|r| r.message.as_deref()).collect();
        warn!("failed to {} {} record(s) in {}: {:?}", action, failed.len(), table, reasons);
        return Err(AppError::Upstream(format!(
            "failed to {} {} record: {}",
            action,
            table,
            reasons.join("; ")
        )));
    }

    results
        .into_iter()
        .find_map(|r| r.data)
        .ok_or_else(|| AppError::Upstream(format!("{} {}: no response data", action, table)))
}

#[async_trait]
impl RecordsClient for RecordsHttpClient {
    async fn fetch_records(&self, table: &str, params: &dto::FetchParams) -> Result<Vec<Value>, AppError> {
        let url = format!("{}/query", self.table_url(table));
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let mut page = params.clone();
            page.paging_info = Some(dto::PagingInfo { limit: PAGE_SIZE, offset });

            let envelope = self.send(self.client.post(&url).json(&page)).await?;
            let batch = match envelope.data {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(AppError::Upstream(format!(
                        "fetch {}: expected a list, got {}",
                        table, other
                    )));
                }
            };

            let received = batch.len();
            records.extend(batch);
            debug!("fetched {} records from {} (offset {})", received, table, offset);

            if received < PAGE_SIZE as usize {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(records)
    }

    async fn get_record_by_id(
        &self,
        table: &str,
        id: i64,
        fields: &[dto::FieldSpec],
    ) -> Result<Option<Value>, AppError> {
        let url = format!("{}/{}", self.table_url(table), id);
        let body = serde_json::json!({ "fields": fields });
        let envelope = self.send(self.client.post(&url).json(&body)).await?;
        Ok(envelope.data.filter(|d| !d.is_null()))
    }

    async fn create_record(&self, table: &str, record: Value) -> Result<Value, AppError> {
        let payload = dto::RecordsPayload { records: vec![record] };
        let envelope = self
            .send(self.client.post(self.table_url(table)).json(&payload))
            .await?;
        single_result(envelope, "create", table)
    }

    async fn update_record(&self, table: &str, record: Value) -> Result<Value, AppError> {
        let payload = dto::RecordsPayload { records: vec![record] };
        let envelope = self
            .send(self.client.patch(self.table_url(table)).json(&payload))
            .await?;
        single_result(envelope, "update", table)
    }

    async fn delete_record(&self, table: &str, id: i64) -> Result<bool, AppError> {
        let payload = dto::DeletePayload { record_ids: vec![id] };
        let envelope = self
            .send(self.client.delete(self.table_url(table)).json(&payload))
            .await?;

        let Some(results) = envelope.results else {
            return Ok(false);
        };
        if results.iter().any(|r| !r.success) {
            return Err(AppError::Upstream(format!("failed to delete {} record {}", table, id)));
        }
        Ok(!results.is_empty())
    }
}

/// [`Repository`] over one hosted table, mapping through [`HostedRecord`].
pub struct HostedRepository<T> {
    client: Arc<dyn RecordsClient>,
    _record: PhantomData<fn() -> T>,
}

impl<T: HostedRecord> HostedRepository<T> {
    pub fn new(client: Arc<dyn RecordsClient>) -> Self {
        Self { client, _record: PhantomData }
    }
}

fn returned_id(table: &str, data: &Value) -> Result<i64, AppError> {
    data.get("Id")
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::Upstream(format!("{}: created record has no Id", table)))
}

#[async_trait]
impl<T: HostedRecord> Repository<T> for HostedRepository<T> {
    async fn get_all(&self) -> Result<Vec<T>, AppError> {
        let params = dto::FetchParams {
            fields: T::fields(),
            order_by: vec![T::order_by()],
            paging_info: None,
        };
        let raw = self.client.fetch_records(T::TABLE, &params).await?;
        raw.into_iter()
            .map(|value| {
                T::from_hosted(value).inspect_err(|e| warn!("invalid {} from {}: {}", T::KIND, T::TABLE, e))
            })
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<T>, AppError> {
        self.client
            .get_record_by_id(T::TABLE, id, &T::fields())
            .await?
            .map(T::from_hosted)
            .transpose()
    }

    async fn create(&self, draft: T::Draft) -> Result<T, AppError> {
        let data = self.client.create_record(T::TABLE, T::to_hosted(&draft)).await?;
        let id = returned_id(T::TABLE, &data)?;
        debug!("created {} {} in {}", T::KIND, id, T::TABLE);
        Ok(T::from_draft(id, draft))
    }

    async fn update(&self, id: i64, draft: T::Draft) -> Result<Option<T>, AppError> {
        if self.get_by_id(id).await?.is_none() {
            return Ok(None);
        }
        let mut payload = T::to_hosted(&draft);
        if let Value::Object(fields) = &mut payload {
            fields.insert("Id".to_string(), Value::from(id));
        }
        self.client.update_record(T::TABLE, payload).await?;
        Ok(Some(T::from_draft(id, draft)))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        if self.get_by_id(id).await?.is_none() {
            return Ok(false);
        }
        self.client.delete_record(T::TABLE, id).await
    }
}

impl Store {
    pub fn hosted(client: Arc<dyn RecordsClient>) -> Self {
        Self {
            courses: Arc::new(HostedRepository::<Course>::new(client.clone())),
            assignments: Arc::new(HostedRepository::<Assignment>::new(client.clone())),
            study_sessions: Arc::new(HostedRepository::<StudySession>::new(client.clone())),
            students: Arc::new(HostedRepository::<Student>::new(client)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseDraft, StudentDraft};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tokio::sync::Mutex;

    /// Table-keyed map standing in for the hosted backend.
    #[derive(Default)]
    struct FakeRecordsClient {
        tables: Mutex<BTreeMap<String, Vec<Value>>>,
        next_id: Mutex<i64>,
    }

    impl FakeRecordsClient {
        async fn seed(&self, table: &str, record: Value) {
            self.tables.lock().await.entry(table.to_string()).or_default().push(record);
        }
    }

    #[async_trait]
    impl RecordsClient for FakeRecordsClient {
        async fn fetch_records(&self, table: &str, _params: &dto::FetchParams) -> Result<Vec<Value>, AppError> {
            Ok(self.tables.lock().await.get(table).cloned().unwrap_or_default())
        }

        async fn get_record_by_id(
            &self,
            table: &str,
            id: i64,
            _fields: &[dto::FieldSpec],
        ) -> Result<Option<Value>, AppError> {
            let tables = self.tables.lock().await;
            Ok(tables
                .get(table)
                .and_then(|rows| rows.iter().find(|r| r["Id"] == json!(id)).cloned()))
        }

        async fn create_record(&self, table: &str, mut record: Value) -> Result<Value, AppError> {
            let mut next_id = self.next_id.lock().await;
            *next_id += 1;
            record["Id"] = json!(*next_id);
            self.seed(table, record.clone()).await;
            Ok(record)
        }

        async fn update_record(&self, table: &str, record: Value) -> Result<Value, AppError> {
            let mut tables = self.tables.lock().await;
            let rows = tables.entry(table.to_string()).or_default();
            let slot = rows
                .iter_mut()
                .find(|r| r["Id"] == record["Id"])
                .ok_or(AppError::NotFound)?;
            *slot = record.clone();
            Ok(record)
        }

        async fn delete_record(&self, table: &str, id: i64) -> Result<bool, AppError> {
            let mut tables = self.tables.lock().await;
            let rows = tables.entry(table.to_string()).or_default();
            let before = rows.len();
            rows.retain(|r| r["Id"] != json!(id));
            Ok(rows.len() < before)
        }
    }

    fn course_draft() -> CourseDraft {
        CourseDraft {
            name: "Microeconomics".to_string(),
            code: "ECON 101".to_string(),
            professor: "Dr. Mensah".to_string(),
            semester: "Fall 2024".to_string(),
            credits: 3,
            current_grade: 84.0,
            target_grade: 90.0,
        }
    }

    #[tokio::test]
    async fn test_create_then_read_back_through_adapter() {
        let client = Arc::new(FakeRecordsClient::default());
        let repo = HostedRepository::<Course>::new(client.clone());

        let created = repo.create(course_draft()).await.expect("create");
        assert_eq!(created.id, 1);

        {
            let tables = client.tables.lock().await;
            let stored = &tables["course_c"][0];
            assert_eq!(stored["name_c"], "Microeconomics");
            assert_eq!(stored["Name"], "Microeconomics");
        }

        let all = repo.get_all().await.expect("fetch");
        assert_eq!(all, vec![created]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_records() {
        let client = Arc::new(FakeRecordsClient::default());
        let repo = HostedRepository::<Student>::new(client.clone());
        let draft = StudentDraft {
            first_name: "Iris".to_string(),
            last_name: "Moreau".to_string(),
            email: Some("iris@example.edu".to_string()),
            phone_number: None,
            tags: String::new(),
        };

        assert!(repo.update(99, draft.clone()).await.expect("update").is_none());
        assert!(!repo.delete(99).await.expect("delete"));

        let student = repo.create(draft.clone()).await.expect("create");
        let mut renamed = draft;
        renamed.last_name = "Moreau-Blanc".to_string();
        let updated = repo.update(student.id, renamed).await.expect("update").expect("present");
        assert_eq!(updated.last_name, "Moreau-Blanc");

        let fetched = repo.get_by_id(student.id).await.expect("get").expect("present");
        assert_eq!(fetched.last_name, "Moreau-Blanc");
        assert!(repo.delete(student.id).await.expect("delete"));
    }

    #[tokio::test]
    async fn test_malformed_remote_record_fails_the_fetch() {
        let client = Arc::new(FakeRecordsClient::default());
        client
            .seed("assignment_c", json!({ "Id": 1, "title_c": "Orphan", "type_c": "Quiz" }))
            .await;
        let repo = HostedRepository::<Assignment>::new(client);

        assert!(matches!(repo.get_all().await, Err(AppError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_hosted_store_wires_every_table() {
        let client = Arc::new(FakeRecordsClient::default());
        let store = Store::hosted(client.clone());
        store.courses.create(course_draft()).await.expect("create");

        assert_eq!(store.courses.get_all().await.expect("fetch").len(), 1);
        assert!(store.students.get_all().await.expect("fetch").is_empty());
    }

    #[test]
    fn failed_result_is_an_upstream_error() {
        let envelope: dto::Envelope = serde_json::from_value(json!({
            "success": true,
            "results": [{ "success": false, "message": "duplicate code" }]
        }))
        .expect("envelope");
        let err = single_result(envelope, "create", "course_c").unwrap_err();
        assert!(err.to_string().contains("duplicate code"));
    }

    #[test]
    fn fetch_params_serialize_like_the_backend_expects() {
        let params = dto::FetchParams {
            fields: Assignment::fields(),
            order_by: vec![Assignment::order_by()],
            paging_info: Some(dto::PagingInfo { limit: 100, offset: 0 }),
        };
        let body = serde_json::to_value(&params).expect("serialize");
        assert_eq!(body["orderBy"][0]["fieldName"], "due_date_c");
        assert_eq!(body["orderBy"][0]["sorttype"], "ASC");
        assert_eq!(body["pagingInfo"]["limit"], 100);
        let lookup = body["fields"].as_array().expect("fields").last().expect("lookup").clone();
        assert_eq!(lookup["field"]["Name"], "course_id_c");
        assert_eq!(lookup["referenceField"]["field"]["Name"], "name_c");
    }
}
