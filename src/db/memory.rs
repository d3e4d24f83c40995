use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Record, Repository};
use crate::error::AppError;

/// Process-local store for fixtures and quick iteration.
///
/// Ids are handed out sequentially; `get_all` returns insertion order.
pub struct InMemoryRepository<T> {
    inner: RwLock<Inner<T>>,
}

struct Inner<T> {
    records: Vec<T>,
    next_id: i64,
}

impl<T: Record> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<T>) -> Self {
        let next_id = records.iter().map(Record::id).max().unwrap_or(0) + 1;
        Self {
            inner: RwLock::new(Inner { records, next_id }),
        }
    }
}

impl<T: Record> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> Repository<T> for InMemoryRepository<T> {
    async fn get_all(&self) -> Result<Vec<T>, AppError> {
        Ok(self.inner.read().await.records.clone())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<T>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.records.iter().find(|r| r.id() == id).cloned())
    }

    async fn create(&self, draft: T::Draft) -> Result<T, AppError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        let record = T::from_draft(id, draft);
        inner.records.push(record.clone());
        debug!("created {} {}", T::KIND, id);
        Ok(record)
    }

    async fn update(&self, id: i64, draft: T::Draft) -> Result<Option<T>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(slot) = inner.records.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        *slot = T::from_draft(id, draft);
        Ok(Some(slot.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner.records.retain(|r| r.id() != id);
        Ok(inner.records.len() < before)
    }
}
