//! Storage seam. Every backend implements [`Repository`] for each record
//! kind and is handed to the API as a [`Store`].

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{
    Assignment, AssignmentDraft, Course, CourseDraft, Student, StudentDraft, StudySession,
    StudySessionDraft,
};

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

/// A stored record and the id-less shape used to create or replace it.
pub trait Record: Clone + Send + Sync + 'static {
    type Draft: Clone + Send + Sync + 'static;

    const KIND: &'static str;

    fn id(&self) -> i64;
    fn from_draft(id: i64, draft: Self::Draft) -> Self;
}

impl Record for Course {
    type Draft = CourseDraft;
    const KIND: &'static str = "course";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, draft: CourseDraft) -> Self {
        draft.into_course(id)
    }
}

impl Record for Assignment {
    type Draft = AssignmentDraft;
    const KIND: &'static str = "assignment";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, draft: AssignmentDraft) -> Self {
        draft.into_assignment(id)
    }
}

impl Record for StudySession {
    type Draft = StudySessionDraft;
    const KIND: &'static str = "study session";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, draft: StudySessionDraft) -> Self {
        draft.into_session(id)
    }
}

impl Record for Student {
    type Draft = StudentDraft;
    const KIND: &'static str = "student";

    fn id(&self) -> i64 {
        self.id
    }

    fn from_draft(id: i64, draft: StudentDraft) -> Self {
        draft.into_student(id)
    }
}

#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn get_all(&self) -> Result<Vec<T>, AppError>;
    async fn get_by_id(&self, id: i64) -> Result<Option<T>, AppError>;
    async fn create(&self, draft: T::Draft) -> Result<T, AppError>;
    /// Replaces the record. `None` when no record has this id.
    async fn update(&self, id: i64, draft: T::Draft) -> Result<Option<T>, AppError>;
    /// `false` when no record has this id.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct Store {
    pub courses: Arc<dyn Repository<Course>>,
    pub assignments: Arc<dyn Repository<Assignment>>,
    pub study_sessions: Arc<dyn Repository<StudySession>>,
    pub students: Arc<dyn Repository<Student>>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            courses: Arc::new(InMemoryRepository::<Course>::new()),
            assignments: Arc::new(InMemoryRepository::<Assignment>::new()),
            study_sessions: Arc::new(InMemoryRepository::<StudySession>::new()),
            students: Arc::new(InMemoryRepository::<Student>::new()),
        }
    }

    pub fn sqlite(db: SqlitePool) -> Self {
        let repo = Arc::new(SqliteRepository::new(db));
        Self {
            courses: repo.clone(),
            assignments: repo.clone(),
            study_sessions: repo.clone(),
            students: repo,
        }
    }
}
