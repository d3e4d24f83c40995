use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::Repository;
use crate::error::AppError;
use crate::models::{
    Assignment, AssignmentDraft, Course, CourseDraft, Student, StudentDraft, StudySession,
    StudySessionDraft, check_storable,
};

/// Local persistent store. One pool serves every record kind.
#[derive(Clone)]
pub struct SqliteRepository {
    db: SqlitePool,
}

impl SqliteRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

pub async fn run_migrations(db: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(db).await?;
    Ok(())
}

fn format_timestamp(field: &str, ts: &DateTime<Utc>) -> Result<String, AppError> {
    check_storable(field, ts)?;
    Ok(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_timestamp(kind: &str, id: i64, raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::InvalidRecord(format!("{} {}: bad timestamp {:?}: {}", kind, id, raw, e)))
}

fn to_u32(kind: &str, id: i64, field: &str, value: i64) -> Result<u32, AppError> {
    u32::try_from(value).map_err(|_| {
        AppError::InvalidRecord(format!("{} {}: {} out of range: {}", kind, id, field, value))
    })
}

#[derive(Debug, FromRow)]
struct CourseRow {
    id: i64,
    name: String,
    code: String,
    professor: String,
    semester: String,
    credits: i64,
    current_grade: f64,
    target_grade: f64,
}

impl TryFrom<CourseRow> for Course {
    type Error = AppError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(Course {
            id: row.id,
            credits: to_u32("course", row.id, "credits", row.credits)?,
            name: row.name,
            code: row.code,
            professor: row.professor,
            semester: row.semester,
            current_grade: row.current_grade,
            target_grade: row.target_grade,
        })
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: i64,
    course_id: i64,
    title: String,
    kind: String,
    priority: String,
    due_date: String,
    points: f64,
    earned_points: Option<f64>,
    completed: bool,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(Assignment {
            id: row.id,
            course_id: row.course_id,
            kind: row.kind.parse()?,
            priority: row.priority.parse()?,
            due_date: parse_timestamp("assignment", row.id, &row.due_date)?,
            title: row.title,
            points: row.points,
            earned_points: row.earned_points,
            completed: row.completed,
        })
    }
}

#[derive(Debug, FromRow)]
struct StudySessionRow {
    id: i64,
    course_id: i64,
    duration: i64,
    date: String,
    notes: String,
}

impl TryFrom<StudySessionRow> for StudySession {
    type Error = AppError;

    fn try_from(row: StudySessionRow) -> Result<Self, Self::Error> {
        Ok(StudySession {
            id: row.id,
            course_id: row.course_id,
            duration: to_u32("study session", row.id, "duration", row.duration)?,
            date: parse_timestamp("study session", row.id, &row.date)?,
            notes: row.notes,
        })
    }
}

#[derive(Debug, FromRow)]
struct StudentRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone_number: Option<String>,
    tags: String,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone_number: row.phone_number,
            tags: row.tags,
        }
    }
}

const COURSE_COLUMNS: &str =
    "id, name, code, professor, semester, credits, current_grade, target_grade";
const ASSIGNMENT_COLUMNS: &str =
    "id, course_id, title, kind, priority, due_date, points, earned_points, completed";
const STUDY_SESSION_COLUMNS: &str = "id, course_id, duration, date, notes";
const STUDENT_COLUMNS: &str = "id, first_name, last_name, email, phone_number, tags";

#[async_trait]
impl Repository<Course> for SqliteRepository {
    async fn get_all(&self) -> Result<Vec<Course>, AppError> {
        let sql = format!("SELECT {} FROM courses ORDER BY name ASC, id ASC", COURSE_COLUMNS);
        sqlx::query_as::<_, CourseRow>(&sql)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(Course::try_from)
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Course>, AppError> {
        let sql = format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS);
        sqlx::query_as::<_, CourseRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Course::try_from)
            .transpose()
    }

    async fn create(&self, draft: CourseDraft) -> Result<Course, AppError> {
        let id = sqlx::query(
            "INSERT INTO courses (name, code, professor, semester, credits, current_grade, target_grade) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&draft.name)
        .bind(&draft.code)
        .bind(&draft.professor)
        .bind(&draft.semester)
        .bind(i64::from(draft.credits))
        .bind(draft.current_grade)
        .bind(draft.target_grade)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        debug!("inserted course {}", id);
        Ok(draft.into_course(id))
    }

    async fn update(&self, id: i64, draft: CourseDraft) -> Result<Option<Course>, AppError> {
        let affected = sqlx::query(
            "UPDATE courses SET name = ?, code = ?, professor = ?, semester = ?, credits = ?, current_grade = ?, target_grade = ? WHERE id = ?"
        )
        .bind(&draft.name)
        .bind(&draft.code)
        .bind(&draft.professor)
        .bind(&draft.semester)
        .bind(i64::from(draft.credits))
        .bind(draft.current_grade)
        .bind(draft.target_grade)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        Ok((affected > 0).then(|| draft.into_course(id)))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let affected = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository<Assignment> for SqliteRepository {
    async fn get_all(&self) -> Result<Vec<Assignment>, AppError> {
        let sql = format!(
            "SELECT {} FROM assignments ORDER BY due_date ASC, id ASC",
            ASSIGNMENT_COLUMNS
        );
        sqlx::query_as::<_, AssignmentRow>(&sql)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(Assignment::try_from)
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Assignment>, AppError> {
        let sql = format!("SELECT {} FROM assignments WHERE id = ?", ASSIGNMENT_COLUMNS);
        sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Assignment::try_from)
            .transpose()
    }

    async fn create(&self, draft: AssignmentDraft) -> Result<Assignment, AppError> {
        let id = sqlx::query(
            "INSERT INTO assignments (course_id, title, kind, priority, due_date, points, earned_points, completed) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(draft.course_id)
        .bind(&draft.title)
        .bind(draft.kind.as_str())
        .bind(draft.priority.as_str())
        .bind(format_timestamp("dueDate", &draft.due_date)?)
        .bind(draft.points)
        .bind(draft.earned_points)
        .bind(draft.completed)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        debug!("inserted assignment {}", id);
        Ok(draft.into_assignment(id))
    }

    async fn update(&self, id: i64, draft: AssignmentDraft) -> Result<Option<Assignment>, AppError> {
        let affected = sqlx::query(
            "UPDATE assignments SET course_id = ?, title = ?, kind = ?, priority = ?, due_date = ?, points = ?, earned_points = ?, completed = ? WHERE id = ?"
        )
        .bind(draft.course_id)
        .bind(&draft.title)
        .bind(draft.kind.as_str())
        .bind(draft.priority.as_str())
        .bind(format_timestamp("dueDate", &draft.due_date)?)
        .bind(draft.points)
        .bind(draft.earned_points)
        .bind(draft.completed)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        Ok((affected > 0).then(|| draft.into_assignment(id)))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let affected = sqlx::query("DELETE FROM assignments WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository<StudySession> for SqliteRepository {
    async fn get_all(&self) -> Result<Vec<StudySession>, AppError> {
        let sql = format!(
            "SELECT {} FROM study_sessions ORDER BY date DESC, id DESC",
            STUDY_SESSION_COLUMNS
        );
        sqlx::query_as::<_, StudySessionRow>(&sql)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(StudySession::try_from)
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<StudySession>, AppError> {
        let sql = format!("SELECT {} FROM study_sessions WHERE id = ?", STUDY_SESSION_COLUMNS);
        sqlx::query_as::<_, StudySessionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(StudySession::try_from)
            .transpose()
    }

    async fn create(&self, draft: StudySessionDraft) -> Result<StudySession, AppError> {
        let id = sqlx::query(
            "INSERT INTO study_sessions (course_id, duration, date, notes) VALUES (?, ?, ?, ?)"
        )
        .bind(draft.course_id)
        .bind(i64::from(draft.duration))
        .bind(format_timestamp("date", &draft.date)?)
        .bind(&draft.notes)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        debug!("inserted study session {}", id);
        Ok(draft.into_session(id))
    }

    async fn update(
        &self,
        id: i64,
        draft: StudySessionDraft,
    ) -> Result<Option<StudySession>, AppError> {
        let affected = sqlx::query(
            "UPDATE study_sessions SET course_id = ?, duration = ?, date = ?, notes = ? WHERE id = ?"
        )
        .bind(draft.course_id)
        .bind(i64::from(draft.duration))
        .bind(format_timestamp("date", &draft.date)?)
        .bind(&draft.notes)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        Ok((affected > 0).then(|| draft.into_session(id)))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let affected = sqlx::query("DELETE FROM study_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository<Student> for SqliteRepository {
    async fn get_all(&self) -> Result<Vec<Student>, AppError> {
        let sql = format!(
            "SELECT {} FROM students ORDER BY last_name ASC, first_name ASC, id ASC",
            STUDENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, StudentRow>(&sql)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(Student::from)
            .collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Student>, AppError> {
        let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
        Ok(sqlx::query_as::<_, StudentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(Student::from))
    }

    async fn create(&self, draft: StudentDraft) -> Result<Student, AppError> {
        let id = sqlx::query(
            "INSERT INTO students (first_name, last_name, email, phone_number, tags) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.email)
        .bind(&draft.phone_number)
        .bind(&draft.tags)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        debug!("inserted student {}", id);
        Ok(draft.into_student(id))
    }

    async fn update(&self, id: i64, draft: StudentDraft) -> Result<Option<Student>, AppError> {
        let affected = sqlx::query(
            "UPDATE students SET first_name = ?, last_name = ?, email = ?, phone_number = ?, tags = ? WHERE id = ?"
        )
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.email)
        .bind(&draft.phone_number)
        .bind(&draft.tags)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        Ok((affected > 0).then(|| draft.into_student(id)))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let affected = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentKind, Priority};
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqliteRepository {
        // a single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        run_migrations(&pool).await.expect("Failed to run migrations");

        SqliteRepository::new(pool)
    }

    fn course_draft(name: &str) -> CourseDraft {
        CourseDraft {
            name: name.to_string(),
            code: "CHEM 101".to_string(),
            professor: "Dr. Haddad".to_string(),
            semester: "Spring 2025".to_string(),
            credits: 4,
            current_grade: 91.5,
            target_grade: 95.0,
        }
    }

    fn assignment_draft(course_id: i64, day: u32) -> AssignmentDraft {
        AssignmentDraft {
            course_id,
            title: format!("Lab {}", day),
            kind: AssignmentKind::Project,
            priority: Priority::High,
            due_date: Utc.with_ymd_and_hms(2025, 3, day, 17, 0, 0).unwrap(),
            points: 25.0,
            earned_points: None,
            completed: false,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_course() {
        let repo = setup_test_db().await;

        let course = Repository::<Course>::create(&repo, course_draft("General Chemistry"))
            .await
            .expect("Failed to insert course");
        assert_eq!(course.name, "General Chemistry");

        let courses = Repository::<Course>::get_all(&repo).await.expect("Failed to fetch courses");
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0], course);
    }

    #[tokio::test]
    async fn test_update_and_delete_course() {
        let repo = setup_test_db().await;
        let course = Repository::<Course>::create(&repo, course_draft("Organic Chemistry"))
            .await
            .expect("Failed to insert course");

        let mut changed = course_draft("Organic Chemistry II");
        changed.current_grade = 78.0;
        let updated = Repository::<Course>::update(&repo, course.id, changed)
            .await
            .expect("Failed to update course")
            .expect("Course not found");
        assert_eq!(updated.current_grade, 78.0);

        let missing = Repository::<Course>::update(&repo, 999, course_draft("x"))
            .await
            .expect("update");
        assert!(missing.is_none());

        assert!(Repository::<Course>::delete(&repo, course.id).await.expect("delete"));
        let gone = Repository::<Course>::get_by_id(&repo, course.id).await.expect("get");
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_assignments_round_trip_timestamps_and_sort_by_due_date() {
        let repo = setup_test_db().await;

        let later = Repository::<Assignment>::create(&repo, assignment_draft(1, 20))
            .await
            .expect("insert");
        let mut graded = assignment_draft(1, 5);
        graded.earned_points = Some(22.5);
        graded.completed = true;
        let earlier = Repository::<Assignment>::create(&repo, graded).await.expect("insert");

        let all = Repository::<Assignment>::get_all(&repo).await.expect("fetch");
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![earlier.id, later.id]);
        assert_eq!(all[0].due_date, earlier.due_date);
        assert_eq!(all[0].earned_points, Some(22.5));
        assert!(all[0].completed);
        assert_eq!(all[1].kind, AssignmentKind::Project);
    }

    #[tokio::test]
    async fn test_corrupt_due_date_fails_loudly() {
        let repo = setup_test_db().await;
        sqlx::query(
            "INSERT INTO assignments (course_id, title, kind, priority, due_date, points, completed) VALUES (1, 'x', 'Quiz', 'Low', 'next tuesday', 10, 0)"
        )
        .execute(&repo.db)
        .await
        .expect("raw insert");

        let result = Repository::<Assignment>::get_all(&repo).await;
        assert!(matches!(result, Err(AppError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_far_future_due_dates_stay_readable() {
        let repo = setup_test_db().await;

        let mut last_year = assignment_draft(1, 1);
        last_year.due_date = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        let stored = Repository::<Assignment>::create(&repo, last_year)
            .await
            .expect("Failed to insert assignment");

        let mut too_far = assignment_draft(1, 2);
        too_far.due_date = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        let rejected = Repository::<Assignment>::create(&repo, too_far.clone()).await;
        assert!(matches!(rejected, Err(AppError::BadRequest(_))));
        let rejected = Repository::<Assignment>::update(&repo, stored.id, too_far).await;
        assert!(matches!(rejected, Err(AppError::BadRequest(_))));

        let all = Repository::<Assignment>::get_all(&repo)
            .await
            .expect("Failed to fetch assignments");
        assert_eq!(all, vec![stored]);
    }

    #[tokio::test]
    async fn test_sessions_and_students() {
        let repo = setup_test_db().await;

        let session = Repository::<StudySession>::create(
            &repo,
            StudySessionDraft {
                course_id: 1,
                duration: 1500,
                date: Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap(),
                notes: String::new(),
            },
        )
        .await
        .expect("insert session");
        let fetched = Repository::<StudySession>::get_by_id(&repo, session.id)
            .await
            .expect("get");
        assert_eq!(fetched, Some(session));

        let student = Repository::<Student>::create(
            &repo,
            StudentDraft {
                first_name: "Tomasz".to_string(),
                last_name: "Wójcik".to_string(),
                email: None,
                phone_number: Some("555-0134".to_string()),
                tags: String::new(),
            },
        )
        .await
        .expect("insert student");
        let students = Repository::<Student>::get_all(&repo).await.expect("fetch");
        assert_eq!(students, vec![student]);
    }
}
