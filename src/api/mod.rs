use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;
use crate::metrics::{FilterCriteria, MetricsError};
use crate::models::*;
use crate::services::{
    AssignmentView, CalendarView, DashboardService, DashboardView, GradesView, TimerStatus,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route(
            "/assignments/{id}",
            get(get_assignment).put(update_assignment).delete(delete_assignment),
        )
        .route("/assignments/{id}/toggle", post(toggle_assignment))
        .route(
            "/study-sessions",
            get(list_study_sessions).post(create_study_session),
        )
        .route(
            "/study-sessions/{id}",
            get(get_study_session).delete(delete_study_session),
        )
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/dashboard", get(dashboard))
        .route("/grades", get(grades))
        .route("/calendar", get(calendar))
        .route("/timer", get(timer_status))
        .route("/timer/course", put(timer_select_course))
        .route("/timer/toggle", post(timer_toggle))
        .route("/timer/reset", post(timer_reset))
        .route("/timer/tick", post(timer_tick))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.store.courses.ping().await?;
    Ok(StatusCode::OK)
}

fn deleted(found: bool) -> Result<StatusCode, AppError> {
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// courses

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = state.store.courses.get_all().await?;
    Ok(Json(courses))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Course>, AppError> {
    let course = state.store.courses.get_by_id(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<CourseDraft>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    req.validate()?;
    let course = state.store.courses.create(req).await?;
    info!("created course {} ({})", course.id, course.code);
    Ok((StatusCode::CREATED, Json(course)))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CourseDraft>,
) -> Result<Json<Course>, AppError> {
    req.validate()?;
    let course = state.store.courses.update(id, req).await?.ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    deleted(state.store.courses.delete(id).await?)
}

// assignments

#[derive(Debug, Deserialize)]
struct AssignmentQuery {
    course_id: Option<i64>,
    status: Option<String>,
    priority: Option<String>,
}

impl AssignmentQuery {
    fn criteria(&self) -> Result<FilterCriteria, MetricsError> {
        Ok(FilterCriteria {
            course_id: self.course_id,
            status: self.status.as_deref().unwrap_or("all").parse()?,
            priority: self.priority.as_deref().unwrap_or("all").parse()?,
        })
    }
}

async fn list_assignments(
    State(state): State<AppState>,
    Query(params): Query<AssignmentQuery>,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    let criteria = params.criteria()?;
    let now = state.clock.now();
    let views = DashboardService::new(state.store.clone())
        .assignments(&criteria, now)
        .await?;
    Ok(Json(views))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = state
        .store
        .assignments
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(assignment))
}

async fn create_assignment(
    State(state): State<AppState>,
    Json(req): Json<AssignmentDraft>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let req = req.normalize();
    req.validate()?;
    let assignment = state.store.assignments.create(req).await?;
    info!("created assignment {} for course {}", assignment.id, assignment.course_id);
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn update_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AssignmentDraft>,
) -> Result<Json<Assignment>, AppError> {
    let req = req.normalize();
    req.validate()?;
    let assignment = state
        .store
        .assignments
        .update(id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(assignment))
}

/// Flips `completed`. A graded assignment stays completed.
async fn toggle_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Assignment>, AppError> {
    let current = state
        .store
        .assignments
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut draft = AssignmentDraft::from(&current);
    draft.completed = !current.completed;
    draft.validate()?;

    let assignment = state
        .store
        .assignments
        .update(id, draft)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(assignment))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    deleted(state.store.assignments.delete(id).await?)
}

// study sessions

async fn list_study_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudySession>>, AppError> {
    let sessions = state.store.study_sessions.get_all().await?;
    Ok(Json(sessions))
}

async fn get_study_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StudySession>, AppError> {
    let session = state
        .store
        .study_sessions
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(session))
}

async fn create_study_session(
    State(state): State<AppState>,
    Json(req): Json<StudySessionDraft>,
) -> Result<(StatusCode, Json<StudySession>), AppError> {
    req.validate()?;
    let session = state.store.study_sessions.create(req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn delete_study_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    deleted(state.store.study_sessions.delete(id).await?)
}

// students

async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<Student>>, AppError> {
    let students = state.store.students.get_all().await?;
    Ok(Json(students))
}

async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Student>, AppError> {
    let student = state.store.students.get_by_id(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(student))
}

async fn create_student(
    State(state): State<AppState>,
    Json(req): Json<StudentDraft>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let req = req.normalize();
    req.validate()?;
    let student = state.store.students.create(req).await?;
    info!("created student {} ({})", student.id, student.display_name());
    Ok((StatusCode::CREATED, Json(student)))
}

async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StudentDraft>,
) -> Result<Json<Student>, AppError> {
    let req = req.normalize();
    req.validate()?;
    let student = state
        .store
        .students
        .update(id, req)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(student))
}

async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    deleted(state.store.students.delete(id).await?)
}

// views

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardView>, AppError> {
    let view = DashboardService::new(state.store.clone())
        .overview(state.clock.now(), state.config.target_gpa)
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct GradesQuery {
    semester: Option<String>,
}

async fn grades(
    State(state): State<AppState>,
    Query(params): Query<GradesQuery>,
) -> Result<Json<GradesView>, AppError> {
    let view = DashboardService::new(state.store.clone())
        .grades(params.semester.as_deref())
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct CalendarQuery {
    year: Option<i32>,
    month: Option<u32>,
}

/// Defaults to the viewer's current month.
async fn calendar(
    State(state): State<AppState>,
    Query(params): Query<CalendarQuery>,
) -> Result<Json<CalendarView>, AppError> {
    let now = state.clock.now();
    let today = now.with_timezone(&state.config.utc_offset).date_naive();
    let year = params.year.unwrap_or(today.year());
    let month = params.month.unwrap_or(today.month());

    let view = DashboardService::new(state.store.clone())
        .calendar(year, month, state.config.week_start, &state.config.utc_offset, now)
        .await?;
    Ok(Json(view))
}

// study timer

async fn timer_status(State(state): State<AppState>) -> Json<TimerStatus> {
    Json(state.timer.lock().await.status())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectCourseRequest {
    course_id: Option<i64>,
}

async fn timer_select_course(
    State(state): State<AppState>,
    Json(req): Json<SelectCourseRequest>,
) -> Result<Json<TimerStatus>, AppError> {
    if let Some(course_id) = req.course_id {
        state
            .store
            .courses
            .get_by_id(course_id)
            .await?
            .ok_or(AppError::NotFound)?;
    }

    let mut timer = state.timer.lock().await;
    timer.select_course(req.course_id)?;
    Ok(Json(timer.status()))
}

async fn timer_toggle(State(state): State<AppState>) -> Result<Json<TimerStatus>, AppError> {
    let mut timer = state.timer.lock().await;
    timer.toggle()?;
    Ok(Json(timer.status()))
}

async fn timer_reset(State(state): State<AppState>) -> Json<TimerStatus> {
    let mut timer = state.timer.lock().await;
    timer.reset();
    Json(timer.status())
}

#[derive(Debug, Deserialize)]
struct TickRequest {
    seconds: u32,
}

#[derive(Debug, Serialize)]
struct TickResponse {
    timer: TimerStatus,
    session: Option<StudySession>,
}

/// Advances the timer; a finished study phase is stored as a session.
///
/// When the session cannot be stored the timer is put back to where it was
/// before the tick, so the finished cycle can be ticked and saved again.
async fn timer_tick(
    State(state): State<AppState>,
    Json(req): Json<TickRequest>,
) -> Result<Json<TickResponse>, AppError> {
    let (before, after, completed) = {
        let mut timer = state.timer.lock().await;
        let before = timer.clone();
        let completed = timer.tick(req.seconds, state.clock.now());
        (before, timer.clone(), completed)
    };

    let session = match completed {
        Some(done) => match state.store.study_sessions.create(done.into()).await {
            Ok(session) => {
                info!("study session {} recorded for course {}", session.id, session.course_id);
                Some(session)
            }
            Err(e) => {
                let mut timer = state.timer.lock().await;
                // leave it alone if another request moved it meanwhile
                if *timer == after {
                    *timer = before;
                }
                warn!("study session not recorded, timer rolled back: {}", e);
                return Err(e);
            }
        },
        None => None,
    };

    Ok(Json(TickResponse { timer: after.status(), session }))
}
