use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, Utc, Weekday};
use serde::Serialize;
use tracing::debug;

use crate::db::Store;
use crate::error::AppError;
use crate::metrics::{
    self, AssignmentCounts, CalendarGrid, DeadlineUrgency, FilterCriteria, StatusFilter,
};
use crate::models::{Assignment, AssignmentKind, Course};

pub const UNKNOWN_COURSE: &str = "Unknown Course";

const NEXT_UP_LIMIT: usize = 5;
const COURSE_CARD_LIMIT: usize = 4;
const GRADED_PREVIEW_LIMIT: usize = 5;
const CALENDAR_UPCOMING_LIMIT: usize = 5;

/// An assignment as list and card views show it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub course_name: String,
    pub overdue: bool,
    pub due_soon: bool,
    pub days_until_due: i64,
    pub due_label: String,
    pub urgency: DeadlineUrgency,
    pub percent_score: Option<i64>,
}

impl AssignmentView {
    fn build(assignment: Assignment, names: &CourseNames, now: DateTime<Utc>) -> Self {
        let days = metrics::days_until_due(&assignment, now);
        Self {
            course_name: names.resolve(assignment.course_id).to_string(),
            overdue: metrics::is_overdue(&assignment, now),
            due_soon: metrics::is_due_soon(&assignment, now),
            days_until_due: days,
            due_label: metrics::due_label(days),
            urgency: metrics::urgency(&assignment, now),
            percent_score: metrics::percent_score(&assignment),
            assignment,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub gpa: f64,
    pub target_gpa: f64,
    pub target_progress: f64,
    pub course_count: usize,
    pub courses: Vec<Course>,
    pub next_up: Vec<AssignmentView>,
    pub counts: AssignmentCounts,
    pub study_minutes_this_week: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAssignment {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: AssignmentKind,
    pub due_date: DateTime<Utc>,
    pub points: f64,
    pub earned_points: Option<f64>,
    pub percent_score: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseGrade {
    #[serde(flatten)]
    pub course: Course,
    pub letter_grade: &'static str,
    pub completed_count: usize,
    pub completed_assignments: Vec<GradedAssignment>,
    /// Completed assignments beyond the preview.
    pub more_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradesView {
    pub semester: Option<String>,
    pub semesters: Vec<String>,
    pub gpa: f64,
    pub total_credits: u64,
    pub course_count: usize,
    pub courses: Vec<CourseGrade>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    #[serde(flatten)]
    pub grid: CalendarGrid,
    pub previous: MonthRef,
    pub next: MonthRef,
    pub upcoming: Vec<AssignmentView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl MonthRef {
    fn shifted(year: i32, month: u32, delta: i32) -> Self {
        let (year, month) = metrics::shift_month(year, month, delta);
        Self { year, month }
    }
}

struct CourseNames(HashMap<i64, String>);

impl CourseNames {
    fn new(courses: &[Course]) -> Self {
        Self(courses.iter().map(|c| (c.id, c.name.clone())).collect())
    }

    fn resolve(&self, course_id: i64) -> &str {
        self.0.get(&course_id).map(String::as_str).unwrap_or(UNKNOWN_COURSE)
    }
}

/// Assembles the page-level views from whatever [`Store`] backs the app.
pub struct DashboardService {
    store: Store,
}

impl DashboardService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn overview(&self, now: DateTime<Utc>, target_gpa: f64) -> Result<DashboardView, AppError> {
        let (courses, assignments, sessions) = tokio::try_join!(
            self.store.courses.get_all(),
            self.store.assignments.get_all(),
            self.store.study_sessions.get_all(),
        )?;
        debug!(
            "dashboard over {} courses, {} assignments, {} sessions",
            courses.len(),
            assignments.len(),
            sessions.len()
        );

        let names = CourseNames::new(&courses);
        let pending = FilterCriteria { status: StatusFilter::Pending, ..Default::default() };
        let next_up = metrics::filter_assignments(&assignments, &pending, now)
            .into_iter()
            .take(NEXT_UP_LIMIT)
            .map(|a| AssignmentView::build(a, &names, now))
            .collect();

        let gpa = metrics::gpa(&courses);
        Ok(DashboardView {
            gpa,
            target_gpa,
            target_progress: metrics::target_progress(gpa, target_gpa),
            course_count: courses.len(),
            next_up,
            counts: AssignmentCounts::tally(&assignments, now),
            study_minutes_this_week: metrics::study_minutes_since(&sessions, now - Duration::days(7)),
            courses: courses.into_iter().take(COURSE_CARD_LIMIT).collect(),
        })
    }

    /// `semester` of `None` or `"all"` covers every course.
    pub async fn grades(&self, semester: Option<&str>) -> Result<GradesView, AppError> {
        let (courses, assignments) =
            tokio::try_join!(self.store.courses.get_all(), self.store.assignments.get_all())?;

        let semesters = metrics::semesters(&courses);
        let selected = metrics::courses_in_semester(&courses, semester);

        let mut completed_by_course: HashMap<i64, Vec<&Assignment>> = HashMap::new();
        for assignment in assignments.iter().filter(|a| a.completed) {
            completed_by_course.entry(assignment.course_id).or_default().push(assignment);
        }

        let rows = selected
            .iter()
            .cloned()
            .map(|course| {
                let completed = completed_by_course.remove(&course.id).unwrap_or_default();
                let completed_count = completed.len();
                CourseGrade {
                    letter_grade: metrics::letter_grade(course.current_grade),
                    completed_count,
                    completed_assignments: completed
                        .into_iter()
                        .take(GRADED_PREVIEW_LIMIT)
                        .map(|a| GradedAssignment {
                            id: a.id,
                            title: a.title.clone(),
                            kind: a.kind,
                            due_date: a.due_date,
                            points: a.points,
                            earned_points: a.earned_points,
                            percent_score: metrics::percent_score(a),
                        })
                        .collect(),
                    more_count: completed_count.saturating_sub(GRADED_PREVIEW_LIMIT),
                    course,
                }
            })
            .collect();

        Ok(GradesView {
            semester: semester
                .filter(|s| !s.is_empty() && *s != "all")
                .map(str::to_string),
            semesters,
            gpa: metrics::gpa(&selected),
            total_credits: metrics::total_credits(&selected),
            course_count: selected.len(),
            courses: rows,
        })
    }

    pub async fn calendar(
        &self,
        year: i32,
        month: u32,
        week_start: Weekday,
        tz: &FixedOffset,
        now: DateTime<Utc>,
    ) -> Result<CalendarView, AppError> {
        let (courses, assignments) =
            tokio::try_join!(self.store.courses.get_all(), self.store.assignments.get_all())?;

        let grid = metrics::month_grid(year, month, week_start, &assignments, now, tz)?;
        let names = CourseNames::new(&courses);
        let upcoming = metrics::upcoming_deadlines(&assignments, now, CALENDAR_UPCOMING_LIMIT)
            .into_iter()
            .map(|a| AssignmentView::build(a, &names, now))
            .collect();

        Ok(CalendarView {
            grid,
            previous: MonthRef::shifted(year, month, -1),
            next: MonthRef::shifted(year, month, 1),
            upcoming,
        })
    }

    pub async fn assignments(
        &self,
        criteria: &FilterCriteria,
        now: DateTime<Utc>,
    ) -> Result<Vec<AssignmentView>, AppError> {
        let (courses, assignments) =
            tokio::try_join!(self.store.courses.get_all(), self.store.assignments.get_all())?;

        let names = CourseNames::new(&courses);
        Ok(metrics::filter_assignments(&assignments, criteria, now)
            .into_iter()
            .map(|a| AssignmentView::build(a, &names, now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentDraft, CourseDraft, Priority};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn course(name: &str, semester: &str, credits: u32, grade: f64) -> CourseDraft {
        CourseDraft {
            name: name.to_string(),
            code: name.to_uppercase(),
            professor: "Staff".to_string(),
            semester: semester.to_string(),
            credits,
            current_grade: grade,
            target_grade: 90.0,
        }
    }

    fn assignment(course_id: i64, title: &str, due_in_days: i64, earned: Option<f64>) -> AssignmentDraft {
        AssignmentDraft {
            course_id,
            title: title.to_string(),
            kind: AssignmentKind::Homework,
            priority: Priority::Medium,
            due_date: now() + Duration::days(due_in_days),
            points: 100.0,
            earned_points: earned,
            completed: earned.is_some(),
        }
    }

    async fn seeded() -> Store {
        let store = Store::in_memory();
        let algebra = store.courses.create(course("Algebra", "Spring 2024", 4, 90.0)).await.unwrap();
        store.courses.create(course("Poetry", "Fall 2023", 2, 75.0)).await.unwrap();

        store.assignments.create(assignment(algebra.id, "Late set", -2, None)).await.unwrap();
        store.assignments.create(assignment(algebra.id, "Next set", 3, None)).await.unwrap();
        store.assignments.create(assignment(99, "Orphan", 1, None)).await.unwrap();
        for i in 0..6 {
            store
                .assignments
                .create(assignment(algebra.id, &format!("Quiz {}", i), -10 - i, Some(80.0)))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_overview_puts_overdue_work_first() {
        let service = DashboardService::new(seeded().await);
        let view = service.overview(now(), 3.8).await.unwrap();

        let titles: Vec<&str> = view.next_up.iter().map(|v| v.assignment.title.as_str()).collect();
        assert_eq!(titles, vec!["Late set", "Orphan", "Next set"]);
        assert!(view.next_up[0].overdue);
        assert_eq!(view.next_up[1].course_name, UNKNOWN_COURSE);
        assert_eq!(view.next_up[2].due_label, "3 days");

        assert_eq!(view.counts, AssignmentCounts { total: 9, completed: 6, overdue: 1 });
        assert_eq!(view.course_count, 2);
        // (3.6 * 4 + 3.0 * 2) / 6
        assert!((view.gpa - 3.4).abs() < 1e-9);
        assert!((view.target_progress - 3.4 / 3.8 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_grades_preview_and_semester_filter() {
        let service = DashboardService::new(seeded().await);

        let all = service.grades(Some("all")).await.unwrap();
        assert_eq!(all.semester, None);
        assert_eq!(all.semesters, vec!["Fall 2023", "Spring 2024"]);
        assert_eq!(all.total_credits, 6);

        let algebra = all.courses.iter().find(|c| c.course.name == "Algebra").unwrap();
        assert_eq!(algebra.letter_grade, "A-");
        assert_eq!(algebra.completed_count, 6);
        assert_eq!(algebra.completed_assignments.len(), 5);
        assert_eq!(algebra.more_count, 1);
        assert_eq!(algebra.completed_assignments[0].percent_score, Some(80));

        let fall = service.grades(Some("Fall 2023")).await.unwrap();
        assert_eq!(fall.course_count, 1);
        assert!((fall.gpa - 3.0).abs() < 1e-9);
        assert!(fall.courses[0].completed_assignments.is_empty());
    }

    #[tokio::test]
    async fn test_calendar_bins_in_viewer_offset() {
        let service = DashboardService::new(seeded().await);
        let tz = FixedOffset::east_opt(0).unwrap();
        let view = service.calendar(2024, 3, Weekday::Sun, &tz, now()).await.unwrap();

        assert_eq!(view.grid.days.len() % 7, 0);
        let today = view.grid.days.iter().find(|d| d.is_today).unwrap();
        assert_eq!(today.date, now().date_naive());
        assert_eq!(view.upcoming.len(), 2);
        assert_eq!(view.upcoming[0].assignment.title, "Orphan");
        assert_eq!(view.previous, MonthRef { year: 2024, month: 2 });
        assert_eq!(view.next, MonthRef { year: 2024, month: 4 });
    }

    #[tokio::test]
    async fn test_invalid_month_is_a_metrics_error() {
        let service = DashboardService::new(Store::in_memory());
        let tz = FixedOffset::east_opt(0).unwrap();
        let err = service.calendar(2024, 13, Weekday::Sun, &tz, now()).await.unwrap_err();
        assert!(matches!(err, AppError::Metrics(_)));
    }
}
