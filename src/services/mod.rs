pub mod dashboard;
pub mod study_timer;

pub use dashboard::{
    AssignmentView, CalendarView, CourseGrade, DashboardService, DashboardView, GradesView, MonthRef,
};
pub use study_timer::{CompletedStudy, StudyTimer, TimerError, TimerPhase, TimerStatus};
