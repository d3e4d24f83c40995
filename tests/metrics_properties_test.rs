use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Utc, Weekday};

use coursedesk::metrics::{
    FilterCriteria, PriorityFilter, StatusFilter, filter_assignments, gpa, is_due_soon,
    is_overdue, month_grid, upcoming_deadlines,
};
use coursedesk::models::{Assignment, AssignmentKind, Course, Priority};

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap()
}

fn random_assignments(rng: &mut Lcg, count: usize) -> Vec<Assignment> {
    (0..count)
        .map(|i| {
            // hour granularity over roughly +/- 40 days, with frequent collisions
            let offset_hours = rng.below(80) as i64 * 12 - 480;
            let completed = rng.below(3) == 0;
            Assignment {
                id: i as i64 + 1,
                course_id: rng.below(3) as i64 + 1,
                title: format!("Item {}", i),
                kind: AssignmentKind::Homework,
                priority: match rng.below(3) {
                    0 => Priority::High,
                    1 => Priority::Medium,
                    _ => Priority::Low,
                },
                due_date: now() + Duration::hours(offset_hours),
                points: 10.0,
                earned_points: None,
                completed,
            }
        })
        .collect()
}

#[test]
fn gpa_stays_on_the_four_point_scale() {
    let mut rng = Lcg(7);
    for _ in 0..200 {
        let courses: Vec<Course> = (0..rng.below(6))
            .map(|i| Course {
                id: i as i64,
                name: format!("C{}", i),
                code: format!("C{}", i),
                professor: String::new(),
                semester: "Fall 2024".to_string(),
                credits: rng.below(5) as u32,
                current_grade: rng.below(10_001) as f64 / 100.0,
                target_grade: 90.0,
            })
            .collect();
        let value = gpa(&courses);
        assert!((0.0..=4.0).contains(&value), "gpa {} out of range", value);
    }
}

#[test]
fn completed_work_is_never_overdue_or_due_soon() {
    let mut rng = Lcg(11);
    for a in random_assignments(&mut rng, 300).iter().filter(|a| a.completed) {
        assert!(!is_overdue(a, now()));
        assert!(!is_due_soon(a, now()));
    }
}

#[test]
fn filtering_is_idempotent_and_orders_overdue_first() {
    let mut rng = Lcg(23);
    let assignments = random_assignments(&mut rng, 120);

    let criteria_set = [
        FilterCriteria::default(),
        FilterCriteria { status: StatusFilter::Pending, ..Default::default() },
        FilterCriteria { course_id: Some(2), ..Default::default() },
        FilterCriteria {
            priority: PriorityFilter::Only(Priority::High),
            status: StatusFilter::All,
            course_id: None,
        },
    ];

    for criteria in &criteria_set {
        let once = filter_assignments(&assignments, criteria, now());
        let twice = filter_assignments(&once, criteria, now());
        assert_eq!(once, twice);

        let first_on_time = once.iter().position(|a| !is_overdue(a, now())).unwrap_or(once.len());
        assert!(once[first_on_time..].iter().all(|a| !is_overdue(a, now())));

        // equal (overdue, due date) keys keep input order
        for pair in once.windows(2) {
            let same_key = pair[0].due_date == pair[1].due_date
                && is_overdue(&pair[0], now()) == is_overdue(&pair[1], now());
            if same_key {
                assert!(pair[0].id < pair[1].id, "{:?} before {:?}", pair[0].id, pair[1].id);
            }
        }
    }
}

#[test]
fn calendar_grid_covers_whole_weeks_and_bins_exactly_once() {
    let mut rng = Lcg(31);
    let assignments = random_assignments(&mut rng, 200);
    let offsets = [
        FixedOffset::east_opt(0).unwrap(),
        FixedOffset::east_opt(9 * 3600).unwrap(),
        FixedOffset::west_opt(7 * 3600).unwrap(),
    ];

    for tz in &offsets {
        for week_start in [Weekday::Sun, Weekday::Mon] {
            for (year, month) in [(2024, 5), (2024, 6), (2024, 7), (2023, 2), (2024, 2)] {
                let grid = month_grid(year, month, week_start, &assignments, now(), tz).unwrap();

                assert_eq!(grid.days.len() % 7, 0);
                assert_eq!(grid.start.weekday(), week_start);
                assert_eq!(grid.end.weekday(), week_start.pred());
                assert!(grid.days.iter().any(|d| d.date.day() == 1 && d.in_current_month));

                for a in &assignments {
                    let local = a.due_date.with_timezone(tz).date_naive();
                    let hits: Vec<_> = grid
                        .days
                        .iter()
                        .filter(|d| d.assignments.iter().any(|x| x.id == a.id))
                        .collect();
                    if local >= grid.start && local <= grid.end {
                        assert_eq!(hits.len(), 1);
                        assert_eq!(hits[0].date, local);
                    } else {
                        assert!(hits.is_empty());
                    }
                }
            }
        }
    }
}

#[test]
fn upcoming_deadlines_skip_done_and_past_work() {
    let mut rng = Lcg(47);
    let assignments = random_assignments(&mut rng, 150);
    let upcoming = upcoming_deadlines(&assignments, now(), 10);

    assert!(upcoming.len() <= 10);
    assert!(upcoming.iter().all(|a| !a.completed && a.due_date >= now()));
    assert!(upcoming.windows(2).all(|w| w[0].due_date <= w[1].due_date));
}
