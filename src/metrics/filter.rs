use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MetricsError;
use super::classify::is_overdue;
use crate::models::{Assignment, Priority};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
    Overdue,
}

impl StatusFilter {
    fn matches(&self, assignment: &Assignment, now: DateTime<Utc>) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Completed => assignment.completed,
            StatusFilter::Pending => !assignment.completed,
            StatusFilter::Overdue => is_overdue(assignment, now),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "pending" => Ok(StatusFilter::Pending),
            "overdue" => Ok(StatusFilter::Overdue),
            other => Err(MetricsError::UnknownFilter(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    fn matches(&self, assignment: &Assignment) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => assignment.priority == *p,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(PriorityFilter::All),
            other => other
                .parse::<Priority>()
                .map(PriorityFilter::Only)
                .map_err(|_| MetricsError::UnknownFilter(other.to_string())),
        }
    }
}

impl TryFrom<String> for PriorityFilter {
    type Error = MetricsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PriorityFilter> for String {
    fn from(value: PriorityFilter) -> Self {
        match value {
            PriorityFilter::All => "all".to_string(),
            PriorityFilter::Only(p) => p.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub priority: PriorityFilter,
}

impl FilterCriteria {
    pub fn matches(&self, assignment: &Assignment, now: DateTime<Utc>) -> bool {
        self.course_id.is_none_or(|id| assignment.course_id == id)
            && self.status.matches(assignment, now)
            && self.priority.matches(assignment)
    }
}

/// Applies `criteria` and orders the result: overdue open work first, then
/// everything else, each group by ascending due date. Ties keep input order.
pub fn filter_assignments(
    assignments: &[Assignment],
    criteria: &FilterCriteria,
    now: DateTime<Utc>,
) -> Vec<Assignment> {
    let mut selected: Vec<Assignment> = assignments
        .iter()
        .filter(|a| criteria.matches(a, now))
        .cloned()
        .collect();

    // slice::sort_by is stable
    selected.sort_by(|a, b| {
        let a_late = is_overdue(a, now);
        let b_late = is_overdue(b, now);
        b_late.cmp(&a_late).then(a.due_date.cmp(&b.due_date))
    });
    selected
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCounts {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl AssignmentCounts {
    pub fn tally(assignments: &[Assignment], now: DateTime<Utc>) -> Self {
        assignments.iter().fold(Self::default(), |mut counts, a| {
            counts.total += 1;
            if a.completed {
                counts.completed += 1;
            }
            if is_overdue(a, now) {
                counts.overdue += 1;
            }
            counts
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentKind;
    use chrono::TimeZone;

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 12, 0, 0).unwrap()
    }

    fn a(id: i64, course_id: i64, due: u32, completed: bool, priority: Priority) -> Assignment {
        Assignment {
            id,
            course_id,
            title: format!("a{}", id),
            kind: AssignmentKind::Homework,
            priority,
            due_date: at(due),
            points: 10.0,
            earned_points: None,
            completed,
        }
    }

    fn ids(list: &[Assignment]) -> Vec<i64> {
        list.iter().map(|a| a.id).collect()
    }

    fn sample() -> Vec<Assignment> {
        vec![
            a(1, 1, 20, false, Priority::Low),
            a(2, 2, 8, false, Priority::High),
            a(3, 1, 3, true, Priority::High),
            a(4, 1, 5, false, Priority::Medium),
            a(5, 2, 25, true, Priority::Low),
        ]
    }

    #[test]
    fn overdue_bucket_comes_first() {
        let now = at(10);
        let out = filter_assignments(&sample(), &FilterCriteria::default(), now);
        assert_eq!(ids(&out), vec![4, 2, 3, 1, 5]);
    }

    #[test]
    fn status_filters() {
        let now = at(10);
        let run = |status| {
            ids(&filter_assignments(
                &sample(),
                &FilterCriteria { status, ..Default::default() },
                now,
            ))
        };
        assert_eq!(run(StatusFilter::Completed), vec![3, 5]);
        assert_eq!(run(StatusFilter::Pending), vec![4, 2, 1]);
        assert_eq!(run(StatusFilter::Overdue), vec![4, 2]);
    }

    #[test]
    fn course_and_priority_compose() {
        let now = at(10);
        let criteria = FilterCriteria {
            course_id: Some(1),
            status: StatusFilter::All,
            priority: PriorityFilter::Only(Priority::High),
        };
        assert_eq!(ids(&filter_assignments(&sample(), &criteria, now)), vec![3]);
    }

    #[test]
    fn ties_keep_input_order() {
        let now = at(1);
        let list = vec![
            a(10, 1, 15, false, Priority::Low),
            a(11, 1, 15, false, Priority::High),
            a(12, 1, 12, false, Priority::Low),
            a(13, 1, 15, false, Priority::Medium),
        ];
        let out = filter_assignments(&list, &FilterCriteria::default(), now);
        assert_eq!(ids(&out), vec![12, 10, 11, 13]);
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let now = at(10);
        let criteria = FilterCriteria {
            course_id: None,
            status: StatusFilter::Pending,
            priority: PriorityFilter::All,
        };
        let once = filter_assignments(&sample(), &criteria, now);
        let twice = filter_assignments(&once, &criteria, now);
        assert_eq!(once, twice);
    }

    #[test]
    fn input_is_untouched() {
        let list = sample();
        let before = list.clone();
        let _ = filter_assignments(&list, &FilterCriteria::default(), at(10));
        assert_eq!(list, before);
    }

    #[test]
    fn parses_query_values() {
        assert_eq!("overdue".parse::<StatusFilter>().unwrap(), StatusFilter::Overdue);
        assert_eq!("all".parse::<PriorityFilter>().unwrap(), PriorityFilter::All);
        assert_eq!(
            "High".parse::<PriorityFilter>().unwrap(),
            PriorityFilter::Only(Priority::High)
        );
        assert!("soon".parse::<StatusFilter>().is_err());
        assert!("urgent".parse::<PriorityFilter>().is_err());
    }

    #[test]
    fn counts() {
        let counts = AssignmentCounts::tally(&sample(), at(10));
        assert_eq!(counts, AssignmentCounts { total: 5, completed: 2, overdue: 2 });
    }
}
