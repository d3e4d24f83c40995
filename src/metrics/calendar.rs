use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use serde::Serialize;

use super::MetricsError;
use crate::models::Assignment;

/// One calendar cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    pub assignment_count: usize,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarGrid {
    pub year: i32,
    pub month: u32,
    pub weekdays: [&'static str; 7],
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DayBucket>,
}

impl CalendarGrid {
    pub fn weeks(&self) -> impl Iterator<Item = &[DayBucket]> {
        self.days.chunks(7)
    }
}

fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate, MetricsError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(MetricsError::InvalidMonth { year, month })
}

fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate, MetricsError> {
    first_day_of_month(year, month)?;
    let next_first = if month == 12 {
        year.checked_add(1).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match next_first {
        Some(next) => next.pred_opt().ok_or(MetricsError::OutOfRange { year, month }),
        // December of the last representable year
        None => {
            NaiveDate::from_ymd_opt(year, 12, 31).ok_or(MetricsError::OutOfRange { year, month })
        }
    }
}

fn start_of_week(day: NaiveDate, week_start: Weekday) -> Option<NaiveDate> {
    let day_idx = day.weekday().num_days_from_monday();
    let start_idx = week_start.num_days_from_monday();
    let diff = (7 + day_idx - start_idx) % 7;
    day.checked_sub_days(Days::new(u64::from(diff)))
}

fn end_of_week(day: NaiveDate, week_start: Weekday) -> Option<NaiveDate> {
    let day_idx = day.weekday().num_days_from_monday();
    let end_idx = week_start.pred().num_days_from_monday();
    let diff = (7 + end_idx - day_idx) % 7;
    day.checked_add_days(Days::new(u64::from(diff)))
}

/// The month padded out to whole weeks: from the week start on or before the
/// 1st through the last day of the week containing the month's last day.
///
/// A valid month whose padding would leave chrono's date range is
/// `OutOfRange`; a month that does not exist is `InvalidMonth`.
pub fn padded_month_range(
    year: i32,
    month: u32,
    week_start: Weekday,
) -> Result<(NaiveDate, NaiveDate), MetricsError> {
    let first = first_day_of_month(year, month)?;
    let last = last_day_of_month(year, month)?;
    let start = start_of_week(first, week_start).ok_or(MetricsError::OutOfRange { year, month })?;
    let end = end_of_week(last, week_start).ok_or(MetricsError::OutOfRange { year, month })?;
    Ok((start, end))
}

pub fn weekday_labels(week_start: Weekday) -> [&'static str; 7] {
    const NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    let offset = week_start.num_days_from_monday() as usize;
    std::array::from_fn(|i| NAMES[(offset + i) % 7])
}

fn local_date<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Builds one bucket per day in `start..=end`.
///
/// Due dates are converted to calendar dates in `tz` before binning.
/// `focus_month` decides `in_current_month`; without one every day counts.
pub fn bin_range<Tz: TimeZone>(
    start: NaiveDate,
    end: NaiveDate,
    focus_month: Option<(i32, u32)>,
    assignments: &[Assignment],
    today: NaiveDate,
    tz: &Tz,
) -> Result<Vec<DayBucket>, MetricsError> {
    if start > end {
        return Err(MetricsError::InvalidRange { start, end });
    }

    let mut by_day: HashMap<NaiveDate, Vec<Assignment>> = HashMap::new();
    for assignment in assignments {
        let day = local_date(&assignment.due_date, tz);
        if day >= start && day <= end {
            by_day.entry(day).or_default().push(assignment.clone());
        }
    }

    let days = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            let assignments = by_day.remove(&date).unwrap_or_default();
            DayBucket {
                date,
                in_current_month: focus_month
                    .is_none_or(|(y, m)| date.year() == y && date.month() == m),
                is_today: date == today,
                assignment_count: assignments.len(),
                assignments,
            }
        })
        .collect();

    Ok(days)
}

pub fn month_grid<Tz: TimeZone>(
    year: i32,
    month: u32,
    week_start: Weekday,
    assignments: &[Assignment],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<CalendarGrid, MetricsError> {
    let (start, end) = padded_month_range(year, month, week_start)?;
    let today = local_date(&now, tz);
    let days = bin_range(start, end, Some((year, month)), assignments, today, tz)?;

    Ok(CalendarGrid {
        year,
        month,
        weekdays: weekday_labels(week_start),
        start,
        end,
        days,
    })
}

/// Assignments due on `date` in the viewer's timezone, in input order.
pub fn assignments_on<Tz: TimeZone>(
    assignments: &[Assignment],
    date: NaiveDate,
    tz: &Tz,
) -> Vec<Assignment> {
    assignments
        .iter()
        .filter(|a| local_date(&a.due_date, tz) == date)
        .cloned()
        .collect()
}

/// Open work not yet past due, earliest first, at most `limit` items.
pub fn upcoming_deadlines(
    assignments: &[Assignment],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<Assignment> {
    let mut upcoming: Vec<Assignment> = assignments
        .iter()
        .filter(|a| !a.completed && a.due_date >= now)
        .cloned()
        .collect();
    upcoming.sort_by_key(|a| a.due_date);
    upcoming.truncate(limit);
    upcoming
}

/// Moves `(year, month)` by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}
