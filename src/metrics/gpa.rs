use std::collections::BTreeSet;

use crate::models::Course;

const GRADE_POINT_SCALE: f64 = 4.0;

/// Credit-weighted GPA on a 4.0 scale, mapping percentages linearly.
///
/// Zero total credits (including an empty slice) yields `0.0`.
pub fn gpa(courses: &[Course]) -> f64 {
    let (quality_points, credits) = courses.iter().fold((0.0_f64, 0_u64), |(qp, cr), course| {
        let grade_points = (course.current_grade / 100.0) * GRADE_POINT_SCALE;
        (
            qp + grade_points * f64::from(course.credits),
            cr + u64::from(course.credits),
        )
    });

    if credits == 0 {
        return 0.0;
    }
    quality_points / credits as f64
}

pub fn total_credits(courses: &[Course]) -> u64 {
    courses.iter().map(|c| u64::from(c.credits)).sum()
}

pub fn letter_grade(percentage: f64) -> &'static str {
    const CUTOFFS: [(f64, &str); 11] = [
        (97.0, "A+"),
        (93.0, "A"),
        (90.0, "A-"),
        (87.0, "B+"),
        (83.0, "B"),
        (80.0, "B-"),
        (77.0, "C+"),
        (73.0, "C"),
        (70.0, "C-"),
        (67.0, "D+"),
        (65.0, "D"),
    ];

    CUTOFFS
        .iter()
        .find(|(min, _)| percentage >= *min)
        .map(|(_, letter)| *letter)
        .unwrap_or("F")
}

/// Distinct semesters, sorted.
pub fn semesters(courses: &[Course]) -> Vec<String> {
    courses
        .iter()
        .map(|c| c.semester.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `None` and `"all"` keep every course.
pub fn courses_in_semester(courses: &[Course], semester: Option<&str>) -> Vec<Course> {
    match semester {
        None | Some("all") | Some("") => courses.to_vec(),
        Some(wanted) => courses
            .iter()
            .filter(|c| c.semester == wanted)
            .cloned()
            .collect(),
    }
}

/// Percentage of the target GPA reached, capped at 100.
pub fn target_progress(current_gpa: f64, target_gpa: f64) -> f64 {
    if target_gpa.is_nan() || target_gpa <= 0.0 {
        return 0.0;
    }
    (current_gpa / target_gpa * 100.0).min(100.0)
}
