//! Grade computation. Pure functions, no I/O.

/// Percentage at or above which a marksheet counts as a pass.
/// Must stay equal to the lower bound of the "D" grade band.
pub const PASS_MARK: f64 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectScore {
    pub marks: u32,
    pub max_marks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeSummary {
    pub total: u64,
    pub max_total: u64,
    pub percentage: f64,
    pub grade: &'static str,
    pub passed: bool,
}

/// Letter grade for an aggregate percentage. Bands are inclusive at the
/// lower bound and evaluated highest-first.
pub fn letter_grade(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "A+"
    } else if percentage >= 80.0 {
        "A"
    } else if percentage >= 70.0 {
        "B+"
    } else if percentage >= 60.0 {
        "B"
    } else if percentage >= 50.0 {
        "C+"
    } else if percentage >= 40.0 {
        "C"
    } else if percentage >= 35.0 {
        "D"
    } else {
        "F"
    }
}

pub fn summarize<I>(scores: I) -> GradeSummary
where
    I: IntoIterator<Item = SubjectScore>,
{
    let mut total: u64 = 0;
    let mut max_total: u64 = 0;
    for s in scores {
        total += u64::from(s.marks);
        max_total += u64::from(s.max_marks);
    }

    // Grade bands and the pass mark apply to the 2-decimal value printed on
    // the sheet, so round before comparing. Otherwise 351/1003 would render
    // as "35.00" yet fall below the pass mark.
    let percentage = if max_total > 0 {
        let raw = 100.0 * total as f64 / max_total as f64;
        format!("{:.2}", raw).parse().unwrap_or(raw)
    } else {
        0.0
    };

    GradeSummary {
        total,
        max_total,
        percentage,
        grade: letter_grade(percentage),
        passed: percentage >= PASS_MARK,
    }
}

/// Aggregate percentage as displayed on the marksheet: exactly 2 decimals.
pub fn format_percentage(percentage: f64) -> String {
    format!("{:.2}", percentage)
}

/// Per-subject percentage for the subject table; `max_marks == 0` counts as 0.
pub fn subject_percent(marks: u32, max_marks: u32) -> f64 {
    if max_marks > 0 {
        100.0 * f64::from(marks) / f64::from(max_marks)
    } else {
        0.0
    }
}

/// Subject-row rendering uses 1 decimal, unlike the 2-decimal aggregate.
pub fn format_subject_percent(percent: f64) -> String {
    format!("{:.1}", percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(marks: u32, max_marks: u32) -> SubjectScore {
        SubjectScore { marks, max_marks }
    }

    #[test]
    fn sums_and_percentage() {
        let s = summarize([score(80, 100), score(45, 50), score(90, 100)]);
        assert_eq!(s.total, 215);
        assert_eq!(s.max_total, 250);
        assert_eq!(format_percentage(s.percentage), "86.00");
        assert_eq!(s.grade, "A");
        assert!(s.passed);
    }

    #[test]
    fn empty_and_zero_max_are_zero_percent() {
        let s = summarize([]);
        assert_eq!(s.total, 0);
        assert_eq!(s.max_total, 0);
        assert_eq!(format_percentage(s.percentage), "0.00");
        assert_eq!(s.grade, "F");
        assert!(!s.passed);

        let s = summarize([score(0, 0)]);
        assert_eq!(format_percentage(s.percentage), "0.00");
    }

    #[test]
    fn grade_band_lower_bounds_are_inclusive() {
        assert_eq!(letter_grade(90.0), "A+");
        assert_eq!(letter_grade(89.99), "A");
        assert_eq!(letter_grade(80.0), "A");
        assert_eq!(letter_grade(70.0), "B+");
        assert_eq!(letter_grade(60.0), "B");
        assert_eq!(letter_grade(50.0), "C+");
        assert_eq!(letter_grade(40.0), "C");
        assert_eq!(letter_grade(35.0), "D");
        assert_eq!(letter_grade(34.99), "F");
    }

    #[test]
    fn pass_boundary_matches_d_band() {
        let s = summarize([score(35, 100)]);
        assert_eq!(s.grade, "D");
        assert!(s.passed);

        let s = summarize([score(3499, 10000)]);
        assert_eq!(s.grade, "F");
        assert!(!s.passed);
    }

    #[test]
    fn grade_agrees_with_rendered_percentage() {
        // 351/1003 is 34.9950...%, which renders as "35.00". The grade must
        // follow the rendered value, not the raw quotient.
        let s = summarize([score(351, 1003)]);
        assert_eq!(format_percentage(s.percentage), "35.00");
        assert_eq!(s.grade, "D");
        assert!(s.passed);

        // 89.9951% renders as "90.00" and earns the A+ band.
        let s = summarize([score(899_951, 1_000_000)]);
        assert_eq!(format_percentage(s.percentage), "90.00");
        assert_eq!(s.grade, "A+");
    }

    #[test]
    fn totals_do_not_overflow_u32() {
        let s = summarize([score(u32::MAX, u32::MAX), score(u32::MAX, u32::MAX)]);
        assert_eq!(s.total, 2 * u64::from(u32::MAX));
        assert_eq!(s.max_total, 2 * u64::from(u32::MAX));
        assert_eq!(s.grade, "A+");
    }

    #[test]
    fn subject_percent_rendering() {
        assert_eq!(format_subject_percent(subject_percent(45, 50)), "90.0");
        assert_eq!(format_subject_percent(subject_percent(1, 3)), "33.3");
        assert_eq!(format_subject_percent(subject_percent(10, 0)), "0.0");
    }
}
