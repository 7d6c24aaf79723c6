//! Marksheet assembly and the subject reconciliation diff.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::calc::{self, SubjectScore};
use crate::store::{Mark, MarkPatch, Student};

/// One row of the editable subject list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectEntry {
    pub name: String,
    pub marks: u32,
    pub max_marks: u32,
}

/// Actions needed to bring stored marks in line with an edited subject list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub creates: Vec<SubjectEntry>,
    pub updates: Vec<(String, MarkPatch)>,
    pub deletes: Vec<String>,
}

/// Three-way diff keyed by subject name, NOT by mark id: an edited subject
/// matching a stored mark's subject becomes an update, an unmatched edited
/// subject becomes a create, and a stored subject missing from the edit
/// becomes a delete. Renaming a subject therefore reads as delete+create.
/// When stored marks duplicate a subject name, the first in storage order
/// wins; later duplicates are only deleted once the name disappears.
pub fn reconcile_subjects(existing: &[Mark], edited: &[SubjectEntry]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for subject in edited {
        match existing.iter().find(|m| m.subject == subject.name) {
            Some(mark) => plan.updates.push((
                mark.id.clone(),
                MarkPatch {
                    subject: None,
                    marks: Some(subject.marks),
                    max_marks: Some(subject.max_marks),
                },
            )),
            None => plan.creates.push(subject.clone()),
        }
    }

    let edited_names: HashSet<&str> = edited.iter().map(|s| s.name.as_str()).collect();
    for mark in existing {
        if !edited_names.contains(mark.subject.as_str()) {
            plan.deletes.push(mark.id.clone());
        }
    }

    plan
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    pub name: String,
    pub marks: u32,
    pub max_marks: u32,
    /// 1-decimal rendering, unlike the aggregate percentage.
    pub percent: String,
}

/// The printable report: student details, the subject table, and the
/// computed summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marksheet {
    pub student: Student,
    pub subjects: Vec<SubjectRow>,
    pub total: u64,
    pub max_total: u64,
    pub percentage: String,
    pub grade: &'static str,
    pub status: &'static str,
}

pub fn assemble(student: Student, marks: &[Mark]) -> Marksheet {
    let subjects: Vec<SubjectRow> = marks
        .iter()
        .map(|m| SubjectRow {
            name: m.subject.clone(),
            marks: m.marks,
            max_marks: m.max_marks,
            percent: calc::format_subject_percent(calc::subject_percent(m.marks, m.max_marks)),
        })
        .collect();

    let summary = calc::summarize(marks.iter().map(|m| SubjectScore {
        marks: m.marks,
        max_marks: m.max_marks,
    }));

    Marksheet {
        student,
        subjects,
        total: summary.total,
        max_total: summary.max_total,
        percentage: calc::format_percentage(summary.percentage),
        grade: summary.grade,
        status: if summary.passed { "PASS" } else { "FAIL" },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(id: &str, subject: &str, marks: u32, max_marks: u32) -> Mark {
        Mark {
            id: id.to_string(),
            student_id: "s-1".to_string(),
            subject: subject.to_string(),
            marks,
            max_marks,
            teacher_id: "t-1".to_string(),
            created_at: "2026-01-05T09:00:00.000Z".to_string(),
        }
    }

    fn entry(name: &str, marks: u32, max_marks: u32) -> SubjectEntry {
        SubjectEntry {
            name: name.to_string(),
            marks,
            max_marks,
        }
    }

    #[test]
    fn matched_updates_unmatched_creates_missing_deletes() {
        let existing = [mark("m-math", "Math", 60, 100), mark("m-art", "Art", 40, 50)];
        let edited = [entry("Math", 72, 100), entry("Science", 45, 50)];

        let plan = reconcile_subjects(&existing, &edited);

        assert_eq!(
            plan.updates,
            vec![(
                "m-math".to_string(),
                MarkPatch {
                    subject: None,
                    marks: Some(72),
                    max_marks: Some(100),
                }
            )]
        );
        assert_eq!(plan.creates, vec![entry("Science", 45, 50)]);
        assert_eq!(plan.deletes, vec!["m-art".to_string()]);
    }

    #[test]
    fn unchanged_list_is_updates_only() {
        let existing = [mark("m-math", "Math", 60, 100)];
        let edited = [entry("Math", 60, 100)];

        let plan = reconcile_subjects(&existing, &edited);
        assert!(plan.creates.is_empty());
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.updates.len(), 1);
    }

    #[test]
    fn duplicate_stored_subject_first_wins_and_stays() {
        let existing = [
            mark("m-1", "Math", 60, 100),
            mark("m-2", "Math", 10, 100),
        ];

        // Name still present: first duplicate updates, second survives.
        let plan = reconcile_subjects(&existing, &[entry("Math", 72, 100)]);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].0, "m-1");
        assert!(plan.deletes.is_empty());

        // Name gone: both duplicates are deleted.
        let plan = reconcile_subjects(&existing, &[entry("Science", 45, 50)]);
        assert_eq!(plan.deletes, vec!["m-1".to_string(), "m-2".to_string()]);
        assert_eq!(plan.creates, vec![entry("Science", 45, 50)]);
    }

    #[test]
    fn assembled_sheet_carries_summary_and_rows() {
        let student = Student {
            id: "s-1".to_string(),
            name: "Asha".to_string(),
            roll_no: "17".to_string(),
            class: "10-A".to_string(),
            teacher_id: "t-1".to_string(),
            created_at: "2026-01-05T09:00:00.000Z".to_string(),
        };
        let marks = [
            mark("m-1", "Math", 80, 100),
            mark("m-2", "Science", 45, 50),
            mark("m-3", "English", 90, 100),
        ];

        let sheet = assemble(student, &marks);
        assert_eq!(sheet.total, 215);
        assert_eq!(sheet.max_total, 250);
        assert_eq!(sheet.percentage, "86.00");
        assert_eq!(sheet.grade, "A");
        assert_eq!(sheet.status, "PASS");
        assert_eq!(sheet.subjects.len(), 3);
        assert_eq!(sheet.subjects[1].percent, "90.0");
    }
}
