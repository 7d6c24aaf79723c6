use serde_json::{json, Value};

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{remote_store_of, require_db, require_teacher, str_param};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, SubjectEntry};
use crate::store::{self, NewMark, NewStudent, RecordStore, Student};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "marksheet.get" => Some(get(state, req)),
        "marksheet.save" => Some(save(state, req)),
        _ => None,
    }
}

fn get(state: &AppState, req: &Request) -> Value {
    let teacher = match require_teacher(state, req) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match str_param(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let store = RecordStore::new(remote_store_of(state), conn);
    let Some(student) = find_student(&store, &teacher.id, &student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };
    let marks = store::marks_by_student(&store, &student.id, &teacher.id);
    ok(&req.id, json!({ "marksheet": report::assemble(student, &marks) }))
}

fn save(state: &AppState, req: &Request) -> Value {
    let teacher = match require_teacher(state, req) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    let subjects: Vec<SubjectEntry> = match req.params.get("subjects") {
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(v) => v,
            Err(e) => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("invalid params.subjects: {e}"),
                    None,
                )
            }
        },
        None => return err(&req.id, "bad_params", "missing params.subjects", None),
    };
    if subjects.is_empty() {
        return err(&req.id, "bad_params", "subjects must not be empty", None);
    }
    // Reconciliation keys on subject names; reject blanks before any write.
    if subjects.iter().any(|s| s.name.trim().is_empty()) {
        return err(&req.id, "bad_params", "subject names must not be empty", None);
    }

    let store = RecordStore::new(remote_store_of(state), conn);

    let student = if let Some(student_id) = req.params.get("studentId").and_then(|v| v.as_str()) {
        match find_student(&store, &teacher.id, student_id) {
            Some(s) => s,
            None => return err(&req.id, "not_found", "student not found", None),
        }
    } else {
        let details = req.params.get("student").cloned().unwrap_or(Value::Null);
        let name = details.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let roll_no = details.get("rollNo").and_then(|v| v.as_str()).unwrap_or("");
        let class = details.get("class").and_then(|v| v.as_str()).unwrap_or("");
        if name.trim().is_empty() || roll_no.trim().is_empty() || class.trim().is_empty() {
            return err(
                &req.id,
                "bad_params",
                "params.student needs name, rollNo and class",
                None,
            );
        }
        match store::add_student(
            &store,
            &NewStudent {
                name: name.trim().to_string(),
                roll_no: roll_no.trim().to_string(),
                class: class.trim().to_string(),
                teacher_id: teacher.id.clone(),
            },
        ) {
            Ok(s) => s,
            Err(e) => return err(&req.id, "db_query_failed", format!("{e:#}"), None),
        }
    };

    let existing = store::marks_by_student(&store, &student.id, &teacher.id);
    let plan = report::reconcile_subjects(&existing, &subjects);

    // Sequential application, no transaction: a failure partway leaves the
    // earlier steps applied (each step still falls back remote-to-local on
    // its own).
    for entry in &plan.creates {
        if let Err(e) = store::add_mark(
            &store,
            &NewMark {
                student_id: student.id.clone(),
                subject: entry.name.clone(),
                marks: entry.marks,
                max_marks: entry.max_marks,
                teacher_id: teacher.id.clone(),
            },
        ) {
            return err(&req.id, "db_query_failed", format!("{e:#}"), None);
        }
    }
    for (mark_id, patch) in &plan.updates {
        if let Err(e) = store::update_mark(&store, mark_id, patch) {
            return err(&req.id, "db_query_failed", format!("{e:#}"), None);
        }
    }
    for mark_id in &plan.deletes {
        if let Err(e) = store::delete_mark(&store, mark_id) {
            return err(&req.id, "db_query_failed", format!("{e:#}"), None);
        }
    }

    let marks = store::marks_by_student(&store, &student.id, &teacher.id);
    ok(&req.id, json!({ "marksheet": report::assemble(student, &marks) }))
}

fn find_student(store: &RecordStore, teacher_id: &str, student_id: &str) -> Option<Student> {
    store::students_by_teacher(store, teacher_id)
        .into_iter()
        .find(|s| s.id == student_id)
}
