use serde_json::{json, Value};

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{non_empty_param, remote_store_of, require_db, require_teacher, str_param};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, NewStudent, RecordStore, StudentPatch};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "students.create" => Some(create(state, req)),
        "students.list" => Some(list(state, req)),
        "students.update" => Some(update(state, req)),
        "students.delete" => Some(delete(state, req)),
        _ => None,
    }
}

fn create(state: &AppState, req: &Request) -> Value {
    let teacher = match require_teacher(state, req) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match non_empty_param(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let roll_no = match non_empty_param(req, "rollNo") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class = match non_empty_param(req, "class") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let store = RecordStore::new(remote_store_of(state), conn);
    match store::add_student(
        &store,
        &NewStudent {
            name,
            roll_no,
            class,
            teacher_id: teacher.id,
        },
    ) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn list(state: &AppState, req: &Request) -> Value {
    let teacher = match require_teacher(state, req) {
        Ok(t) => t,
        Err(e) => return e,
    };
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    let store = RecordStore::new(remote_store_of(state), conn);
    let students = store::students_by_teacher(&store, &teacher.id);
    ok(&req.id, json!({ "students": students }))
}

fn update(state: &AppState, req: &Request) -> Value {
    if let Err(e) = require_teacher(state, req) {
        return e;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match str_param(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let patch = StudentPatch {
        name: opt_str(req, "name"),
        roll_no: opt_str(req, "rollNo"),
        class: opt_str(req, "class"),
    };

    let store = RecordStore::new(remote_store_of(state), conn);
    match store::update_student(&store, &student_id, &patch) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn delete(state: &AppState, req: &Request) -> Value {
    if let Err(e) = require_teacher(state, req) {
        return e;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match str_param(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let store = RecordStore::new(remote_store_of(state), conn);
    match store::delete_student(&store, &student_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn opt_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
