use serde_json::{json, Value};

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    non_empty_param, remote_store_of, require_db, require_teacher, str_param, u32_param,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, MarkPatch, NewMark, RecordStore};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "marks.create" => Some(create(state, req)),
        "marks.listByStudent" => Some(list_by_student(state, req)),
        "marks.update" => Some(update(state, req)),
        "marks.delete" => Some(delete(state, req)),
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
    let student_id = match str_param(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject = match non_empty_param(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let marks = match u32_param(req, "marks") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let max_marks = match u32_param(req, "maxMarks") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let store = RecordStore::new(remote_store_of(state), conn);
    match store::add_mark(
        &store,
        &NewMark {
            student_id,
            subject,
            marks,
            max_marks,
            teacher_id: teacher.id,
        },
    ) {
        Ok(mark) => ok(&req.id, json!({ "mark": mark })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn list_by_student(state: &AppState, req: &Request) -> Value {
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
    let marks = store::marks_by_student(&store, &student_id, &teacher.id);
    ok(&req.id, json!({ "marks": marks }))
}

fn update(state: &AppState, req: &Request) -> Value {
    if let Err(e) = require_teacher(state, req) {
        return e;
    }
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mark_id = match str_param(req, "markId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut patch = MarkPatch {
        subject: req
            .params
            .get("subject")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        ..MarkPatch::default()
    };
    if req.params.get("marks").is_some() {
        patch.marks = Some(match u32_param(req, "marks") {
            Ok(v) => v,
            Err(e) => return e,
        });
    }
    if req.params.get("maxMarks").is_some() {
        patch.max_marks = Some(match u32_param(req, "maxMarks") {
            Ok(v) => v,
            Err(e) => return e,
        });
    }

    let store = RecordStore::new(remote_store_of(state), conn);
    match store::update_mark(&store, &mark_id, &patch) {
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
    let mark_id = match str_param(req, "markId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let store = RecordStore::new(remote_store_of(state), conn);
    match store::delete_mark(&store, &mark_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}
