use serde_json::{json, Value};

use crate::auth::{self, AuthError};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{non_empty_param, remote_of, require_db};
use crate::ipc::types::{AppState, Request};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "auth.login" => Some(login(state, req)),
        "auth.register" => Some(register(state, req)),
        "auth.logout" => Some(logout(state, req)),
        "auth.current" => Some(current(state, req)),
        _ => None,
    }
}

fn auth_err(req: &Request, e: AuthError) -> Value {
    match e {
        AuthError::InvalidCredentials => {
            err(&req.id, "invalid_credentials", e.to_string(), None)
        }
        AuthError::AlreadyExists => err(&req.id, "already_exists", e.to_string(), None),
        AuthError::Internal(inner) => err(&req.id, "db_query_failed", format!("{inner:#}"), None),
    }
}

fn login(state: &AppState, req: &Request) -> Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let email = match non_empty_param(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match non_empty_param(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match auth::login(remote_of(state), conn, &email, &password) {
        Ok(teacher) => ok(&req.id, json!({ "teacher": teacher })),
        Err(e) => auth_err(req, e),
    }
}

fn register(state: &AppState, req: &Request) -> Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let email = match non_empty_param(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match non_empty_param(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let username = match non_empty_param(req, "username") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match auth::register(remote_of(state), conn, &email, &password, &username) {
        Ok(teacher) => ok(&req.id, json!({ "teacher": teacher })),
        Err(e) => auth_err(req, e),
    }
}

fn logout(state: &AppState, req: &Request) -> Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::logout(remote_of(state), conn) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn current(state: &AppState, req: &Request) -> Value {
    let conn = match require_db(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "teacher": auth::current_teacher(conn) }))
}
