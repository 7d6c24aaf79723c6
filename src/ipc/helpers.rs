//! Shared param extraction and state checks for the handler modules.
//! Each helper returns the ready-to-send error response on failure so
//! handlers can early-return it.

use rusqlite::Connection;
use serde_json::Value;

use super::error::err;
use super::types::{AppState, Request};
use crate::auth::Teacher;
use crate::remote::{RemoteBackend, RemoteStore};

pub fn str_param(req: &Request, key: &str) -> Result<String, Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) => Ok(v.to_string()),
        None => Err(err(
            &req.id,
            "bad_params",
            format!("missing params.{key}"),
            None,
        )),
    }
}

/// Like `str_param`, but trims and rejects blank values.
pub fn non_empty_param(req: &Request, key: &str) -> Result<String, Value> {
    let value = str_param(req, key)?;
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("params.{key} must not be empty"),
            None,
        ));
    }
    Ok(trimmed)
}

/// Non-negative integer param that must fit the mark range.
pub fn u32_param(req: &Request, key: &str) -> Result<u32, Value> {
    let raw = match req.params.get(key).and_then(|v| v.as_u64()) {
        Some(v) => v,
        None => {
            return Err(err(
                &req.id,
                "bad_params",
                format!("params.{key} must be a non-negative integer"),
                None,
            ))
        }
    };
    u32::try_from(raw).map_err(|_| {
        err(
            &req.id,
            "bad_params",
            format!("params.{key} is out of range"),
            None,
        )
    })
}

pub fn require_db<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Session teacher for scoping; entity methods refuse to run without one.
pub fn require_teacher(state: &AppState, req: &Request) -> Result<Teacher, Value> {
    let conn = require_db(state, req)?;
    crate::auth::current_teacher(conn)
        .ok_or_else(|| err(&req.id, "not_authenticated", "no teacher is signed in", None))
}

pub fn remote_of(state: &AppState) -> Option<&dyn RemoteBackend> {
    state.remote.as_deref()
}

/// Document-store view of the remote handle, for the record store.
pub fn remote_store_of(state: &AppState) -> Option<&dyn RemoteStore> {
    state.remote.as_deref().map(|r| r.as_store())
}
