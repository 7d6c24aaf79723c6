use serde_json::{json, Value};
use std::path::PathBuf;

use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::str_param;
use crate::ipc::types::{AppState, Request};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "health" => Some(health(state, req)),
        "workspace.select" => Some(workspace_select(state, req)),
        "workspace.backupExport" => Some(backup_export(state, req)),
        "workspace.backupImport" => Some(backup_import(state, req)),
        _ => None,
    }
}

fn health(state: &AppState, req: &Request) -> Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "remoteConfigured": state.remote.is_some(),
        }),
    )
}

fn workspace_select(state: &mut AppState, req: &Request) -> Value {
    let path = match str_param(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    match db::open_db(&path) {
        Ok(conn) => {
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            ok(
                &req.id,
                json!({ "workspacePath": path.to_string_lossy() }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

fn backup_export(state: &AppState, req: &Request) -> Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out_path = match str_param(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    match backup::export_workspace_bundle(workspace, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "dbSha256": summary.db_sha256,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}

fn backup_import(state: &mut AppState, req: &Request) -> Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let bundle_path = match str_param(req, "bundlePath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    // Release the open handle before swapping the database file underneath.
    state.db = None;
    let imported = backup::import_workspace_bundle(&bundle_path, &workspace);
    let reopened = db::open_db(&workspace);

    match (imported, reopened) {
        (Ok(summary), Ok(conn)) => {
            state.db = Some(conn);
            ok(
                &req.id,
                json!({ "bundleFormat": summary.bundle_format_detected }),
            )
        }
        (Err(e), Ok(conn)) => {
            // Import failed before touching the file; keep serving the old data.
            state.db = Some(conn);
            err(&req.id, "io_failed", format!("{e:#}"), None)
        }
        (_, Err(e)) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}
