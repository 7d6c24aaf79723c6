use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_daemon() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_marksheetd");
    let mut child = Command::new(exe)
        .env_remove("MARKSHEET_API_KEY")
        .env_remove("MARKSHEET_AUTH_DOMAIN")
        .env_remove("MARKSHEET_PROJECT_ID")
        .env_remove("MARKSHEET_STORAGE_BUCKET")
        .env_remove("MARKSHEET_SENDER_ID")
        .env_remove("MARKSHEET_APP_ID")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn marksheetd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

#[test]
fn health_reports_version_and_no_remote() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let resp = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(resp["ok"], true);
    assert_eq!(
        resp["result"]["version"].as_str(),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert_eq!(resp["result"]["remoteConfigured"], false);
    assert!(resp["result"]["workspacePath"].is_null());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unknown_method_is_not_implemented() {
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let resp = request(&mut stdin, &mut reader, "1", "no.such.method", json!({}));
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "not_implemented");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn entity_methods_need_workspace_then_session() {
    let workspace = temp_dir("marksheet-smoke");
    let (mut child, mut stdin, mut reader) = spawn_daemon();

    let resp = request(&mut stdin, &mut reader, "1", "students.list", json!({}));
    assert_eq!(resp["error"]["code"], "no_workspace");

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(resp["ok"], true);

    // Workspace selected but nobody signed in.
    let resp = request(&mut stdin, &mut reader, "3", "students.list", json!({}));
    assert_eq!(resp["error"]["code"], "not_authenticated");

    let resp = request(&mut stdin, &mut reader, "4", "auth.current", json!({}));
    assert_eq!(resp["ok"], true);
    assert!(resp["result"]["teacher"].is_null());

    drop(stdin);
    let _ = child.wait();
}
