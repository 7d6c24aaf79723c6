use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::remote::RemoteBackend;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Resolved once at process start; None means local-only for the whole
    /// process lifetime.
    pub remote: Option<Box<dyn RemoteBackend>>,
}
