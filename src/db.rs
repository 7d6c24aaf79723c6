use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "marksheet.sqlite3";

/// Open (and if needed create) the local fallback store inside a workspace
/// directory. Layout mirrors the web client's key-value tables: `students`
/// and `marks` hold ordered JSON documents, `teachers` holds local
/// credentials, and `session` holds the single current-teacher slot.
pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub(crate) fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            doc TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS marks(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            doc TEXT NOT NULL
        )",
        [],
    )?;

    // Credentials never leave this table; compared as stored.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            username TEXT NOT NULL,
            password TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_teachers_email ON teachers(email)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS session(
            slot TEXT PRIMARY KEY,
            doc TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}
