//! Identity service: remote sign-in/sign-up when configured, local
//! credential table otherwise. Only `InvalidCredentials` and `AlreadyExists`
//! ever reach the caller as user-visible errors; remote trouble just drops
//! to the local path.

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::remote::RemoteBackend;

const SESSION_SLOT: &str = "currentTeacher";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    AlreadyExists,
    Internal(anyhow::Error),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid email or password"),
            AuthError::AlreadyExists => write!(f, "a teacher with this email already exists"),
            AuthError::Internal(e) => write!(f, "{e:#}"),
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(e: anyhow::Error) -> Self {
        AuthError::Internal(e)
    }
}

pub fn login(
    remote: Option<&dyn RemoteBackend>,
    conn: &Connection,
    email: &str,
    password: &str,
) -> Result<Teacher, AuthError> {
    if let Some(remote) = remote {
        match remote.sign_in(email, password) {
            Ok(user) => {
                let teacher = Teacher {
                    id: user.uid,
                    username: user
                        .display_name
                        .unwrap_or_else(|| email_local_part(&user.email)),
                    email: user.email,
                };
                save_session(conn, &teacher)?;
                return Ok(teacher);
            }
            Err(e) => {
                eprintln!("marksheetd: remote sign-in failed, trying local teachers: {e:#}");
            }
        }
    }

    let found: Option<Teacher> = conn
        .query_row(
            "SELECT id, username, email FROM teachers
             WHERE email = ?1 AND password = ?2
             ORDER BY seq LIMIT 1",
            (email, password),
            |row| {
                Ok(Teacher {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                })
            },
        )
        .optional()
        .context("scan local teachers")?;

    let teacher = found.ok_or(AuthError::InvalidCredentials)?;
    save_session(conn, &teacher)?;
    Ok(teacher)
}

pub fn register(
    remote: Option<&dyn RemoteBackend>,
    conn: &Connection,
    email: &str,
    password: &str,
    username: &str,
) -> Result<Teacher, AuthError> {
    if let Some(remote) = remote {
        match remote.sign_up(email, password) {
            Ok(user) => {
                let teacher = Teacher {
                    id: user.uid,
                    username: username.to_string(),
                    email: user.email,
                };
                save_session(conn, &teacher)?;
                return Ok(teacher);
            }
            Err(e) => {
                eprintln!("marksheetd: remote sign-up failed, registering locally: {e:#}");
            }
        }
    }

    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM teachers WHERE email = ?1", [email], |row| {
            row.get(0)
        })
        .optional()
        .context("check existing teacher")?;
    if exists.is_some() {
        return Err(AuthError::AlreadyExists);
    }

    let teacher = Teacher {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: email.to_string(),
    };
    conn.execute(
        "INSERT INTO teachers(id, email, username, password, created_at)
         VALUES(?1, ?2, ?3, ?4, ?5)",
        (
            &teacher.id,
            email,
            username,
            password,
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        ),
    )
    .context("insert local teacher")?;

    save_session(conn, &teacher)?;
    Ok(teacher)
}

/// Best-effort remote sign-out, then unconditionally clear the session slot.
pub fn logout(remote: Option<&dyn RemoteBackend>, conn: &Connection) -> anyhow::Result<()> {
    if let Some(remote) = remote {
        if let Err(e) = remote.sign_out() {
            eprintln!("marksheetd: remote sign-out failed: {e:#}");
        }
    }
    conn.execute("DELETE FROM session WHERE slot = ?1", [SESSION_SLOT])
        .context("clear session slot")?;
    Ok(())
}

/// Current session principal; absent or malformed slots both read as None.
pub fn current_teacher(conn: &Connection) -> Option<Teacher> {
    let doc: Option<String> = conn
        .query_row(
            "SELECT doc FROM session WHERE slot = ?1",
            [SESSION_SLOT],
            |row| row.get(0),
        )
        .optional()
        .ok()
        .flatten();
    doc.and_then(|d| serde_json::from_str(&d).ok())
}

fn save_session(conn: &Connection, teacher: &Teacher) -> anyhow::Result<()> {
    let doc = serde_json::to_string(teacher).context("serialize session teacher")?;
    conn.execute(
        "INSERT INTO session(slot, doc) VALUES(?1, ?2)
         ON CONFLICT(slot) DO UPDATE SET doc = excluded.doc",
        (SESSION_SLOT, &doc),
    )
    .context("write session slot")?;
    Ok(())
}

fn email_local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
