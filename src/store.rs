//! Two-tier record store for Students and Marks.
//!
//! Every operation first tries the remote document store when one was
//! resolved at startup, and on any remote failure falls through to the local
//! SQLite tables. Remote errors never propagate past this module; they are
//! logged to stderr and absorbed by the fallback.

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::remote::RemoteStore;

pub const STUDENTS: &str = "students";
pub const MARKS: &str = "marks";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub roll_no: String,
    pub class: String,
    pub teacher_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub roll_no: String,
    pub class: String,
    pub teacher_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub id: String,
    pub student_id: String,
    pub subject: String,
    pub marks: u32,
    pub max_marks: u32,
    pub teacher_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMark {
    pub student_id: String,
    pub subject: String,
    pub marks: u32,
    pub max_marks: u32,
    pub teacher_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<u32>,
}

pub struct RecordStore<'a> {
    remote: Option<&'a dyn RemoteStore>,
    conn: &'a Connection,
}

impl<'a> RecordStore<'a> {
    pub fn new(remote: Option<&'a dyn RemoteStore>, conn: &'a Connection) -> Self {
        Self { remote, conn }
    }

    /// Append a document. The id comes back synchronously either way:
    /// backend-assigned on the remote path, a fresh uuid on the local one.
    /// `createdAt` is stamped here, not by the caller.
    pub fn create(&self, table: &str, mut fields: Map<String, Value>) -> anyhow::Result<Map<String, Value>> {
        fields.insert("createdAt".to_string(), Value::String(now_timestamp()));

        if let Some(remote) = self.remote {
            match remote.insert(table, &fields) {
                Ok(id) => {
                    fields.insert("id".to_string(), Value::String(id));
                    return Ok(fields);
                }
                Err(e) => log_fallback(table, "create", &e),
            }
        }

        let id = Uuid::new_v4().to_string();
        fields.insert("id".to_string(), Value::String(id.clone()));
        let doc = serde_json::to_string(&fields).context("serialize document")?;
        self.conn
            .execute(
                &format!("INSERT INTO {table}(id, doc) VALUES(?1, ?2)"),
                (&id, &doc),
            )
            .with_context(|| format!("insert into local {table}"))?;
        Ok(fields)
    }

    /// Equality-filtered listing. This never fails: a remote error falls back
    /// to the local table, and a local error yields an empty list. Ordering
    /// is storage order and not part of the contract.
    pub fn list_by(&self, table: &str, filters: &[(&str, &str)]) -> Vec<Map<String, Value>> {
        if let Some(remote) = self.remote {
            match remote.query_eq(table, filters) {
                Ok(docs) => return docs,
                Err(e) => log_fallback(table, "list", &e),
            }
        }

        match self.local_scan(table, filters) {
            Ok(docs) => docs,
            Err(e) => {
                eprintln!("marksheetd: local {table} scan failed: {e:#}");
                Vec::new()
            }
        }
    }

    /// Shallow-merge `patch` into the stored document. Unknown ids are a
    /// silent no-op, matching the remote tier's idempotent partial update.
    pub fn update(&self, table: &str, id: &str, patch: &Map<String, Value>) -> anyhow::Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        if let Some(remote) = self.remote {
            match remote.update_fields(table, id, patch) {
                Ok(()) => return Ok(()),
                Err(e) => log_fallback(table, "update", &e),
            }
        }

        let existing: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT doc FROM {table} WHERE id = ?1"),
                [id],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("read local {table} document"))?;
        let Some(existing) = existing else {
            return Ok(());
        };

        let mut doc: Map<String, Value> =
            serde_json::from_str(&existing).context("stored document is not a JSON object")?;
        for (field, value) in patch {
            doc.insert(field.clone(), value.clone());
        }
        let merged = serde_json::to_string(&doc).context("serialize merged document")?;
        self.conn
            .execute(
                &format!("UPDATE {table} SET doc = ?1 WHERE id = ?2"),
                (&merged, id),
            )
            .with_context(|| format!("write local {table} document"))?;
        Ok(())
    }

    /// Idempotent: deleting an unknown id changes nothing and does not fail.
    pub fn delete(&self, table: &str, id: &str) -> anyhow::Result<()> {
        if let Some(remote) = self.remote {
            match remote.delete(table, id) {
                Ok(()) => return Ok(()),
                Err(e) => log_fallback(table, "delete", &e),
            }
        }

        self.conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])
            .with_context(|| format!("delete from local {table}"))?;
        Ok(())
    }

    fn local_scan(
        &self,
        table: &str,
        filters: &[(&str, &str)],
    ) -> anyhow::Result<Vec<Map<String, Value>>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT doc FROM {table} ORDER BY seq"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut docs = Vec::new();
        for raw in rows {
            let Ok(doc) = serde_json::from_str::<Map<String, Value>>(&raw) else {
                continue;
            };
            let matches = filters
                .iter()
                .all(|(field, value)| doc.get(*field).and_then(|v| v.as_str()) == Some(*value));
            if matches {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

fn log_fallback(table: &str, op: &str, e: &anyhow::Error) {
    eprintln!("marksheetd: remote {op} on {table} failed, using local store: {e:#}");
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn fields_of<T: Serialize>(value: &T) -> anyhow::Result<Map<String, Value>> {
    match serde_json::to_value(value).context("serialize fields")? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("expected a JSON object"),
    }
}

// Typed wrappers over the generic document operations.

pub fn add_student(store: &RecordStore, new: &NewStudent) -> anyhow::Result<Student> {
    let doc = store.create(STUDENTS, fields_of(new)?)?;
    serde_json::from_value(Value::Object(doc)).context("decode stored student")
}

pub fn students_by_teacher(store: &RecordStore, teacher_id: &str) -> Vec<Student> {
    store
        .list_by(STUDENTS, &[("teacherId", teacher_id)])
        .into_iter()
        .filter_map(|doc| serde_json::from_value(Value::Object(doc)).ok())
        .collect()
}

pub fn update_student(store: &RecordStore, id: &str, patch: &StudentPatch) -> anyhow::Result<()> {
    store.update(STUDENTS, id, &fields_of(patch)?)
}

pub fn delete_student(store: &RecordStore, id: &str) -> anyhow::Result<()> {
    store.delete(STUDENTS, id)
}

pub fn add_mark(store: &RecordStore, new: &NewMark) -> anyhow::Result<Mark> {
    let doc = store.create(MARKS, fields_of(new)?)?;
    serde_json::from_value(Value::Object(doc)).context("decode stored mark")
}

/// Marks are scoped by both the student and the owning teacher.
pub fn marks_by_student(store: &RecordStore, student_id: &str, teacher_id: &str) -> Vec<Mark> {
    store
        .list_by(MARKS, &[("studentId", student_id), ("teacherId", teacher_id)])
        .into_iter()
        .filter_map(|doc| serde_json::from_value(Value::Object(doc)).ok())
        .collect()
}

pub fn update_mark(store: &RecordStore, id: &str, patch: &MarkPatch) -> anyhow::Result<()> {
    store.update(MARKS, id, &fields_of(patch)?)
}

pub fn delete_mark(store: &RecordStore, id: &str) -> anyhow::Result<()> {
    store.delete(MARKS, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteStore;
    use anyhow::anyhow;

    fn memory_store() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        crate::db::init_schema(&conn).expect("init schema");
        conn
    }

    fn new_student(name: &str, teacher_id: &str) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            roll_no: "17".to_string(),
            class: "10-A".to_string(),
            teacher_id: teacher_id.to_string(),
        }
    }

    /// Remote tier that always fails, to exercise the fallback path.
    struct DownRemote;

    impl RemoteStore for DownRemote {
        fn insert(&self, _: &str, _: &Map<String, Value>) -> anyhow::Result<String> {
            Err(anyhow!("connection refused"))
        }
        fn query_eq(
            &self,
            _: &str,
            _: &[(&str, &str)],
        ) -> anyhow::Result<Vec<Map<String, Value>>> {
            Err(anyhow!("connection refused"))
        }
        fn update_fields(&self, _: &str, _: &str, _: &Map<String, Value>) -> anyhow::Result<()> {
            Err(anyhow!("connection refused"))
        }
        fn delete(&self, _: &str, _: &str) -> anyhow::Result<()> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn create_then_list_round_trips() {
        let conn = memory_store();
        let store = RecordStore::new(None, &conn);

        let created = add_student(&store, &new_student("Asha", "t-1")).expect("create");
        assert!(!created.id.is_empty());
        assert!(!created.created_at.is_empty());

        let listed = students_by_teacher(&store, "t-1");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].name, "Asha");
        assert_eq!(listed[0].roll_no, "17");
        assert_eq!(listed[0].class, "10-A");

        // Scoping: another teacher sees nothing.
        assert!(students_by_teacher(&store, "t-2").is_empty());
    }

    #[test]
    fn update_is_a_partial_merge() {
        let conn = memory_store();
        let store = RecordStore::new(None, &conn);

        let student = add_student(&store, &new_student("Asha", "t-1")).expect("create");
        let mark = add_mark(
            &store,
            &NewMark {
                student_id: student.id.clone(),
                subject: "Math".to_string(),
                marks: 60,
                max_marks: 100,
                teacher_id: "t-1".to_string(),
            },
        )
        .expect("create mark");

        update_mark(
            &store,
            &mark.id,
            &MarkPatch {
                marks: Some(72),
                ..MarkPatch::default()
            },
        )
        .expect("update");

        let marks = marks_by_student(&store, &student.id, "t-1");
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].marks, 72);
        assert_eq!(marks[0].max_marks, 100);
        assert_eq!(marks[0].subject, "Math");
        assert_eq!(marks[0].student_id, student.id);
    }

    #[test]
    fn update_and_delete_of_unknown_id_are_no_ops() {
        let conn = memory_store();
        let store = RecordStore::new(None, &conn);

        let student = add_student(&store, &new_student("Asha", "t-1")).expect("create");

        update_student(
            &store,
            "missing",
            &StudentPatch {
                name: Some("Nobody".to_string()),
                ..StudentPatch::default()
            },
        )
        .expect("no-op update");
        delete_student(&store, "missing").expect("no-op delete");

        let listed = students_by_teacher(&store, "t-1");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, student.id);
        assert_eq!(listed[0].name, "Asha");
    }

    #[test]
    fn remote_failure_falls_back_to_local() {
        let conn = memory_store();
        let remote = DownRemote;
        let store = RecordStore::new(Some(&remote), &conn);

        let created = add_student(&store, &new_student("Asha", "t-1")).expect("create");
        let listed = students_by_teacher(&store, "t-1");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);

        update_student(
            &store,
            &created.id,
            &StudentPatch {
                class: Some("10-B".to_string()),
                ..StudentPatch::default()
            },
        )
        .expect("update via fallback");
        assert_eq!(students_by_teacher(&store, "t-1")[0].class, "10-B");

        delete_student(&store, &created.id).expect("delete via fallback");
        assert!(students_by_teacher(&store, "t-1").is_empty());
    }

    #[test]
    fn local_insertion_order_is_preserved() {
        let conn = memory_store();
        let store = RecordStore::new(None, &conn);

        for name in ["A", "B", "C"] {
            add_student(&store, &new_student(name, "t-1")).expect("create");
        }
        let names: Vec<String> = students_by_teacher(&store, "t-1")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }
}
