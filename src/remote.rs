//! Remote document-store and identity drivers.
//!
//! The rest of the daemon only sees the two traits; the concrete driver
//! speaks the Firestore-style REST surface (typed field values, equality
//! queries, field-mask patches) plus the password endpoints of the identity
//! toolkit. Every error maps to "fall back to the local store" at the call
//! site, so the driver just propagates anyhow errors.

use anyhow::{anyhow, Context};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::time::Duration;

use crate::config::RemoteConfig;

#[derive(Debug, Clone)]
pub struct RemoteUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

pub trait RemoteStore {
    /// Insert a document; the backend assigns and returns the id.
    fn insert(&self, collection: &str, fields: &Map<String, Value>) -> anyhow::Result<String>;

    /// Equality-filtered scan. Returned documents carry their id under `"id"`.
    fn query_eq(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
    ) -> anyhow::Result<Vec<Map<String, Value>>>;

    /// Partial update of the named fields only.
    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: &Map<String, Value>,
    ) -> anyhow::Result<()>;

    fn delete(&self, collection: &str, id: &str) -> anyhow::Result<()>;
}

pub trait RemoteIdentity {
    fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<RemoteUser>;
    fn sign_up(&self, email: &str, password: &str) -> anyhow::Result<RemoteUser>;
    fn sign_out(&self) -> anyhow::Result<()>;
}

pub trait RemoteBackend: RemoteStore + RemoteIdentity {
    fn as_store(&self) -> &dyn RemoteStore;
}

impl<T: RemoteStore + RemoteIdentity> RemoteBackend for T {
    fn as_store(&self) -> &dyn RemoteStore {
        self
    }
}

const FIRESTORE_HOST: &str = "https://firestore.googleapis.com/v1";
const IDENTITY_HOST: &str = "https://identitytoolkit.googleapis.com/v1";

pub struct HttpRemote {
    agent: ureq::Agent,
    api_key: String,
    app_id: String,
    documents_url: String,
    // Bearer token from the last sign-in, attached to document calls.
    // Single-threaded process, so a RefCell is enough.
    id_token: RefCell<Option<String>>,
}

impl HttpRemote {
    pub fn new(config: RemoteConfig) -> anyhow::Result<Self> {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();
        let documents_url = format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_HOST, config.project_id
        );
        Ok(Self {
            agent,
            api_key: config.api_key,
            app_id: config.app_id,
            documents_url,
            id_token: RefCell::new(None),
        })
    }

    fn document_request(&self, method: &str, url: &str) -> ureq::Request {
        let mut req = self.agent.request(method, url).query("key", &self.api_key);
        if let Some(token) = self.id_token.borrow().as_deref() {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }
        req
    }

    fn password_endpoint(&self, action: &str, email: &str, password: &str) -> anyhow::Result<RemoteUser> {
        let url = format!("{}/accounts:{}", IDENTITY_HOST, action);
        let resp: Value = self
            .agent
            .post(&url)
            .query("key", &self.api_key)
            .set("X-Firebase-GMPID", &self.app_id)
            .send_json(json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .with_context(|| format!("identity {action} request failed"))?
            .into_json()
            .context("identity response is not JSON")?;

        let uid = resp
            .get("localId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("identity response missing localId"))?
            .to_string();
        let email = resp
            .get("email")
            .and_then(|v| v.as_str())
            .unwrap_or(email)
            .to_string();
        let display_name = resp
            .get("displayName")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        *self.id_token.borrow_mut() = resp
            .get("idToken")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(RemoteUser {
            uid,
            email,
            display_name,
        })
    }
}

impl RemoteStore for HttpRemote {
    fn insert(&self, collection: &str, fields: &Map<String, Value>) -> anyhow::Result<String> {
        let url = format!("{}/{}", self.documents_url, collection);
        let resp: Value = self
            .document_request("POST", &url)
            .send_json(json!({ "fields": encode_fields(fields) }))
            .with_context(|| format!("insert into {collection} failed"))?
            .into_json()
            .context("insert response is not JSON")?;
        doc_id(&resp).ok_or_else(|| anyhow!("insert response missing document name"))
    }

    fn query_eq(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
    ) -> anyhow::Result<Vec<Map<String, Value>>> {
        let field_filters: Vec<Value> = filters
            .iter()
            .map(|(field, value)| {
                json!({
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": { "stringValue": value },
                    }
                })
            })
            .collect();
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "compositeFilter": { "op": "AND", "filters": field_filters }
                },
            }
        });

        let url = format!("{}:runQuery", self.documents_url);
        let resp: Value = self
            .document_request("POST", &url)
            .send_json(query)
            .with_context(|| format!("query on {collection} failed"))?
            .into_json()
            .context("query response is not JSON")?;

        let rows = resp
            .as_array()
            .ok_or_else(|| anyhow!("query response is not an array"))?;
        let mut docs = Vec::new();
        for row in rows {
            // Rows without a document are paging/metadata entries.
            let Some(document) = row.get("document") else {
                continue;
            };
            let Some(id) = doc_id(document) else {
                continue;
            };
            let mut doc = document
                .get("fields")
                .map(decode_fields)
                .unwrap_or_default();
            doc.insert("id".to_string(), Value::String(id));
            docs.push(doc);
        }
        Ok(docs)
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        patch: &Map<String, Value>,
    ) -> anyhow::Result<()> {
        let url = format!("{}/{}/{}", self.documents_url, collection, id);
        let mut req = self.document_request("PATCH", &url);
        for field in patch.keys() {
            req = req.query("updateMask.fieldPaths", field);
        }
        req.send_json(json!({ "fields": encode_fields(patch) }))
            .with_context(|| format!("update of {collection}/{id} failed"))?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> anyhow::Result<()> {
        let url = format!("{}/{}/{}", self.documents_url, collection, id);
        self.document_request("DELETE", &url)
            .call()
            .with_context(|| format!("delete of {collection}/{id} failed"))?;
        Ok(())
    }
}

impl RemoteIdentity for HttpRemote {
    fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<RemoteUser> {
        self.password_endpoint("signInWithPassword", email, password)
    }

    fn sign_up(&self, email: &str, password: &str) -> anyhow::Result<RemoteUser> {
        self.password_endpoint("signUp", email, password)
    }

    fn sign_out(&self) -> anyhow::Result<()> {
        // The REST surface is stateless; dropping the token is the sign-out.
        *self.id_token.borrow_mut() = None;
        Ok(())
    }
}

/// Last path segment of a document resource name.
fn doc_id(document: &Value) -> Option<String> {
    document
        .get("name")
        .and_then(|v| v.as_str())
        .and_then(|name| name.rsplit('/').next())
        .map(str::to_string)
}

fn encode_fields(fields: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for (name, value) in fields {
        out.insert(name.clone(), encode_value(value));
    }
    Value::Object(out)
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Wire format carries integers as strings.
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        // Documents here are flat; anything structured goes through as JSON text.
        other => json!({ "stringValue": other.to_string() }),
    }
}

fn decode_fields(fields: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    let Some(obj) = fields.as_object() else {
        return out;
    };
    for (name, typed) in obj {
        out.insert(name.clone(), decode_value(typed));
    }
    out
}

fn decode_value(typed: &Value) -> Value {
    if let Some(s) = typed.get("stringValue").and_then(|v| v.as_str()) {
        return Value::String(s.to_string());
    }
    if let Some(i) = typed.get("integerValue") {
        let parsed = match i {
            Value::String(s) => s.parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        };
        if let Some(n) = parsed {
            return Value::Number(n.into());
        }
    }
    if let Some(d) = typed.get("doubleValue").and_then(|v| v.as_f64()) {
        if let Some(n) = serde_json::Number::from_f64(d) {
            return Value::Number(n);
        }
    }
    if let Some(b) = typed.get("booleanValue").and_then(|v| v.as_bool()) {
        return Value::Bool(b);
    }
    Value::Null
}
