use crate::remote::{HttpRemote, RemoteBackend};

/// Settings required to reach the remote document/identity service. All six
/// must be present and non-empty or remote mode stays off for the whole
/// process.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub api_key: String,
    // All six must be present for remote mode even though the REST driver
    // only consumes a subset.
    #[allow(dead_code)]
    pub auth_domain: String,
    pub project_id: String,
    #[allow(dead_code)]
    pub storage_bucket: String,
    #[allow(dead_code)]
    pub sender_id: String,
    pub app_id: String,
}

const ENV_VARS: [&str; 6] = [
    "MARKSHEET_API_KEY",
    "MARKSHEET_AUTH_DOMAIN",
    "MARKSHEET_PROJECT_ID",
    "MARKSHEET_STORAGE_BUCKET",
    "MARKSHEET_SENDER_ID",
    "MARKSHEET_APP_ID",
];

impl RemoteConfig {
    pub fn from_env() -> Option<Self> {
        let mut values = Vec::with_capacity(ENV_VARS.len());
        for name in ENV_VARS {
            match std::env::var(name) {
                Ok(v) if !v.trim().is_empty() => values.push(v),
                _ => return None,
            }
        }
        let mut it = values.into_iter();
        Some(Self {
            api_key: it.next()?,
            auth_domain: it.next()?,
            project_id: it.next()?,
            storage_bucket: it.next()?,
            sender_id: it.next()?,
            app_id: it.next()?,
        })
    }
}

/// Resolve the remote backend exactly once, at process start. Incomplete
/// configuration or a failed driver construction both mean "local only";
/// there is no retry or re-check later in the process lifetime.
pub fn resolve_remote() -> Option<Box<dyn RemoteBackend>> {
    let config = RemoteConfig::from_env()?;
    match HttpRemote::new(config) {
        Ok(remote) => Some(Box::new(remote)),
        Err(e) => {
            eprintln!("marksheetd: remote init failed, using local store: {e:#}");
            None
        }
    }
}
