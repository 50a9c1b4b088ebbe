//! Elasticsearch credential resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES**
//!   (`elasticsearch.auth.username_env`, `elasticsearch.auth.password_env`).
//! - Callers invoke [`resolve_es_credentials`] once at startup and pass the
//!   result into the backend constructor.
//! - `Debug` redacts the password.
//! - Error messages reference the env var **NAME**, never the value.
//!
//! Auth is optional: no `auth` section means anonymous access. Once a
//! username var is configured, both vars must resolve (fail closed).

use anyhow::{bail, Result};
use serde_json::Value;

#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Resolve basic-auth credentials using `lookup` for env access.
///
/// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
pub fn resolve_es_credentials_with<F>(config_json: &Value, lookup: F) -> Result<Option<ResolvedCredentials>>
where
    F: Fn(&str) -> Option<String>,
{
    let user_var = read_str_at(config_json, "/elasticsearch/auth/username_env");
    let pass_var = read_str_at(config_json, "/elasticsearch/auth/password_env");

    let resolve = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    match (user_var, pass_var) {
        (None, None) => Ok(None),
        (None, Some(p)) => bail!(
            "SECRETS_INCOMPLETE: elasticsearch.auth.password_env='{}' set without username_env",
            p
        ),
        (Some(u), None) => bail!(
            "SECRETS_INCOMPLETE: elasticsearch.auth.username_env='{}' set without password_env",
            u
        ),
        (Some(u), Some(p)) => {
            let Some(username) = resolve(&u) else {
                bail!("SECRETS_MISSING: required env var '{}' (elasticsearch username) is not set or empty", u);
            };
            let Some(password) = resolve(&p) else {
                bail!("SECRETS_MISSING: required env var '{}' (elasticsearch password) is not set or empty", p);
            };
            Ok(Some(ResolvedCredentials { username, password }))
        }
    }
}

/// Resolve basic-auth credentials from the process environment.
pub fn resolve_es_credentials(config_json: &Value) -> Result<Option<ResolvedCredentials>> {
    resolve_es_credentials_with(config_json, |name| std::env::var(name).ok())
}
